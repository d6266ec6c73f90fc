//! Kokoro voice pack.
//!
//! `voices.bin` is a NumPy `.npz` archive with one little-endian `float32`
//! array per speaker, shaped `(510, 1, 256)`: a style vector for every
//! phoneme sequence length the model accepts.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

use tts_core::{TtsError, TtsResult};

/// Width of one style vector.
pub const STYLE_DIM: usize = 256;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Style vectors of one speaker, indexed by phoneme sequence length.
#[derive(Debug, Clone)]
pub struct VoiceStyles {
    data: Vec<f32>,
}

impl VoiceStyles {
    /// Number of sequence lengths covered.
    pub fn rows(&self) -> usize {
        self.data.len() / STYLE_DIM
    }

    /// Style vector for a sequence of `num_tokens` phonemes. Lengths past the
    /// last row reuse the last row.
    pub fn for_length(&self, num_tokens: usize) -> &[f32] {
        let row = num_tokens.min(self.rows().saturating_sub(1));
        &self.data[row * STYLE_DIM..(row + 1) * STYLE_DIM]
    }
}

/// Every speaker in a voice pack.
#[derive(Debug, Clone, Default)]
pub struct VoicePack {
    voices: HashMap<String, VoiceStyles>,
}

impl VoicePack {
    /// Read and parse a voice pack file.
    pub fn read(path: impl AsRef<Path>) -> TtsResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| TtsError::ModelLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_npz(&bytes).map_err(|reason| TtsError::invalid_model(path, reason))
    }

    /// Parse an in-memory `.npz` archive.
    pub fn from_npz(bytes: &[u8]) -> Result<Self, String> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not an npz archive: {e}"))?;

        let mut voices = HashMap::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| e.to_string())?;
            let name = entry.name().trim_end_matches(".npy").to_string();

            let mut npy = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut npy).map_err(|e| format!("{name}: {e}"))?;

            let data = parse_npy_f32(&npy).map_err(|e| format!("{name}: {e}"))?;
            if data.is_empty() || data.len() % STYLE_DIM != 0 {
                return Err(format!(
                    "{name}: {} values is not a whole number of {STYLE_DIM}-wide styles",
                    data.len()
                ));
            }
            voices.insert(name, VoiceStyles { data });
        }

        if voices.is_empty() {
            return Err("archive holds no voices".to_string());
        }
        Ok(Self { voices })
    }

    /// Styles for a speaker.
    pub fn get(&self, voice: &str) -> TtsResult<&VoiceStyles> {
        self.voices
            .get(voice)
            .ok_or_else(|| TtsError::inference(format!("voice {voice} not found in voice pack")))
    }

    /// Whether the pack has a speaker.
    pub fn contains(&self, voice: &str) -> bool {
        self.voices.contains_key(voice)
    }

    /// Number of speakers.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

/// Decode a C-ordered `<f4` `.npy` array into a flat vector.
fn parse_npy_f32(bytes: &[u8]) -> Result<Vec<f32>, String> {
    if bytes.len() < 10 || !bytes.starts_with(NPY_MAGIC) {
        return Err("missing NPY magic".to_string());
    }

    let (header_len, header_start) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            12,
        ),
        version => return Err(format!("unsupported NPY version {version}")),
    };

    let data_start = header_start + header_len;
    let header = bytes
        .get(header_start..data_start)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or("truncated NPY header")?;

    let descr = header_field(header, "descr").ok_or("NPY header has no descr")?;
    if descr.trim_matches('\'') != "<f4" {
        return Err(format!("expected little-endian float32, found {descr}"));
    }
    if header_field(header, "fortran_order") != Some("False") {
        return Err("Fortran-ordered arrays are not supported".to_string());
    }

    let shape = header_field(header, "shape").ok_or("NPY header has no shape")?;
    let count = shape
        .trim_matches(|c| c == '(' || c == ')')
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .try_fold(1usize, |acc, dim| {
            dim.parse::<usize>()
                .ok()
                .and_then(|dim| acc.checked_mul(dim))
        })
        .ok_or_else(|| format!("bad shape {shape}"))?;

    let payload = &bytes[data_start.min(bytes.len())..];
    if payload.len() != count * 4 {
        return Err(format!(
            "shape {shape} needs {} bytes, found {}",
            count * 4,
            payload.len()
        ));
    }

    Ok(payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Raw value of `key` in a NumPy header dict literal.
fn header_field<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("'{key}':");
    let start = header.find(&pattern)? + pattern.len();
    let rest = header[start..].trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')')? + 1
    } else {
        rest.find([',', '}'])?
    };
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Serialize a float32 array the way `numpy.save` does.
    fn npy(shape: &[usize], data: &[f32]) -> Vec<u8> {
        let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
        let shape = if dims.len() == 1 {
            format!("({},)", dims[0])
        } else {
            format!("({})", dims.join(", "))
        };

        let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {shape}, }}");
        let padding = (64 - (10 + header.len() + 1) % 64) % 64;
        header.push_str(&" ".repeat(padding));
        header.push('\n');

        let mut out = Vec::from(NPY_MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for value in data {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Pack arrays into an uncompressed `.npz` archive.
    fn npz(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, body) in entries {
            writer.start_file(format!("{name}.npy"), options).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Styles whose every value equals its row index.
    fn ramp(rows: usize) -> Vec<f32> {
        (0..rows)
            .flat_map(|row| std::iter::repeat_n(row as f32, STYLE_DIM))
            .collect()
    }

    #[test]
    fn test_parse_voice_pack() {
        let bytes = npz(&[
            ("af_bella", npy(&[4, 1, STYLE_DIM], &ramp(4))),
            ("am_adam", npy(&[2, 1, STYLE_DIM], &ramp(2))),
        ]);
        let pack = VoicePack::from_npz(&bytes).unwrap();

        assert_eq!(pack.len(), 2);
        assert!(pack.contains("af_bella"));
        assert!(!pack.contains("bm"));
        assert_eq!(pack.get("af_bella").unwrap().rows(), 4);
    }

    #[test]
    fn test_style_for_length() {
        let bytes = npz(&[("af_sky", npy(&[3, 1, STYLE_DIM], &ramp(3)))]);
        let pack = VoicePack::from_npz(&bytes).unwrap();
        let styles = pack.get("af_sky").unwrap();

        assert_eq!(styles.for_length(0).len(), STYLE_DIM);
        assert!(styles.for_length(1).iter().all(|&v| v == 1.0));
        // Longer than the table: last row.
        assert!(styles.for_length(50).iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_unknown_voice_is_inference_error() {
        let bytes = npz(&[("af_bella", npy(&[1, STYLE_DIM], &ramp(1)))]);
        let pack = VoicePack::from_npz(&bytes).unwrap();

        let err = pack.get("bm").unwrap_err();
        assert!(matches!(err, TtsError::Inference(_)));
        assert_eq!(err.to_string(), "inference error: voice bm not found in voice pack");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(VoicePack::from_npz(b"garbage").is_err());
        assert!(VoicePack::from_npz(&npz(&[])).is_err());
        assert!(VoicePack::from_npz(&npz(&[("af_bella", b"not npy".to_vec())])).is_err());
    }

    #[test]
    fn test_rejects_partial_style() {
        let bytes = npz(&[("af_bella", npy(&[10], &[0.0; 10]))]);
        let err = VoicePack::from_npz(&bytes).unwrap_err();
        assert!(err.contains("256-wide"));
    }

    #[test]
    fn test_npy_header_checks() {
        let mut wrong_type = npy(&[2], &[1.0, 2.0]);
        let at = wrong_type.windows(3).position(|w| w == b"<f4").unwrap();
        wrong_type[at..at + 3].copy_from_slice(b"<f8");
        assert!(parse_npy_f32(&wrong_type).unwrap_err().contains("float32"));

        let mut truncated = npy(&[2], &[1.0, 2.0]);
        truncated.pop();
        assert!(parse_npy_f32(&truncated).is_err());

        assert_eq!(parse_npy_f32(&npy(&[2], &[1.0, -2.5])).unwrap(), vec![1.0, -2.5]);
    }
}
