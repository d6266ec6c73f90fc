//! Text to Kokoro token ids.
//!
//! Words are converted to IPA by the `espeak-ng` command-line tool;
//! punctuation is kept in place. Every phoneme character is then mapped to
//! its id in the Kokoro v1.0 vocabulary. Characters outside the vocabulary
//! are dropped.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use tts_core::{TtsError, TtsResult, Voice};

/// Longest phoneme sequence the model takes in one pass.
pub const MAX_PHONEMES: usize = 510;

/// Id framing every sequence fed to the model.
pub const PAD_TOKEN: i64 = 0;

/// Id of the word separator.
const SPACE_TOKEN: i64 = 16;

/// Punctuation passed through to the model unchanged.
const PUNCTUATION: &[char] = &[';', ':', ',', '.', '!', '?', '—', '…', '"', '(', ')', '“', '”'];

/// espeak-ng driven grapheme-to-phoneme conversion.
#[derive(Debug, Clone)]
pub struct Phonemizer {
    program: PathBuf,
}

impl Phonemizer {
    /// Use `program` after checking that it runs.
    pub fn new(program: impl AsRef<Path>) -> TtsResult<Self> {
        let program = program.as_ref().to_path_buf();
        let output = Command::new(&program)
            .arg("--version")
            .output()
            .map_err(|e| {
                TtsError::config(format!("phonemizer {} not available: {e}", program.display()))
            })?;

        if !output.status.success() {
            return Err(TtsError::config(format!(
                "phonemizer {} failed: {}",
                program.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!(
            program = %program.display(),
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "Phonemizer ready"
        );
        Ok(Self { program })
    }

    /// IPA phonemes for `text`, spoken with the accent of `voice`.
    pub fn phonemize(&self, text: &str, voice: Voice) -> TtsResult<String> {
        let language = espeak_language(voice);
        let mut phonemes = String::new();

        for (words, punctuation) in split_punctuation(text) {
            if !words.trim().is_empty() {
                if !phonemes.is_empty() && !phonemes.ends_with(' ') {
                    phonemes.push(' ');
                }
                phonemes.push_str(&self.espeak(words, language)?);
            }
            if let Some(mark) = punctuation {
                phonemes.push(mark);
                phonemes.push(' ');
            }
        }

        Ok(phonemes.trim().to_string())
    }

    fn espeak(&self, text: &str, language: &str) -> TtsResult<String> {
        let mut child = Command::new(&self.program)
            .args(["-q", "--ipa", "--stdin", "-v", language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TtsError::inference(format!("failed to run {}: {e}", self.program.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(TtsError::inference(format!(
                "espeak-ng failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let ipa = String::from_utf8_lossy(&output.stdout);
        Ok(strip_language_flags(&ipa)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// espeak-ng voice for a speaker's accent.
pub fn espeak_language(voice: Voice) -> &'static str {
    if voice.is_british() { "en-gb" } else { "en-us" }
}

/// Split text into runs of words, each followed by the punctuation mark
/// that ends it.
fn split_punctuation(text: &str) -> Vec<(&str, Option<char>)> {
    let mut runs = Vec::new();
    let mut start = 0;
    for (at, c) in text.char_indices() {
        if PUNCTUATION.contains(&c) {
            runs.push((&text[start..at], Some(c)));
            start = at + c.len_utf8();
        }
    }
    if start < text.len() {
        runs.push((&text[start..], None));
    }
    runs
}

/// Drop the `(en)`-style markers espeak-ng emits when it switches language.
fn strip_language_flags(ipa: &str) -> String {
    let mut out = String::with_capacity(ipa.len());
    let mut rest = ipa;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Map phonemes to vocabulary ids, skipping unknown characters.
pub fn tokenize(phonemes: &str) -> Vec<i64> {
    phonemes.chars().filter_map(token_id).collect()
}

/// Split a token sequence into model-sized pieces, preferring word
/// boundaries. Separators at a cut are dropped.
pub fn chunk_tokens(tokens: &[i64]) -> Vec<&[i64]> {
    let mut chunks = Vec::new();
    let mut rest = tokens;

    while rest.len() > MAX_PHONEMES {
        let cut = rest[..MAX_PHONEMES]
            .iter()
            .rposition(|&t| t == SPACE_TOKEN)
            .filter(|&at| at > 0)
            .unwrap_or(MAX_PHONEMES);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail.strip_prefix(&[SPACE_TOKEN]).unwrap_or(tail);
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Kokoro v1.0 phoneme vocabulary.
fn token_id(c: char) -> Option<i64> {
    let id = match c {
        ';' => 1,
        ':' => 2,
        ',' => 3,
        '.' => 4,
        '!' => 5,
        '?' => 6,
        '—' => 9,
        '…' => 10,
        '"' => 11,
        '(' => 12,
        ')' => 13,
        '“' => 14,
        '”' => 15,
        ' ' => 16,
        '\u{0303}' => 17,
        'ʣ' => 18,
        'ʥ' => 19,
        'ʦ' => 20,
        'ʨ' => 21,
        'ᵝ' => 22,
        'ꭧ' => 23,
        'A' => 24,
        'I' => 25,
        'O' => 31,
        'Q' => 33,
        'S' => 35,
        'T' => 36,
        'W' => 39,
        'Y' => 41,
        'ᵊ' => 42,
        'a' => 43,
        'b' => 44,
        'c' => 45,
        'd' => 46,
        'e' => 47,
        'f' => 48,
        'h' => 50,
        'i' => 51,
        'j' => 52,
        'k' => 53,
        'l' => 54,
        'm' => 55,
        'n' => 56,
        'o' => 57,
        'p' => 58,
        'q' => 59,
        'r' => 60,
        's' => 61,
        't' => 62,
        'u' => 63,
        'v' => 64,
        'w' => 65,
        'x' => 66,
        'y' => 67,
        'z' => 68,
        'ɑ' => 69,
        'ɐ' => 70,
        'ɒ' => 71,
        'æ' => 72,
        'β' => 75,
        'ɔ' => 76,
        'ɕ' => 77,
        'ç' => 78,
        'ɖ' => 80,
        'ð' => 81,
        'ʤ' => 82,
        'ə' => 83,
        'ɚ' => 85,
        'ɛ' => 86,
        'ɜ' => 87,
        'ɟ' => 90,
        'ɡ' => 92,
        'ɥ' => 99,
        'ɨ' => 101,
        'ɪ' => 102,
        'ʝ' => 103,
        'ɯ' => 110,
        'ɰ' => 111,
        'ŋ' => 112,
        'ɳ' => 113,
        'ɲ' => 114,
        'ɴ' => 115,
        'ø' => 116,
        'ɸ' => 118,
        'θ' => 119,
        'œ' => 120,
        'ɹ' => 123,
        'ɾ' => 125,
        'ɻ' => 126,
        'ʁ' => 128,
        'ɽ' => 129,
        'ʂ' => 130,
        'ʃ' => 131,
        'ʈ' => 132,
        'ʧ' => 133,
        'ʊ' => 135,
        'ʋ' => 136,
        'ʌ' => 138,
        'ɣ' => 139,
        'ɤ' => 140,
        'χ' => 142,
        'ʎ' => 143,
        'ʒ' => 147,
        'ʔ' => 148,
        'ˈ' => 156,
        'ˌ' => 157,
        'ː' => 158,
        'ʰ' => 162,
        'ʲ' => 164,
        '↓' => 169,
        '→' => 171,
        '↗' => 172,
        '↘' => 173,
        'ᵻ' => 177,
        _ => return None,
    };
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_known_phonemes() {
        // "hello world" as espeak-ng writes it for en-us.
        assert_eq!(
            tokenize("həlˈoʊ wˈɜːld"),
            vec![50, 83, 54, 156, 57, 135, 16, 65, 156, 87, 158, 54, 46]
        );
    }

    #[test]
    fn test_tokenize_drops_unknown() {
        assert_eq!(tokenize("a_b͡"), vec![43, 44]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_split_punctuation() {
        assert_eq!(
            split_punctuation("Hello, world!"),
            vec![("Hello", Some(',')), (" world", Some('!'))]
        );
        assert_eq!(split_punctuation("no marks"), vec![("no marks", None)]);
        assert!(split_punctuation("").is_empty());
    }

    #[test]
    fn test_strip_language_flags() {
        assert_eq!(strip_language_flags("(fr)bɔ̃ʒuːʁ(en) ænd"), "bɔ̃ʒuːʁ ænd");
        assert_eq!(strip_language_flags("plain"), "plain");
        assert_eq!(strip_language_flags("open (only"), "open (only");
    }

    #[test]
    fn test_espeak_language() {
        assert_eq!(espeak_language(Voice::AfBella), "en-us");
        assert_eq!(espeak_language(Voice::AmMichael), "en-us");
        assert_eq!(espeak_language(Voice::BfIsabella), "en-gb");
        assert_eq!(espeak_language(Voice::Bm), "en-gb");
    }

    #[test]
    fn test_short_sequence_is_one_chunk() {
        let tokens = tokenize("həlˈoʊ");
        assert_eq!(chunk_tokens(&tokens), vec![tokens.as_slice()]);
        assert!(chunk_tokens(&[]).is_empty());
    }

    #[test]
    fn test_long_sequence_splits_on_words() {
        // 200 words of four phonemes each.
        let word = [43, 44, 45, 46];
        let tokens: Vec<i64> = (0..200)
            .flat_map(|i| {
                let sep = (i > 0).then_some(SPACE_TOKEN);
                sep.into_iter().chain(word)
            })
            .collect();

        let chunks = chunk_tokens(&tokens);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= MAX_PHONEMES));
        assert!(chunks.iter().all(|c| c[0] != SPACE_TOKEN));
        assert!(chunks.iter().all(|c| c.len() % 5 == 4));
        let kept: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(kept, tokens.len() - (chunks.len() - 1));
    }

    #[test]
    fn test_unbroken_sequence_splits_hard() {
        let tokens = vec![43; MAX_PHONEMES * 2 + 3];
        let lengths: Vec<usize> = chunk_tokens(&tokens).iter().map(|c| c.len()).collect();
        assert_eq!(lengths, vec![MAX_PHONEMES, MAX_PHONEMES, 3]);
    }

    #[test]
    fn test_missing_program_is_config_error() {
        let err = Phonemizer::new("/nonexistent/espeak-ng").unwrap_err();
        assert!(matches!(err, TtsError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/espeak-ng"));
    }
}
