//! Content hashing for draft signatures and approved script fingerprints.
//!
//! Two schemes exist: blake3 and a deterministic rolling checksum for builds
//! where a cryptographic primitive is not wanted. A [`ContentHasher`] is bound
//! to one scheme for its whole lifetime, so identical content always produces
//! identical hashes within a store.

use crate::model::wire_enum;

wire_enum!(
    /// Algorithm tag recorded next to approved script hashes.
    HashAlgo {
        Blake3 => "blake3",
        Checksum => "checksum",
    }
);

/// Trim, then fold CRLF line endings to LF.
pub fn normalize_script(text: &str) -> String {
    text.trim().replace("\r\n", "\n")
}

/// Normalized text with every whitespace run collapsed to one space.
fn collapse_whitespace(text: &str) -> String {
    normalize_script(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split a script into sentences. A sentence is a run of non-terminal
/// characters followed by a run of `.`, `!` or `?`; trailing text without a
/// terminator is its own sentence.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let collapsed = collapse_whitespace(text);
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = collapsed.chars().peekable();

    while let Some(c) = chars.next() {
        if !is_terminal(c) {
            current.push(c);
            continue;
        }
        if current.is_empty() {
            // terminators with no preceding text are dropped
            continue;
        }
        current.push(c);
        while let Some(&next) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            current.push(next);
            chars.next();
        }
        sentences.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn rolling_checksum(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    format!("h{}", hash.unsigned_abs())
}

/// Per-section fingerprints recorded at approval time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHashes {
    pub script_hash: String,
    pub sentence_hashes: Vec<String>,
}

/// Outcome of comparing current text against approved sentence hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceDiff {
    pub changed_sentences: usize,
    pub current_sentence_hashes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHasher {
    algo: HashAlgo,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::preferred()
    }
}

impl ContentHasher {
    pub fn new(algo: HashAlgo) -> Self {
        Self { algo }
    }

    /// The cryptographic scheme.
    pub fn preferred() -> Self {
        Self::new(HashAlgo::Blake3)
    }

    pub fn algo(&self) -> HashAlgo {
        self.algo
    }

    /// Hash an already canonical payload as-is.
    pub fn digest(&self, payload: &str) -> String {
        match self.algo {
            HashAlgo::Blake3 => blake3::hash(payload.as_bytes()).to_hex().to_string(),
            HashAlgo::Checksum => {
                format!("{}_{}", payload.encode_utf16().count(), rolling_checksum(payload))
            }
        }
    }

    /// Hash script text after normalization.
    pub fn hash_text(&self, text: &str) -> String {
        self.digest(&normalize_script(text))
    }

    pub fn script_hashes(&self, script: &str) -> ScriptHashes {
        ScriptHashes {
            script_hash: self.hash_text(script),
            sentence_hashes: split_into_sentences(script)
                .iter()
                .map(|sentence| self.hash_text(sentence))
                .collect(),
        }
    }

    /// Count sentence positions whose hash no longer matches the approved one.
    pub fn sentence_diff(&self, approved: &[String], current_text: &str) -> SentenceDiff {
        let current: Vec<String> = split_into_sentences(current_text)
            .iter()
            .map(|sentence| self.hash_text(sentence))
            .collect();
        let max = approved.len().max(current.len());
        let changed_sentences = (0..max)
            .filter(|&i| approved.get(i) != current.get(i))
            .count();
        SentenceDiff {
            changed_sentences,
            current_sentence_hashes: current,
        }
    }
}
