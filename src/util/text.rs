//! Text normalization helpers
//!
//! Small, deterministic string transforms shared by every stage. All of
//! them operate on owned `String`s and never panic on odd input.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MULTI_SPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref EDGE_PUNCT_LEADING: Regex = Regex::new(r"^[\s,;:\-–—|&.]+").unwrap();
    static ref EDGE_PUNCT_TRAILING: Regex = Regex::new(r"[\s,;:\-–—|&.]+$").unwrap();
    static ref NON_TOPIC_CHARS: Regex = Regex::new(r"[^a-z0-9\s\-]").unwrap();
    static ref HYPHEN_RUNS: Regex = Regex::new(r"-+").unwrap();
    static ref SPACE_RUNS: Regex = Regex::new(r"[\s_]+").unwrap();
}

/// Collapse runs of whitespace (including Unicode whitespace) to single
/// spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    MULTI_SPACE.replace_all(text.trim(), " ").into_owned()
}

/// Trim leading and trailing punctuation noise left behind after a span
/// was spliced out of a title.
pub fn trim_edge_punctuation(text: &str) -> String {
    let stripped = EDGE_PUNCT_LEADING.replace(text, "");
    EDGE_PUNCT_TRAILING.replace(&stripped, "").into_owned()
}

/// Remove every word-bounded, case-insensitive occurrence of `word`.
///
/// The needle is regex-escaped, so punctuation inside it (e.g. "U.S.")
/// is matched literally.
pub fn remove_word_ci(text: &str, word: &str) -> String {
    if word.trim().is_empty() {
        return text.to_string();
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, "").into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Produce the normalized topic name: lowercase, non-alphanumerics
/// replaced with hyphens (hyphens preserved), runs collapsed, edges
/// trimmed. Returns `None` when nothing survives.
pub fn normalize_topic_name(topic: &str) -> Option<String> {
    let lowered = topic.to_lowercase();
    let cleaned = NON_TOPIC_CHARS.replace_all(&lowered, "");
    let hyphenated = SPACE_RUNS.replace_all(cleaned.trim(), "-");
    let collapsed = HYPHEN_RUNS.replace_all(&hyphenated, "-");
    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
