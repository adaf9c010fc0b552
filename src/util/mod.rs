//! Shared utilities
//!
//! - `text`: whitespace/punctuation normalization and word-bounded removal
//! - `timestamp`: dual Pacific/UTC timestamp bundles for report headers

pub mod text;
pub mod timestamp;

pub use text::{collapse_whitespace, normalize_topic_name, remove_word_ci, trim_edge_punctuation};
pub use timestamp::TimestampBundle;
