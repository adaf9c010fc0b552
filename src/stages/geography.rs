//! Stage 4: Geographic entity detector
//!
//! Priority-ordered, longest-match-first pattern engine with alias
//! resolution. Compound regions ("Europe, Middle East and Africa") sit
//! at priority 1 so they match before their component regions. Every
//! accepted match resolves to the pattern's primary term, is appended
//! to the ordered region list, and is spliced out of the working string
//! with separator-aware cleanup.
//!
//! # Architecture
//!
//! - pattern synthesis: primary + aliases escaped, longest alternative
//!   first, per-alternative word boundaries; compound terms get flexible
//!   whitespace and `and|&` connective alternation
//! - hyphenation guard: "De-identified" must never yield a region for
//!   "De"; a small context window is inspected around every match
//! - cleanup: connector words between two regions are removed with the
//!   match; `&` and `+` survive at string edges when they sit between
//!   alphanumerics ("AT&T", "C++")

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::library::{compile_insensitive, CompiledPattern, PatternKind, PatternLibrary};
use crate::util::text::collapse_whitespace;

/// How many top-priority patterns the connector-removal check scans.
const CONNECTOR_SCAN_PATTERNS: usize = 20;

lazy_static! {
    static ref DOUBLE_COMMA: Regex = Regex::new(r"\s*,\s*,\s*").unwrap();
    static ref DOUBLE_AMP: Regex = Regex::new(r"\s*&\s*&\s*").unwrap();
    static ref COMMA_AND_COMMA: Regex = Regex::new(r"\s*,\s*and\s*,\s*").unwrap();
    static ref DOUBLE_AND: Regex = Regex::new(r"(?i)\band\s+and\b").unwrap();
    static ref LEADING_CONNECTOR: Regex = Regex::new(r"(?i)^\s*(?:and|plus)\s+").unwrap();
    static ref TRAILING_CONNECTOR: Regex = Regex::new(r"(?i)\s+(?:and|plus)\s*$").unwrap();
    static ref AMP_BETWEEN_WORDS: Regex = Regex::new(r"\w\s*&\s*\w").unwrap();
    static ref PLUS_BETWEEN_WORDS: Regex = Regex::new(r"\w\s*\+\s*\w").unwrap();
    static ref TRAILING_PREPOSITION: Regex =
        Regex::new(r"(?i)\s+(?:in|for|by|of|at|to|with|from)\s*$").unwrap();
    static ref LEADING_PREPOSITION: Regex =
        Regex::new(r"(?i)^(?:in|for|by|of|at|to|with|from)\s+").unwrap();
    static ref CONNECTOR_BEFORE: Regex = Regex::new(r"(?i)\b(?:and|plus)\s*$").unwrap();
    static ref CONNECTOR_AFTER: Regex = Regex::new(r"(?i)^\s*(?:and|plus)\b").unwrap();
}

/// Result of geographic entity extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographicExtraction {
    /// Primary terms in order of acceptance, deduplicated
    pub extracted_regions: Vec<String>,
    /// Working string with all region spans removed and cleaned
    pub title: String,
    pub confidence: f64,
    /// Library ids of the patterns that fired
    pub pattern_ids: Vec<String>,
    pub notes: Vec<String>,
}

struct GeoPattern {
    id: String,
    term: String,
    aliases: Vec<String>,
    regex: Regex,
}

struct SuppressionRule {
    term_lower: String,
    regex: Regex,
}

/// Geographic entity detector over the library's region patterns.
pub struct GeographicDetector {
    patterns: Vec<GeoPattern>,
    suppressions: Vec<SuppressionRule>,
}

impl GeographicDetector {
    /// Build the detector from the library. Records without an explicit
    /// regex get one synthesized from the primary term and aliases;
    /// synthesis failures drop the pattern with a warning.
    pub fn new(library: &PatternLibrary) -> Self {
        let mut patterns = Vec::new();
        for compiled in library.patterns(PatternKind::GeographicEntity) {
            let regex = match &compiled.regex {
                Some(regex) => regex.clone(),
                None => {
                    let source = synthesize_pattern(compiled);
                    match compile_insensitive(&source) {
                        Ok(regex) => regex,
                        Err(e) => {
                            warn!(term = %compiled.term(), error = %e, "dropping geographic pattern");
                            continue;
                        }
                    }
                }
            };
            patterns.push(GeoPattern {
                id: compiled.record.id.clone(),
                term: compiled.term().to_string(),
                aliases: compiled.record.aliases.clone(),
                regex,
            });
        }

        let suppressions = library
            .patterns(PatternKind::ConfusingTerm)
            .iter()
            .filter_map(|p| {
                Some(SuppressionRule {
                    term_lower: p.term().to_lowercase(),
                    regex: p.regex.clone()?,
                })
            })
            .collect();

        GeographicDetector {
            patterns,
            suppressions,
        }
    }

    /// Extract geographic entities from the working string.
    pub fn extract(&self, title: &str) -> GeographicExtraction {
        if title.trim().is_empty() {
            return GeographicExtraction {
                extracted_regions: Vec::new(),
                title: String::new(),
                confidence: 1.0,
                pattern_ids: Vec::new(),
                notes: vec!["empty input".to_string()],
            };
        }

        let suppressed: Vec<&SuppressionRule> = self
            .suppressions
            .iter()
            .filter(|rule| rule.regex.is_match(title))
            .collect();

        let mut regions: Vec<String> = Vec::new();
        let mut pattern_ids: Vec<String> = Vec::new();
        let mut notes: Vec<String> = Vec::new();
        let mut working = title.to_string();

        for pattern in &self.patterns {
            let matches: Vec<(usize, usize, String)> = pattern
                .regex
                .find_iter(&working)
                .map(|m| (m.start(), m.end(), m.as_str().to_string()))
                .filter(|(start, end, text)| {
                    text.trim().len() >= 2 && !is_hyphenated(&working, *start, *end)
                })
                .filter(|(_, _, text)| {
                    !suppressed
                        .iter()
                        .any(|rule| rule.term_lower == pattern.term.to_lowercase()
                            || rule.term_lower == text.to_lowercase())
                })
                .collect();

            if matches.is_empty() {
                continue;
            }

            // Reverse order keeps earlier span offsets valid while splicing
            for (start, end, text) in matches.iter().rev() {
                let resolved = resolve_primary(text, pattern);
                if !regions.contains(&resolved) {
                    regions.push(resolved);
                    pattern_ids.push(pattern.id.clone());
                }
                // Edge trimming during cleanup can shift earlier offsets;
                // re-locate the occurrence when the span no longer lines up
                let (start, end) = if span_matches(&working, *start, *end, text) {
                    (*start, *end)
                } else {
                    match pattern.regex.find(&working) {
                        Some(m) => (m.start(), m.end()),
                        None => continue,
                    }
                };
                working = self.remove_with_cleanup(&working, start, end);
            }
            notes.push(format!("pattern '{}': {} matches", pattern.term, matches.len()));
            debug!(pattern = %pattern.term, matches = matches.len(), "geographic matches");
        }

        let confidence = confidence_score(&regions, &working);
        let cleaned = final_cleanup(&working);

        GeographicExtraction {
            extracted_regions: regions,
            title: cleaned,
            confidence,
            pattern_ids,
            notes,
        }
    }

    /// Splice a match out of the text, removing a flanking connector
    /// word when it joins this region to another one.
    fn remove_with_cleanup(&self, text: &str, start: usize, end: usize) -> String {
        let mut before = text[..start].trim_end().to_string();
        let mut after = text[end..].trim_start().to_string();

        // "U.S. And Europe": the "And" between two regions goes with the match
        if let Some(m) = CONNECTOR_BEFORE.find(&before) {
            let head = before[..m.start()].trim_end().to_string();
            if self.ends_with_region(&head) {
                before = head;
            }
        }
        if let Some(m) = CONNECTOR_AFTER.find(&after) {
            let tail = after[m.end()..].trim_start().to_string();
            if self.starts_with_region(&tail) {
                after = tail;
            }
        }

        let mut joined = format!("{before} {after}");
        joined = DOUBLE_COMMA.replace_all(&joined, ", ").into_owned();
        joined = DOUBLE_AMP.replace_all(&joined, " & ").into_owned();
        joined = COMMA_AND_COMMA.replace_all(&joined, " ").into_owned();
        joined = DOUBLE_AND.replace_all(&joined, " ").into_owned();
        joined = collapse_whitespace(&joined);

        // Edge punctuation: `&` only comes off when it is not serving as
        // a real connective between words ("AT&T")
        if AMP_BETWEEN_WORDS.is_match(&joined) {
            joined = trim_edges(&joined, &[',', ';', '-']);
        } else {
            joined = trim_edges(&joined, &[',', ';', '-', '&']);
        }
        joined = LEADING_CONNECTOR.replace(&joined, "").into_owned();
        joined = TRAILING_CONNECTOR.replace(&joined, "").into_owned();

        joined.trim().to_string()
    }

    fn ends_with_region(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.patterns
            .iter()
            .take(CONNECTOR_SCAN_PATTERNS.min(self.patterns.len()))
            .any(|p| {
                p.regex
                    .find_iter(text)
                    .any(|m| m.end() == text.len())
            })
    }

    fn starts_with_region(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.patterns
            .iter()
            .take(CONNECTOR_SCAN_PATTERNS.min(self.patterns.len()))
            .any(|p| p.regex.find(text).map(|m| m.start() == 0).unwrap_or(false))
    }
}

// ----------------------------------------------------------------------
// Pattern synthesis
// ----------------------------------------------------------------------

/// Synthesize a regex source for a geographic record: every alternative
/// (primary + aliases) escaped, sorted longest first, with boundaries
/// that tolerate alternatives ending in punctuation ("U.S.").
fn synthesize_pattern(compiled: &CompiledPattern) -> String {
    let mut alternatives: Vec<&str> = std::iter::once(compiled.term())
        .chain(compiled.record.aliases.iter().map(String::as_str))
        .collect();
    alternatives.sort_by_key(|a| std::cmp::Reverse(a.len()));

    let parts: Vec<String> = alternatives
        .iter()
        .map(|alternative| {
            let escaped = if alternative.contains(',') || contains_word_and(alternative) {
                flexible_compound(alternative)
            } else {
                regex::escape(alternative).replace(r"\ ", r"\s+")
            };
            let leading = if alternative
                .chars()
                .next()
                .map(|c| c.is_alphanumeric())
                .unwrap_or(false)
            {
                r"\b"
            } else {
                ""
            };
            let trailing = if alternative
                .chars()
                .last()
                .map(|c| c.is_alphanumeric())
                .unwrap_or(false)
            {
                r"\b"
            } else {
                ""
            };
            format!("{leading}{escaped}{trailing}")
        })
        .collect();

    format!("(?:{})", parts.join("|"))
}

fn contains_word_and(term: &str) -> bool {
    term.split_whitespace().any(|w| w.eq_ignore_ascii_case("and"))
}

/// Compound terms ("Europe, Middle East and Africa") match with flexible
/// whitespace, optional commas, and `and`/`&` connective alternation.
fn flexible_compound(term: &str) -> String {
    let mut parts = Vec::new();
    for word in term.split_whitespace() {
        let bare = word.trim_end_matches(',');
        if bare.eq_ignore_ascii_case("and") || bare == "&" {
            parts.push(r"(?:and|&)".to_string());
        } else {
            let mut escaped = regex::escape(bare);
            if word.ends_with(',') {
                escaped.push_str(",?");
            }
            parts.push(escaped);
        }
    }
    parts.join(r"\s+")
}

// ----------------------------------------------------------------------
// Guards and cleanup
// ----------------------------------------------------------------------

/// True when `[start, end)` still holds the originally matched text.
fn span_matches(text: &str, start: usize, end: usize, expected: &str) -> bool {
    end <= text.len()
        && text.is_char_boundary(start)
        && text.is_char_boundary(end)
        && &text[start..end] == expected
}

/// True when the match is part of a hyphenated word. Inspects up to ten
/// characters of context on both sides for `word-match`, `match-word`,
/// or `word-match-word` shapes.
fn is_hyphenated(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    if start > 0 && bytes[start - 1] == b'-' {
        return true;
    }
    if end < bytes.len() && bytes[end] == b'-' {
        return true;
    }

    let context_start = floor_char_boundary(text, start.saturating_sub(10));
    let context_end = ceil_char_boundary(text, (end + 10).min(text.len()));
    let context = &text[context_start..context_end];
    let matched = &text[start..end];

    let pattern = format!(
        r"(?i)\w+-{m}(?:-\w+)?|\w+-{m}|{m}-\w+",
        m = regex::escape(matched)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(context))
        .unwrap_or(false)
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Resolve matched text to the pattern's primary term.
fn resolve_primary(matched: &str, pattern: &GeoPattern) -> String {
    let matched_lower = matched.to_lowercase();
    if pattern.term.to_lowercase() == matched_lower {
        return pattern.term.clone();
    }
    for alias in &pattern.aliases {
        if alias.to_lowercase() == matched_lower {
            return pattern.term.clone();
        }
    }
    // Flexible compound spellings still resolve to the primary
    if normalize_compound(&matched_lower) == normalize_compound(&pattern.term.to_lowercase()) {
        return pattern.term.clone();
    }
    for alias in &pattern.aliases {
        if normalize_compound(&matched_lower) == normalize_compound(&alias.to_lowercase()) {
            return pattern.term.clone();
        }
    }
    matched.to_string()
}

fn normalize_compound(text: &str) -> String {
    text.replace('&', "and")
        .replace(',', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_edges(text: &str, chars: &[char]) -> String {
    text.trim_matches(|c: char| c.is_whitespace() || chars.contains(&c))
        .to_string()
}

/// Final pass: strip stranded connectors, orphan prepositions, and
/// one-character remnants (keeping `&` and `+`).
fn final_cleanup(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let mut cleaned = text.to_string();
    cleaned = LEADING_CONNECTOR.replace(&cleaned, "").into_owned();
    cleaned = TRAILING_CONNECTOR.replace(&cleaned, "").into_owned();

    let amp_between = AMP_BETWEEN_WORDS.is_match(&cleaned);
    let plus_between = PLUS_BETWEEN_WORDS.is_match(&cleaned);
    let mut edge_chars: Vec<char> = vec![',', ';', '-'];
    if !amp_between {
        edge_chars.push('&');
    }
    if !plus_between {
        edge_chars.push('+');
    }
    cleaned = trim_edges(&cleaned, &edge_chars);

    cleaned = TRAILING_PREPOSITION.replace(&cleaned, "").into_owned();
    cleaned = LEADING_PREPOSITION.replace(&cleaned, "").into_owned();
    cleaned = collapse_whitespace(&cleaned);

    // One-character remnants go, except the symbols that carry meaning
    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|word| {
            let stripped = word.trim_matches(|c: char| ".,;:-()[]{}".contains(c));
            stripped.chars().count() > 1 || *word == "&" || *word == "+"
        })
        .collect();

    words.join(" ")
}

/// Confidence: 0.80 base, +0.05 per region (capped at +0.20), -0.10 per
/// suspicious-remainder signature, clamped to [0, 1].
fn confidence_score(regions: &[String], remainder: &str) -> f64 {
    let mut confidence = 0.80;
    if !regions.is_empty() {
        confidence += (regions.len() as f64 * 0.05).min(0.20);
    }

    lazy_static! {
        static ref SUSPICIOUS: Vec<Regex> = vec![
            Regex::new(r"(?i)\band\s*$").unwrap(),
            Regex::new(r"(?i)^\s*and\b").unwrap(),
            Regex::new(r"(?i)\bplus\s*$").unwrap(),
            Regex::new(r"(?i)^\s*plus\b").unwrap(),
            Regex::new(r"(?i)\bin\s*$").unwrap(),
            Regex::new(r"^\s*&").unwrap(),
            Regex::new(r"\b\w\b").unwrap(),
        ];
    }
    for signature in SUSPICIOUS.iter() {
        if signature.is_match(remainder) {
            confidence -= 0.10;
        }
    }

    (confidence.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}
