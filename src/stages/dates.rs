//! Stage 2: Date extractor
//!
//! Extracts a single forecast date range from a title and hands the
//! cleaned title forward. Format families come from the library, in
//! decreasing reliability: range, terminal comma, bracket (with the
//! preserved-words behavior), embedded, and a multiple-year fallback
//! that picks the latest valid year.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::library::{PatternKind, PatternLibrary};
use crate::util::text::{collapse_whitespace, trim_edge_punctuation};

lazy_static! {
    static ref YEAR_TOKEN: Regex = Regex::new(r"\b(20\d{2})\b").unwrap();
}

/// Inclusive year validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub min: i32,
    pub max: i32,
}

impl Default for YearWindow {
    fn default() -> Self {
        YearWindow { min: 2020, max: 2040 }
    }
}

impl YearWindow {
    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

/// Date format family of an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    RangeFormat,
    TerminalComma,
    BracketFormat,
    EmbeddedFormat,
    MultipleDates,
    Unknown,
}

/// Categorization of the extraction outcome for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateCategory {
    /// A date was extracted
    Extracted,
    /// The title carries no in-window year token at all
    NoDatesPresent,
    /// A year token is present but no format family fired
    Missed,
}

/// Result of date extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateExtraction {
    /// Normalized "YYYY" or "YYYY-YYYY"
    pub extracted_date_range: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub format: DateFormat,
    pub confidence: f64,
    pub matched_pattern_id: Option<String>,
    /// Raw matched substring for audit
    pub raw_match: Option<String>,
    /// Title with the date span removed and punctuation normalized
    pub cleaned_title: String,
    /// Non-year bracket tokens reinserted into the residual
    #[serde(default)]
    pub preserved_words: Vec<String>,
    pub category: DateCategory,
    pub notes: String,
}

impl DateExtraction {
    fn absent(title: &str, category: DateCategory, notes: &str) -> Self {
        DateExtraction {
            extracted_date_range: None,
            start_year: None,
            end_year: None,
            format: DateFormat::Unknown,
            confidence: 0.0,
            matched_pattern_id: None,
            raw_match: None,
            cleaned_title: title.to_string(),
            preserved_words: Vec::new(),
            category,
            notes: notes.to_string(),
        }
    }
}

struct FamilyPattern {
    id: String,
    regex: Regex,
}

/// Date extractor over the library's date patterns.
pub struct DateExtractor {
    range: Vec<FamilyPattern>,
    terminal: Vec<FamilyPattern>,
    bracket: Vec<FamilyPattern>,
    embedded: Vec<FamilyPattern>,
    window: YearWindow,
}

fn base_confidence(format: DateFormat) -> f64 {
    match format {
        DateFormat::RangeFormat => 0.98,
        DateFormat::TerminalComma => 0.95,
        DateFormat::BracketFormat => 0.90,
        DateFormat::EmbeddedFormat => 0.85,
        DateFormat::MultipleDates => 0.60,
        DateFormat::Unknown => 0.30,
    }
}

impl DateExtractor {
    /// Build the extractor from the library's date patterns.
    pub fn new(library: &PatternLibrary) -> Self {
        Self::with_window(library, YearWindow::default())
    }

    /// Build with an explicit year validity window.
    pub fn with_window(library: &PatternLibrary, window: YearWindow) -> Self {
        let collect = |format: &str| -> Vec<FamilyPattern> {
            library
                .patterns(PatternKind::DatePattern)
                .iter()
                .filter(|p| p.record.format_type.as_deref() == Some(format))
                .filter_map(|p| {
                    Some(FamilyPattern {
                        id: p.record.id.clone(),
                        regex: p.regex.clone()?,
                    })
                })
                .collect()
        };

        DateExtractor {
            range: collect("range_format"),
            terminal: collect("terminal_comma"),
            bracket: collect("bracket_format"),
            embedded: collect("embedded_format"),
            window,
        }
    }

    pub fn window(&self) -> YearWindow {
        self.window
    }

    /// Extract the forecast date range from a title.
    pub fn extract(&self, title: &str) -> DateExtraction {
        if title.trim().is_empty() {
            return DateExtraction::absent(title, DateCategory::NoDatesPresent, "empty title");
        }

        let mut best: Option<DateExtraction> = None;
        let candidates = [
            self.extract_range(title),
            self.extract_terminal(title),
            self.extract_bracket(title),
            self.extract_embedded(title),
        ];
        for candidate in candidates.into_iter().flatten() {
            let better = best
                .as_ref()
                .map(|b| candidate.confidence > b.confidence)
                .unwrap_or(true);
            if better {
                best = Some(candidate);
            }
        }

        // Multiple-year fallback when no structural match fired cleanly
        if best.as_ref().map(|b| b.confidence < 0.8).unwrap_or(true) {
            if let Some(fallback) = self.extract_multiple(title) {
                let better = best
                    .as_ref()
                    .map(|b| fallback.confidence > b.confidence)
                    .unwrap_or(true);
                if better {
                    best = Some(fallback);
                }
            }
        }

        match best {
            Some(result) => result,
            None => {
                let any_year = YEAR_TOKEN
                    .captures_iter(title)
                    .filter_map(|c| c[1].parse::<i32>().ok())
                    .any(|y| self.window.contains(y));
                if any_year {
                    DateExtraction::absent(title, DateCategory::Missed, "year token present but no format matched")
                } else {
                    DateExtraction::absent(title, DateCategory::NoDatesPresent, "no date patterns detected")
                }
            }
        }
    }

    fn extract_range(&self, title: &str) -> Option<DateExtraction> {
        for pattern in &self.range {
            let caps = match pattern.regex.captures(title) {
                Some(caps) => caps,
                None => continue,
            };
            let start: i32 = caps.get(1)?.as_str().parse().ok()?;
            let end_str = caps.get(2)?.as_str();
            // Abbreviated end year expands with the start year's century
            let end: i32 = if end_str.len() == 2 {
                format!("{}{}", &caps[1][..2], end_str).parse().ok()?
            } else {
                end_str.parse().ok()?
            };

            if !self.window.contains(start) || !self.window.contains(end) {
                continue;
            }
            if end < start || end - start > 15 {
                continue;
            }

            let mut confidence = base_confidence(DateFormat::RangeFormat);
            if end == start {
                confidence *= 0.9;
            }

            let raw = caps.get(0).unwrap();
            return Some(DateExtraction {
                extracted_date_range: Some(if end != start {
                    format!("{start}-{end}")
                } else {
                    start.to_string()
                }),
                start_year: Some(start),
                end_year: Some(end),
                format: DateFormat::RangeFormat,
                confidence: round3(confidence),
                matched_pattern_id: Some(pattern.id.clone()),
                raw_match: Some(raw.as_str().to_string()),
                cleaned_title: splice_out(title, raw.start(), raw.end(), None),
                preserved_words: Vec::new(),
                category: DateCategory::Extracted,
                notes: "range format".to_string(),
            });
        }
        None
    }

    fn extract_terminal(&self, title: &str) -> Option<DateExtraction> {
        for pattern in &self.terminal {
            let caps = match pattern.regex.captures(title) {
                Some(caps) => caps,
                None => continue,
            };
            let year: i32 = caps.get(1)?.as_str().parse().ok()?;
            if !self.window.contains(year) {
                continue;
            }
            let raw = caps.get(0).unwrap();
            return Some(DateExtraction {
                extracted_date_range: Some(year.to_string()),
                start_year: Some(year),
                end_year: None,
                format: DateFormat::TerminalComma,
                confidence: round3(base_confidence(DateFormat::TerminalComma)),
                matched_pattern_id: Some(pattern.id.clone()),
                raw_match: Some(raw.as_str().to_string()),
                cleaned_title: splice_out(title, raw.start(), raw.end(), None),
                preserved_words: Vec::new(),
                category: DateCategory::Extracted,
                notes: "terminal comma format".to_string(),
            });
        }
        None
    }

    /// Bracket family: the bracket content is removed, the year is
    /// extracted, and any non-year tokens are reinserted in place.
    fn extract_bracket(&self, title: &str) -> Option<DateExtraction> {
        for pattern in &self.bracket {
            let caps = match pattern.regex.captures(title) {
                Some(caps) => caps,
                None => continue,
            };
            let content = caps.get(1)?.as_str();
            let year = YEAR_TOKEN
                .captures_iter(content)
                .filter_map(|c| c[1].parse::<i32>().ok())
                .find(|y| self.window.contains(*y))?;

            let preserved: Vec<String> = content
                .split_whitespace()
                .filter(|token| {
                    token
                        .trim_matches(|c: char| !c.is_alphanumeric())
                        .parse::<i32>()
                        .map(|y| !self.window.contains(y))
                        .unwrap_or(true)
                })
                .map(str::to_string)
                .collect();

            let raw = caps.get(0).unwrap();
            let replacement = if preserved.is_empty() {
                None
            } else {
                Some(preserved.join(" "))
            };
            return Some(DateExtraction {
                extracted_date_range: Some(year.to_string()),
                start_year: Some(year),
                end_year: None,
                format: DateFormat::BracketFormat,
                confidence: round3(base_confidence(DateFormat::BracketFormat)),
                matched_pattern_id: Some(pattern.id.clone()),
                raw_match: Some(raw.as_str().to_string()),
                cleaned_title: splice_out(title, raw.start(), raw.end(), replacement.as_deref()),
                preserved_words: preserved,
                category: DateCategory::Extracted,
                notes: "bracket format".to_string(),
            });
        }
        None
    }

    fn extract_embedded(&self, title: &str) -> Option<DateExtraction> {
        for pattern in &self.embedded {
            let caps = match pattern.regex.captures(title) {
                Some(caps) => caps,
                None => continue,
            };
            let year: i32 = caps.get(1)?.as_str().parse().ok()?;
            if !self.window.contains(year) {
                continue;
            }
            // Only the year token leaves the title; the surrounding words
            // ("Outlook", "through") belong to the report type.
            let year_span = caps.get(1).unwrap();
            return Some(DateExtraction {
                extracted_date_range: Some(year.to_string()),
                start_year: Some(year),
                end_year: None,
                format: DateFormat::EmbeddedFormat,
                confidence: round3(base_confidence(DateFormat::EmbeddedFormat)),
                matched_pattern_id: Some(pattern.id.clone()),
                raw_match: Some(caps.get(0).unwrap().as_str().to_string()),
                cleaned_title: splice_out(title, year_span.start(), year_span.end(), None),
                preserved_words: Vec::new(),
                category: DateCategory::Extracted,
                notes: "embedded format".to_string(),
            });
        }
        None
    }

    fn extract_multiple(&self, title: &str) -> Option<DateExtraction> {
        let years: Vec<(i32, std::ops::Range<usize>)> = YEAR_TOKEN
            .captures_iter(title)
            .filter_map(|caps| {
                let m = caps.get(1)?;
                let year: i32 = m.as_str().parse().ok()?;
                self.window.contains(year).then(|| (year, m.range()))
            })
            .collect();
        if years.len() < 2 {
            return None;
        }

        let (latest, span) = years
            .iter()
            .max_by_key(|(year, _)| *year)
            .map(|(y, r)| (*y, r.clone()))?;
        let all: Vec<i32> = years.iter().map(|(y, _)| *y).collect();

        Some(DateExtraction {
            extracted_date_range: Some(latest.to_string()),
            start_year: Some(latest),
            end_year: None,
            format: DateFormat::MultipleDates,
            confidence: round3(base_confidence(DateFormat::MultipleDates)),
            matched_pattern_id: None,
            raw_match: Some(format!("years found: {all:?}")),
            cleaned_title: splice_out(title, span.start, span.end, None),
            preserved_words: Vec::new(),
            category: DateCategory::Extracted,
            notes: format!("multiple dates detected, using latest: {latest}"),
        })
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Remove `[start, end)` from the title, optionally inserting a
/// replacement, then normalize whitespace and edge punctuation.
fn splice_out(title: &str, start: usize, end: usize, replacement: Option<&str>) -> String {
    let mut result = String::with_capacity(title.len());
    result.push_str(&title[..start]);
    if let Some(text) = replacement {
        result.push(' ');
        result.push_str(text);
        result.push(' ');
    }
    result.push_str(&title[end..]);
    trim_edge_punctuation(&collapse_whitespace(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{seed, PatternStore};

    fn extractor() -> DateExtractor {
        let store = PatternStore::from_records(seed::default_records());
        DateExtractor::new(&PatternLibrary::load(&store))
    }

    // ============================================================
    // Format families
    // ============================================================

    #[test]
    fn test_range_format() {
        let result = extractor().extract("Digital Pathology Market Size Report, 2024-2030");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2030"));
        assert_eq!(result.format, DateFormat::RangeFormat);
        assert!(result.confidence >= 0.98);
        assert_eq!(result.cleaned_title, "Digital Pathology Market Size Report");
        assert_eq!(result.category, DateCategory::Extracted);
    }

    #[test]
    fn test_range_en_dash() {
        let result = extractor().extract("AI Market Report, 2024\u{2013}2030");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2030"));
    }

    #[test]
    fn test_range_abbreviated_end_year() {
        let result = extractor().extract("Smart Grid Market Analysis, 2025-32");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2025-2032"));
        assert_eq!(result.end_year, Some(2032));
    }

    #[test]
    fn test_range_to_format() {
        let result = extractor().extract("Battery Market Outlook 2024 to 2030");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2024-2030"));
    }

    #[test]
    fn test_terminal_comma() {
        let result = extractor().extract("Global AI Market Size & Share Report, 2030");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2030"));
        assert_eq!(result.format, DateFormat::TerminalComma);
        assert_eq!(result.cleaned_title, "Global AI Market Size & Share Report");
    }

    #[test]
    fn test_terminal_comma_trailing_period() {
        let result = extractor().extract("Sensor Market Report, 2029.");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2029"));
    }

    #[test]
    fn test_bracket_preserved_words() {
        let result = extractor().extract("Robotics Market [2026 Global Report]");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2026"));
        assert_eq!(result.format, DateFormat::BracketFormat);
        assert_eq!(result.preserved_words, vec!["Global", "Report"]);
        // Non-year tokens survive in the residual
        assert_eq!(result.cleaned_title, "Robotics Market Global Report");
    }

    #[test]
    fn test_bracket_year_only() {
        let result = extractor().extract("Robotics Market (2026)");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2026"));
        assert!(result.preserved_words.is_empty());
        assert_eq!(result.cleaned_title, "Robotics Market");
    }

    #[test]
    fn test_embedded_outlook() {
        let result = extractor().extract("Semiconductor Market Outlook 2031");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2031"));
        assert_eq!(result.format, DateFormat::EmbeddedFormat);
        // "Outlook" stays for the report-type stage
        assert_eq!(result.cleaned_title, "Semiconductor Market Outlook");
    }

    #[test]
    fn test_embedded_through() {
        let result = extractor().extract("EV Charging Market growth through 2032");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2032"));
    }

    #[test]
    fn test_multiple_years_picks_latest() {
        let result = extractor().extract("From 2024 2027 2030 projections overview");
        assert_eq!(result.extracted_date_range.as_deref(), Some("2030"));
        assert_eq!(result.format, DateFormat::MultipleDates);
        assert!(result.confidence <= 0.6);
    }

    // ============================================================
    // Window and edge cases
    // ============================================================

    #[test]
    fn test_out_of_window_year_rejected() {
        let result = extractor().extract("Historical Commodity Review, 2015");
        assert!(result.extracted_date_range.is_none());
        assert_eq!(result.category, DateCategory::NoDatesPresent);
    }

    #[test]
    fn test_backwards_range_rejected() {
        let result = extractor().extract("Strange Market Report, 2030-2024");
        // The structural range is invalid; the fallback may still pick a year
        assert_ne!(result.format, DateFormat::RangeFormat);
    }

    #[test]
    fn test_no_dates_present() {
        let result = extractor().extract("APAC Personal Protective Equipment Market Analysis");
        assert!(result.extracted_date_range.is_none());
        assert_eq!(result.category, DateCategory::NoDatesPresent);
        assert_eq!(
            result.cleaned_title,
            "APAC Personal Protective Equipment Market Analysis"
        );
    }

    #[test]
    fn test_custom_window() {
        let store = PatternStore::from_records(seed::default_records());
        let library = PatternLibrary::load(&store);
        let extractor = DateExtractor::with_window(&library, YearWindow { min: 2025, max: 2035 });
        let result = extractor.extract("Drone Market Report, 2024");
        assert!(result.extracted_date_range.is_none());
    }

    #[test]
    fn test_empty_title() {
        let result = extractor().extract("   ");
        assert!(result.extracted_date_range.is_none());
        assert_eq!(result.category, DateCategory::NoDatesPresent);
    }
}
