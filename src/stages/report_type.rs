//! Stage 3: Report-type extractor
//!
//! A dictionary-driven combinatorial detector anchored at the boundary
//! keyword "Market". Instead of one regex per attested phrasing, the
//! stage locates dictionary keywords in the working string, detects the
//! separators between them, and reconstructs the canonical report type
//! from the ordered hits. Titles classified `market_for` / `market_in` /
//! `market_by` run a dedicated extract -> rearrange -> match ->
//! reconstruct workflow that also produces the pipeline-forward text
//! for the downstream stages.
//!
//! # Architecture
//!
//! - keyword detection: word-bounded or bracket-wrapped hits, first
//!   occurrence per keyword, ordered by position
//! - separator detection: scan the slices between adjacent keyword
//!   spans; the recorded list is ordered by in-title frequency, and
//!   reconstruction renders each adjacent pair with the separator that
//!   actually sits between them ("&", "and", ",", or a space)
//! - acronym templates: library regexes with one capture group; a hit
//!   records the acronym, base type, and template id, and marks the
//!   output format `acronym_embedded`
//! - market-aware workflow: market-term span extraction with the
//!   "Market" literal fallback

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::models::MarketTermClass;
use crate::library::{compile_insensitive, DictionarySubtype, PatternKind, PatternLibrary};
use crate::util::text::collapse_whitespace;

/// Words that stay lowercase during reconstruction title-casing.
const CONNECTIVES: [&str; 9] = ["and", "or", "of", "in", "on", "at", "by", "for", "&"];

/// Report-indicator words that terminate a market-term entity span.
const REPORT_INDICATORS: [&str; 10] = [
    "analysis", "report", "study", "forecast", "outlook", "trends", "size", "share", "growth",
    "industry",
];

/// Standard-workflow reconstruction only fires above this detection
/// confidence; the market-aware workflow reconstructs from any hit.
const RECONSTRUCTION_FLOOR: f64 = 0.2;

/// Format classification of an extracted report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTypeFormat {
    Compound,
    Terminal,
    Embedded,
    Prefix,
    AcronymEmbedded,
}

/// One keyword occurrence in the working string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordHit {
    pub keyword: String,
    pub start: usize,
    pub end: usize,
    /// Index of the containing word in the whitespace-split title
    pub word_pos: usize,
    /// Hit sits inside `[...]` or `(...)`
    pub wrapped: bool,
    /// Outer wrapper span when wrapped
    pub wrapper_span: Option<(usize, usize)>,
}

/// Result of dictionary keyword detection over one string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryDetection {
    pub keywords_found: Vec<String>,
    /// (keyword, word position), ordered by position
    pub sequence: Vec<(String, usize)>,
    /// Separators between adjacent keywords, by descending in-title frequency
    pub separators: Vec<String>,
    pub boundary_markers: Vec<String>,
    pub market_boundary: bool,
    /// Index of "Market" within `sequence`
    pub market_boundary_index: Option<usize>,
    pub confidence: f64,
    #[serde(skip)]
    pub hits: Vec<KeywordHit>,
}

/// Public result of report-type extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTypeExtraction {
    pub extracted_report_type: Option<String>,
    pub confidence: f64,
    pub format: ReportTypeFormat,
    pub keywords: Vec<String>,
    pub extracted_acronym: Option<String>,
    pub acronym_base_type: Option<String>,
    pub acronym_template_id: Option<String>,
    /// Full market-term span for connector titles ("Market in Automotive")
    pub market_term: Option<String>,
    /// The string handed to stage 4
    pub pipeline_forward: String,
    pub notes: Vec<String>,
}

impl ReportTypeExtraction {
    fn empty(working: &str) -> Self {
        ReportTypeExtraction {
            extracted_report_type: None,
            confidence: 0.0,
            format: ReportTypeFormat::Compound,
            keywords: Vec::new(),
            extracted_acronym: None,
            acronym_base_type: None,
            acronym_template_id: None,
            market_term: None,
            pipeline_forward: working.to_string(),
            notes: vec!["no report type detected".to_string()],
        }
    }
}

struct Keyword {
    term: String,
    regex: Regex,
}

struct AcronymTemplate {
    id: String,
    regex: Regex,
    base_type: String,
    priority: u32,
}

/// Dictionary-based report-type extractor.
pub struct ReportTypeExtractor {
    market_keyword: String,
    keywords: Vec<Keyword>,
    separators: Vec<String>,
    boundary_markers: Vec<String>,
    acronym_templates: Vec<AcronymTemplate>,
    /// Lowercased entity-terminating words (canonical + attested misspellings)
    entity_boundaries: Vec<String>,
    connector_regexes: Vec<(MarketTermClass, Regex)>,
}

impl ReportTypeExtractor {
    /// Build the extractor from the library's dictionary and templates.
    pub fn new(library: &PatternLibrary) -> Self {
        let market_keyword = library
            .dictionary(DictionarySubtype::PrimaryKeyword)
            .first()
            .map(|p| p.term().to_string())
            .unwrap_or_else(|| "Market".to_string());

        let mut keywords = Vec::new();
        for entry in library
            .dictionary(DictionarySubtype::PrimaryKeyword)
            .into_iter()
            .chain(library.dictionary(DictionarySubtype::SecondaryKeyword))
        {
            let source = format!(r"\b{}\b", regex::escape(entry.term()));
            if let Ok(regex) = compile_insensitive(&source) {
                keywords.push(Keyword {
                    term: entry.term().to_string(),
                    regex,
                });
            }
        }

        let separators: Vec<String> = library
            .dictionary(DictionarySubtype::Separator)
            .iter()
            .map(|p| p.term().to_string())
            .collect();
        let boundary_markers: Vec<String> = library
            .dictionary(DictionarySubtype::BoundaryMarker)
            .iter()
            .map(|p| p.term().to_string())
            .collect();

        let acronym_templates = library
            .patterns(PatternKind::AcronymEmbedded)
            .iter()
            .filter_map(|p| {
                Some(AcronymTemplate {
                    id: p.record.id.clone(),
                    regex: p.regex.clone()?,
                    base_type: p.record.base_type.clone()?,
                    priority: p.record.priority,
                })
            })
            .collect();

        // Entity spans stop before the canonical indicators plus any
        // dictionary misspelling that normalizes to one of them.
        let mut entity_boundaries: Vec<String> =
            REPORT_INDICATORS.iter().map(|s| s.to_string()).collect();
        for entry in library.dictionary(DictionarySubtype::SecondaryKeyword) {
            if let Some(canonical) = entry.record.normalized_form.as_deref() {
                if REPORT_INDICATORS.contains(&canonical.to_lowercase().as_str()) {
                    entity_boundaries.push(entry.term().to_lowercase());
                }
            }
        }

        let connector_regexes = [
            MarketTermClass::MarketFor,
            MarketTermClass::MarketIn,
            MarketTermClass::MarketBy,
        ]
        .into_iter()
        .filter_map(|class| {
            let connector = class.connector()?;
            let source = format!(
                r"\b{}\s+{}\b",
                regex::escape(&market_keyword),
                regex::escape(connector)
            );
            Some((class, compile_insensitive(&source).ok()?))
        })
        .collect();

        ReportTypeExtractor {
            market_keyword,
            keywords,
            separators,
            boundary_markers,
            acronym_templates,
            entity_boundaries,
            connector_regexes,
        }
    }

    /// Main entry point.
    ///
    /// `working` is the date-cleaned title; `class` comes from stage 1.
    /// Non-fatal by construction: when nothing is detected the result
    /// carries no report type and the unchanged working string.
    pub fn extract(&self, working: &str, class: MarketTermClass) -> ReportTypeExtraction {
        if working.trim().is_empty() {
            return ReportTypeExtraction::empty(working);
        }
        match class {
            MarketTermClass::MarketFor | MarketTermClass::MarketIn | MarketTermClass::MarketBy => {
                self.extract_market_aware(working, class)
            }
            MarketTermClass::Standard | MarketTermClass::Ambiguous => {
                self.extract_standard(working)
            }
        }
    }

    // ------------------------------------------------------------------
    // Keyword detection
    // ------------------------------------------------------------------

    /// Locate every dictionary keyword in `text` and derive the ordered
    /// sequence, separators, and detection confidence.
    pub fn detect_keywords(&self, text: &str) -> DictionaryDetection {
        let wrappers = bracket_spans(text);

        let mut hits: Vec<KeywordHit> = Vec::new();
        for keyword in &self.keywords {
            if let Some(m) = keyword.regex.find(text) {
                let wrapper = wrappers
                    .iter()
                    .find(|(s, e)| m.start() >= *s && m.end() <= *e)
                    .copied();
                hits.push(KeywordHit {
                    keyword: keyword.term.clone(),
                    start: m.start(),
                    end: m.end(),
                    word_pos: text[..m.start()].split_whitespace().count(),
                    wrapped: wrapper.is_some(),
                    wrapper_span: wrapper,
                });
            }
        }
        hits.sort_by_key(|h| h.start);

        let keywords_found: Vec<String> = hits.iter().map(|h| h.keyword.clone()).collect();
        let sequence: Vec<(String, usize)> = hits
            .iter()
            .map(|h| (h.keyword.clone(), h.word_pos))
            .collect();

        let market_boundary_index = sequence
            .iter()
            .position(|(keyword, _)| keyword == &self.market_keyword);
        let market_boundary = market_boundary_index.is_some();

        let (separators, boundary_markers) = self.detect_separators(text, &hits);

        let mut confidence = 0.0;
        if market_boundary {
            confidence += 0.40;
        }
        confidence += (keywords_found.len() as f64 * 0.10).min(0.50);
        if !separators.is_empty() {
            confidence += 0.10;
        }

        debug!(
            keywords = keywords_found.len(),
            separators = separators.len(),
            confidence,
            "dictionary detection"
        );

        DictionaryDetection {
            keywords_found,
            sequence,
            separators,
            boundary_markers,
            market_boundary,
            market_boundary_index,
            confidence: round3(confidence),
            hits,
        }
    }

    /// Scan the slices between adjacent keyword spans for separators and
    /// boundary markers; order separators by descending frequency in the
    /// full text, breaking ties by library priority.
    fn detect_separators(&self, text: &str, hits: &[KeywordHit]) -> (Vec<String>, Vec<String>) {
        let mut separators: Vec<String> = Vec::new();
        let mut markers: Vec<String> = Vec::new();

        let mut note_separators = |slice: &str, separators: &mut Vec<String>| {
            for separator in &self.separators {
                if separator_present(slice, separator) && !separators.contains(separator) {
                    separators.push(separator.clone());
                }
            }
        };

        if hits.len() < 2 {
            // Single keyword: look anywhere in the text
            note_separators(text, &mut separators);
        } else {
            for pair in hits.windows(2) {
                if pair[0].end >= pair[1].start {
                    continue;
                }
                let between = &text[pair[0].end..pair[1].start];
                note_separators(between, &mut separators);
                for marker in &self.boundary_markers {
                    if between.contains(marker.as_str()) && !markers.contains(marker) {
                        markers.push(marker.clone());
                    }
                }
            }
        }

        let priority_of = |sep: &str| {
            self.separators
                .iter()
                .position(|s| s == sep)
                .unwrap_or(usize::MAX)
        };
        separators.sort_by(|a, b| {
            separator_count(text, b)
                .cmp(&separator_count(text, a))
                .then(priority_of(a).cmp(&priority_of(b)))
        });

        (separators, markers)
    }

    // ------------------------------------------------------------------
    // Acronym-embedded templates
    // ------------------------------------------------------------------

    /// Try the acronym templates; earlier priority wins, longer match
    /// span breaks ties.
    fn detect_acronym<'t>(&self, text: &'t str) -> Option<(&AcronymTemplate, regex::Captures<'t>)> {
        let mut best: Option<(&AcronymTemplate, regex::Captures<'t>, usize)> = None;
        for template in &self.acronym_templates {
            let caps = match template.regex.captures(text) {
                Some(caps) => caps,
                None => continue,
            };
            let span = caps.get(0).map(|m| m.len()).unwrap_or(0);
            let replace = match &best {
                None => true,
                Some((current, _, current_span)) => {
                    template.priority < current.priority
                        || (template.priority == current.priority && span > *current_span)
                }
            };
            if replace {
                best = Some((template, caps, span));
            }
        }
        best.map(|(template, caps, _)| (template, caps))
    }

    // ------------------------------------------------------------------
    // Reconstruction
    // ------------------------------------------------------------------

    /// Reconstruct the report type from an ordered run of hits: each
    /// adjacent pair is rendered with the separator that actually sits
    /// between the two keywords in the source text.
    fn reconstruct_from_hits(&self, text: &str, hits: &[&KeywordHit]) -> Option<String> {
        let first = hits.first()?;
        let mut out = first.keyword.clone();
        for pair in hits.windows(2) {
            let between = if pair[0].end < pair[1].start {
                &text[pair[0].end..pair[1].start]
            } else {
                ""
            };
            out.push_str(pair_rendering(between));
            out.push_str(&pair[1].keyword);
        }
        Some(clean_reconstructed(&out))
    }

    /// Hits used for an anchored (Market-boundary) reconstruction: the
    /// Market hit plus every later keyword.
    fn anchored_hits<'a>(&self, detection: &'a DictionaryDetection) -> Vec<&'a KeywordHit> {
        let boundary = match detection.market_boundary_index {
            Some(index) => index,
            None => return detection.hits.iter().collect(),
        };
        detection
            .hits
            .iter()
            .enumerate()
            .filter(|(index, hit)| {
                *index == boundary || (*index > boundary && hit.keyword != self.market_keyword)
            })
            .map(|(_, hit)| hit)
            .collect()
    }

    // ------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------

    fn extract_standard(&self, working: &str) -> ReportTypeExtraction {
        let detection = self.detect_keywords(working);
        if detection.confidence <= RECONSTRUCTION_FLOOR {
            return ReportTypeExtraction::empty(working);
        }

        let hits = self.anchored_hits(&detection);
        let reconstructed = match self.reconstruct_from_hits(working, &hits) {
            Some(text) => text,
            None => return ReportTypeExtraction::empty(working),
        };

        // Acronym templates: a hit records the acronym and marks the
        // format; the removal span widens to cover the template.
        let acronym_hit = self.detect_acronym(working);
        let (acronym, base_type, template_id, template_span) = match &acronym_hit {
            Some((template, caps)) => (
                caps.get(1).map(|m| m.as_str().to_string()),
                Some(template.base_type.clone()),
                Some(template.id.clone()),
                caps.get(0).map(|m| (m.start(), m.end())),
            ),
            None => (None, None, None, None),
        };

        let remaining = self.remove_keyword_span(working, &detection.hits, template_span);
        let format = if acronym.is_some() {
            ReportTypeFormat::AcronymEmbedded
        } else {
            classify_format(&detection, working)
        };
        let confidence = if acronym.is_some() {
            round3((detection.confidence + 0.1).min(1.0))
        } else {
            detection.confidence
        };

        let mut notes = vec![format!(
            "reconstructed '{}' from {} keywords",
            reconstructed,
            detection.keywords_found.len()
        )];
        if let (Some(acr), Some(base)) = (&acronym, &base_type) {
            notes.push(format!("embedded acronym '{acr}' (base type '{base}')"));
        }

        ReportTypeExtraction {
            extracted_report_type: Some(reconstructed),
            confidence,
            format,
            keywords: detection.keywords_found.clone(),
            extracted_acronym: acronym,
            acronym_base_type: base_type,
            acronym_template_id: template_id,
            market_term: None,
            pipeline_forward: remaining,
            notes,
        }
    }

    fn extract_market_aware(&self, working: &str, class: MarketTermClass) -> ReportTypeExtraction {
        let extraction = self.extract_market_term(working, class);

        let (market_term, remaining, pipeline_forward) = match extraction {
            Some(parts) => parts,
            None => {
                // Could not carve out the market term: fall back to the
                // standard dictionary pass; connector titles still always
                // yield at least the literal "Market".
                let standard = self.extract_standard(working);
                if standard.extracted_report_type.is_some() {
                    return ReportTypeExtraction {
                        market_term: None,
                        pipeline_forward: working.to_string(),
                        ..standard
                    };
                }
                return ReportTypeExtraction {
                    extracted_report_type: Some(self.market_keyword.clone()),
                    confidence: 0.9,
                    format: ReportTypeFormat::Terminal,
                    keywords: Vec::new(),
                    extracted_acronym: None,
                    acronym_base_type: None,
                    acronym_template_id: None,
                    market_term: None,
                    pipeline_forward: working.to_string(),
                    notes: vec!["connector fallback to literal Market".to_string()],
                };
            }
        };

        // Search the remaining title; the Market boundary is not required
        // here, and any keyword hit is enough to reconstruct.
        let detection = self.detect_keywords(&remaining);
        let all_hits: Vec<&KeywordHit> = detection.hits.iter().collect();
        let reconstruction = self.reconstruct_from_hits(&remaining, &all_hits);

        match reconstruction {
            Some(rec) => {
                let final_type = if rec.to_lowercase().contains("market") {
                    rec
                } else {
                    format!("{} {}", self.market_keyword, rec)
                };
                ReportTypeExtraction {
                    extracted_report_type: Some(final_type.clone()),
                    confidence: detection.confidence,
                    format: ReportTypeFormat::Prefix,
                    keywords: detection.keywords_found.clone(),
                    extracted_acronym: None,
                    acronym_base_type: None,
                    acronym_template_id: None,
                    market_term: Some(market_term),
                    pipeline_forward,
                    notes: vec![format!("market-aware reconstruction '{final_type}'")],
                }
            }
            None => ReportTypeExtraction {
                extracted_report_type: Some(self.market_keyword.clone()),
                confidence: 0.9,
                format: ReportTypeFormat::Terminal,
                keywords: detection.keywords_found.clone(),
                extracted_acronym: None,
                acronym_base_type: None,
                acronym_template_id: None,
                market_term: Some(market_term),
                pipeline_forward,
                notes: vec!["no keywords after market term, using literal Market".to_string()],
            },
        }
    }

    /// Carve the "Market <connector> <entity>" span out of the title.
    ///
    /// Returns (full market-term text, remaining title, pipeline-forward
    /// text), or `None` when the connector phrase or entity is absent.
    fn extract_market_term(
        &self,
        title: &str,
        class: MarketTermClass,
    ) -> Option<(String, String, String)> {
        let connector = class.connector()?;
        let regex = self
            .connector_regexes
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, r)| r)?;
        let connector_match = regex.find(title)?;

        // Entity region: up to the next comma or end of title
        let region_start = connector_match.end();
        let region_full = &title[region_start..];
        let comma_offset = region_full.find(',').unwrap_or(region_full.len());
        let region = &region_full[..comma_offset];

        // Stop before the first report-indicator word
        let mut entity_end_rel = region.len();
        for (offset, word) in word_offsets(region) {
            let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric());
            if self
                .entity_boundaries
                .iter()
                .any(|b| b == &cleaned.to_lowercase())
            {
                entity_end_rel = offset;
                break;
            }
        }
        let entity = region[..entity_end_rel].trim();
        if entity.is_empty() {
            return None;
        }

        let entity_end_abs = region_start + entity_end_rel;
        let market_term = collapse_whitespace(&title[connector_match.start()..entity_end_abs]);
        let prefix = title[..connector_match.start()].trim();
        let after = title[entity_end_abs..].trim_start_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | '-' | '\u{2013}' | '\u{2014}')
        });

        let mut remaining_parts = Vec::new();
        if !prefix.is_empty() {
            remaining_parts.push(prefix);
        }
        if !after.is_empty() {
            remaining_parts.push(after);
        }
        let remaining = remaining_parts.join(" ");
        let remaining = remaining
            .trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, ',' | '-' | '\u{2013}' | '\u{2014}')
            })
            .to_string();

        let pipeline_forward = if prefix.is_empty() {
            entity.to_string()
        } else {
            format!("{prefix} {connector} {entity}")
        };

        debug!(
            market_term = %market_term,
            remaining = %remaining,
            pipeline_forward = %pipeline_forward,
            "market term extracted"
        );

        Some((market_term, remaining, pipeline_forward))
    }

    /// Remove the span from the first to the last keyword hit (widened
    /// over an acronym template hit) and clean the edges; this becomes
    /// the stage-4 input for standard titles.
    fn remove_keyword_span(
        &self,
        working: &str,
        hits: &[KeywordHit],
        template_span: Option<(usize, usize)>,
    ) -> String {
        let (mut start, mut end) = match (hits.first(), hits.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => match template_span {
                Some(span) => span,
                None => return working.to_string(),
            },
        };
        if let Some((t_start, t_end)) = template_span {
            start = start.min(t_start);
            end = end.max(t_end);
        }
        splice_span(working, start, end)
    }
}

// ----------------------------------------------------------------------
// Free helpers
// ----------------------------------------------------------------------

/// Spans of `[...]` and `(...)` groups in the text.
fn bracket_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    for (open, close) in [('[', ']'), ('(', ')')] {
        let mut search_from = 0;
        while let Some(rel_open) = text[search_from..].find(open) {
            let abs_open = search_from + rel_open;
            match text[abs_open..].find(close) {
                Some(rel_close) => {
                    let abs_close = abs_open + rel_close + close.len_utf8();
                    spans.push((abs_open, abs_close));
                    search_from = abs_close;
                }
                None => break,
            }
        }
    }
    spans
}

/// Rendering for the text between two adjacent keywords.
fn pair_rendering(between: &str) -> &'static str {
    if between.contains('&') {
        " & "
    } else if separator_present(between, "and") {
        " and "
    } else if between.contains(',') {
        ", "
    } else {
        " "
    }
}

/// Word-bounded presence check for alphabetic separators; plain
/// containment for punctuation.
fn separator_present(text: &str, separator: &str) -> bool {
    if separator.chars().all(|c| c.is_alphabetic()) {
        text.split(|c: char| !c.is_alphanumeric())
            .any(|word| word.eq_ignore_ascii_case(separator))
    } else {
        text.contains(separator)
    }
}

fn separator_count(text: &str, separator: &str) -> usize {
    if separator.chars().all(|c| c.is_alphabetic()) {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.eq_ignore_ascii_case(separator))
            .count()
    } else {
        text.matches(separator).count()
    }
}

/// Collapse whitespace, drop immediately repeated keywords, and apply
/// connective-aware title casing; the first word is always capitalized.
fn clean_reconstructed(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let mut words: Vec<String> = Vec::new();
    for word in collapsed.split_whitespace() {
        if let Some(previous) = words.last() {
            if previous.eq_ignore_ascii_case(word) {
                continue;
            }
        }
        words.push(word.to_string());
    }

    let cased: Vec<String> = words
        .iter()
        .enumerate()
        .map(|(index, word)| {
            if index > 0 && CONNECTIVES.contains(&word.to_lowercase().as_str()) {
                word.to_lowercase()
            } else {
                capitalize_first(word)
            }
        })
        .collect();

    cased.join(" ")
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Coarse format classification for a standard-workflow extraction.
fn classify_format(detection: &DictionaryDetection, text: &str) -> ReportTypeFormat {
    if detection.hits.iter().any(|h| h.wrapped) {
        return ReportTypeFormat::Embedded;
    }
    if detection.hits.len() == 1 {
        let only = &detection.hits[0];
        if text[only.end..].trim().is_empty() {
            return ReportTypeFormat::Terminal;
        }
    }
    ReportTypeFormat::Compound
}

/// Byte offsets of whitespace-separated words within `text`.
fn word_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut offset = 0;
    for word in text.split_whitespace() {
        if let Some(rel) = text[offset..].find(word) {
            let abs = offset + rel;
            words.push((abs, word));
            offset = abs + word.len();
        }
    }
    words
}

/// Remove `[start, end)` and normalize the edges.
fn splice_span(text: &str, start: usize, end: usize) -> String {
    let mut result = String::with_capacity(text.len());
    result.push_str(&text[..start]);
    result.push(' ');
    result.push_str(&text[end..]);
    let collapsed = collapse_whitespace(&result);
    collapsed
        .trim_matches(|c: char| {
            c.is_whitespace()
                || matches!(c, ',' | '&' | '-' | '\u{2013}' | '\u{2014}' | '|' | ';' | ':')
        })
        .to_string()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
