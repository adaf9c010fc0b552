//! Stage 1: Market-term classifier
//!
//! Assigns every title one of the closed connector classes. The
//! connector patterns ("Market for", "Market in", "Market by") come from
//! the library; the classifier never rewrites the title.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::models::MarketTermClass;
use crate::library::{PatternKind, PatternLibrary};

lazy_static! {
    static ref MARKET_KEYWORD: Regex = Regex::new(r"(?i)\bmarkets?\b").unwrap();
}

/// Confidence assigned when a single connector pattern matched.
const CONNECTOR_CONFIDENCE: f64 = 0.95;
/// Confidence for a plain "Market" title with no connector.
const STANDARD_CONFIDENCE: f64 = 0.90;
/// Confidence when two or more distinct connectors matched.
const AMBIGUOUS_CONFIDENCE: f64 = 0.50;
/// Confidence when the title carries no market keyword at all.
const NO_MARKET_CONFIDENCE: f64 = 0.70;

/// Result of market-term classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub class: MarketTermClass,
    pub confidence: f64,
    /// The matched connector text as it appeared in the title
    pub matched_term: Option<String>,
    pub pattern_id: Option<String>,
    pub notes: String,
}

struct ClassPattern {
    class: MarketTermClass,
    regex: Regex,
    id: String,
}

/// Market-term classifier over the library's connector patterns.
pub struct MarketTermClassifier {
    patterns: Vec<ClassPattern>,
}

impl MarketTermClassifier {
    /// Build the classifier from the library's market-term patterns.
    pub fn new(library: &PatternLibrary) -> Self {
        let patterns = library
            .patterns(PatternKind::MarketTerm)
            .iter()
            .filter_map(|p| {
                let class = p
                    .record
                    .normalized_form
                    .as_deref()
                    .and_then(MarketTermClass::parse)?;
                let regex = p.regex.clone()?;
                Some(ClassPattern {
                    class,
                    regex,
                    id: p.record.id.clone(),
                })
            })
            .collect();

        MarketTermClassifier { patterns }
    }

    /// Classify a title. Does not rewrite it.
    pub fn classify(&self, title: &str) -> ClassificationResult {
        let mut hits: Vec<(&ClassPattern, String)> = Vec::new();
        for pattern in &self.patterns {
            if let Some(m) = pattern.regex.find(title) {
                hits.push((pattern, m.as_str().to_string()));
            }
        }

        let distinct_classes: std::collections::HashSet<MarketTermClass> =
            hits.iter().map(|(p, _)| p.class).collect();

        if distinct_classes.len() > 1 {
            return ClassificationResult {
                class: MarketTermClass::Ambiguous,
                confidence: AMBIGUOUS_CONFIDENCE,
                matched_term: hits.first().map(|(_, text)| text.clone()),
                pattern_id: None,
                notes: format!("{} distinct connector patterns matched", distinct_classes.len()),
            };
        }

        if let Some((pattern, text)) = hits.into_iter().next() {
            return ClassificationResult {
                class: pattern.class,
                confidence: CONNECTOR_CONFIDENCE,
                matched_term: Some(text),
                pattern_id: Some(pattern.id.clone()),
                notes: format!("connector pattern '{}' matched", pattern.class),
            };
        }

        if let Some(m) = MARKET_KEYWORD.find(title) {
            return ClassificationResult {
                class: MarketTermClass::Standard,
                confidence: STANDARD_CONFIDENCE,
                matched_term: Some(m.as_str().to_string()),
                pattern_id: None,
                notes: "market keyword without connector".to_string(),
            };
        }

        ClassificationResult {
            class: MarketTermClass::Standard,
            confidence: NO_MARKET_CONFIDENCE,
            matched_term: None,
            pattern_id: None,
            notes: "no market keyword present".to_string(),
        }
    }
}
