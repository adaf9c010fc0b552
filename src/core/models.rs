//! Shared data models for the extraction pipeline
//!
//! The types in this module form the vocabulary spoken between stages:
//! the market-term class, the per-title processing status, and the
//! aggregate of extracted elements every stage contributes to.

use serde::{Deserialize, Serialize};

/// Connector class of a title, assigned by the market-term classifier.
///
/// The class drives dispatch in the report-type and topic stages, so it
/// is a closed enum: adding a class forces every `match` to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTermClass {
    Standard,
    MarketFor,
    MarketIn,
    MarketBy,
    Ambiguous,
}

impl MarketTermClass {
    /// Stable string form used in result records.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketTermClass::Standard => "standard",
            MarketTermClass::MarketFor => "market_for",
            MarketTermClass::MarketIn => "market_in",
            MarketTermClass::MarketBy => "market_by",
            MarketTermClass::Ambiguous => "ambiguous",
        }
    }

    /// The connector word for connector classes ("for", "in", "by").
    pub fn connector(&self) -> Option<&'static str> {
        match self {
            MarketTermClass::MarketFor => Some("for"),
            MarketTermClass::MarketIn => Some("in"),
            MarketTermClass::MarketBy => Some("by"),
            MarketTermClass::Standard | MarketTermClass::Ambiguous => None,
        }
    }

    /// The full market-term phrase ("Market for", "Market in", "Market by").
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            MarketTermClass::MarketFor => Some("Market for"),
            MarketTermClass::MarketIn => Some("Market in"),
            MarketTermClass::MarketBy => Some("Market by"),
            MarketTermClass::Standard | MarketTermClass::Ambiguous => None,
        }
    }

    /// Whether this class routes through the market-aware workflow.
    pub fn is_connector(&self) -> bool {
        self.connector().is_some()
    }

    /// Parse the stable string form back into a class.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(MarketTermClass::Standard),
            "market_for" => Some(MarketTermClass::MarketFor),
            "market_in" => Some(MarketTermClass::MarketIn),
            "market_by" => Some(MarketTermClass::MarketBy),
            "ambiguous" => Some(MarketTermClass::Ambiguous),
            _ => None,
        }
    }
}

impl std::fmt::Display for MarketTermClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a single title's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    RequiresReview,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
            ProcessingStatus::RequiresReview => "requires_review",
        }
    }
}

/// Flags attached to a processing result for downstream triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFlag {
    LowConfidence,
    VeryLowConfidence,
    NoTopicExtracted,
    ProcessingError,
}

impl ResultFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFlag::LowConfidence => "low_confidence",
            ResultFlag::VeryLowConfidence => "very_low_confidence",
            ResultFlag::NoTopicExtracted => "no_topic_extracted",
            ResultFlag::ProcessingError => "processing_error",
        }
    }
}

/// The structured elements accumulated across stages 1-5.
///
/// Missing extractions are represented by empty fields, never by absent
/// keys, so every record serializes with the same shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedElements {
    pub market_term_type: Option<MarketTermClass>,
    pub extracted_forecast_date_range: Option<String>,
    pub extracted_report_type: Option<String>,
    #[serde(default)]
    pub extracted_regions: Vec<String>,
    pub topic: Option<String>,
    pub topic_name: Option<String>,
}

impl ExtractedElements {
    /// Number of the four optional components that are present
    /// (date, report type, regions, topic).
    pub fn components_present(&self) -> usize {
        let mut present = 0;
        if self.extracted_forecast_date_range.is_some() {
            present += 1;
        }
        if self.extracted_report_type.is_some() {
            present += 1;
        }
        if !self.extracted_regions.is_empty() {
            present += 1;
        }
        if self.topic.is_some() {
            present += 1;
        }
        present
    }
}
