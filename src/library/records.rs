//! Typed pattern records
//!
//! One document shape covers every pattern kind in the store; the
//! optional fields light up per kind (e.g. `subtype` only on report-type
//! dictionary entries, `base_type` only on acronym templates). Field
//! names match the store documents verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a pattern record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    MarketTerm,
    DatePattern,
    ReportTypePattern,
    ReportTypeDictionary,
    GeographicEntity,
    ConfusingTerm,
    AcronymEmbedded,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::MarketTerm => "market_term",
            PatternKind::DatePattern => "date_pattern",
            PatternKind::ReportTypePattern => "report_type_pattern",
            PatternKind::ReportTypeDictionary => "report_type_dictionary",
            PatternKind::GeographicEntity => "geographic_entity",
            PatternKind::ConfusingTerm => "confusing_term",
            PatternKind::AcronymEmbedded => "acronym_embedded",
        }
    }

    /// Every kind, in store order.
    pub fn all() -> [PatternKind; 7] {
        [
            PatternKind::MarketTerm,
            PatternKind::DatePattern,
            PatternKind::ReportTypePattern,
            PatternKind::ReportTypeDictionary,
            PatternKind::GeographicEntity,
            PatternKind::ConfusingTerm,
            PatternKind::AcronymEmbedded,
        ]
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.as_str() == value)
    }
}

/// Subtype of a report-type dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionarySubtype {
    PrimaryKeyword,
    SecondaryKeyword,
    Separator,
    BoundaryMarker,
}

impl DictionarySubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            DictionarySubtype::PrimaryKeyword => "primary_keyword",
            DictionarySubtype::SecondaryKeyword => "secondary_keyword",
            DictionarySubtype::Separator => "separator",
            DictionarySubtype::BoundaryMarker => "boundary_marker",
        }
    }
}

/// A single pattern document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "type")]
    pub kind: PatternKind,

    /// Dictionary entries only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<DictionarySubtype>,

    /// Human-readable term (the primary term for geographic entities)
    pub term: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Regex source; literal kinds (dictionary entries) leave it empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Lower = earlier
    #[serde(default = "default_priority")]
    pub priority: u32,

    #[serde(default = "default_active")]
    pub active: bool,

    /// Format-type subclass (date patterns, report-type patterns)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_type: Option<String>,

    /// Base report-type phrase (acronym templates only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_weight: Option<f64>,

    /// Canonical form for misspelled dictionary terms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_form: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,

    #[serde(default)]
    pub success_count: u64,

    #[serde(default)]
    pub failure_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_priority() -> u32 {
    999
}

fn default_active() -> bool {
    true
}

impl PatternRecord {
    /// A minimal record with everything optional left empty.
    pub fn new(id: impl Into<String>, kind: PatternKind, term: impl Into<String>) -> Self {
        PatternRecord {
            id: id.into(),
            kind,
            subtype: None,
            term: term.into(),
            aliases: Vec::new(),
            pattern: None,
            priority: default_priority(),
            active: true,
            format_type: None,
            base_type: None,
            confidence_weight: None,
            normalized_form: None,
            frequency: None,
            percentage: None,
            success_count: 0,
            failure_count: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_subtype(mut self, subtype: DictionarySubtype) -> Self {
        self.subtype = Some(subtype);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_format_type(mut self, format_type: impl Into<String>) -> Self {
        self.format_type = Some(format_type.into());
        self
    }

    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    pub fn with_normalized_form(mut self, form: impl Into<String>) -> Self {
        self.normalized_form = Some(form.into());
        self
    }

    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.percentage = Some(percentage);
        self
    }
}
