//! The extraction stages
//!
//! A title flows through stages 1-5 in order; each stage extracts a
//! structured value and hands a progressively cleaner working string
//! forward. Stage 6 aggregates the five stage results.
//!
//! # Architecture
//!
//! - `classifier`: stage 1, market-term classification
//! - `dates`: stage 2, forecast date extraction
//! - `report_type`: stage 3, dictionary-based report-type extraction
//! - `geography`: stage 4, geographic entity detection
//! - `topic`: stage 5, topic residualization
//! - `confidence`: stage 6, confidence aggregation and telemetry

pub mod classifier;
pub mod confidence;
pub mod dates;
pub mod geography;
pub mod report_type;
pub mod topic;

pub use classifier::{ClassificationResult, MarketTermClassifier};
pub use confidence::{
    ComponentScores, ConfidenceAnalysis, ConfidenceLevel, ConfidenceTracker, ConfusionPattern,
    DistributionReport, ExtractionSummary, PerformanceMetrics, ReviewFlag, StageRecommendation,
    TrendDirection,
};
pub use dates::{DateCategory, DateExtraction, DateExtractor, DateFormat, YearWindow};
pub use geography::{GeographicDetector, GeographicExtraction};
pub use report_type::{
    DictionaryDetection, KeywordHit, ReportTypeExtraction, ReportTypeExtractor, ReportTypeFormat,
};
pub use topic::{TopicExtraction, TopicExtractor, TopicWorkflow};
