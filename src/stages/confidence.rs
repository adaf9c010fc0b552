//! Stage 6: Confidence tracker
//!
//! Aggregates the five stage confidences into an overall score, applies
//! completeness and quality adjustments, gates human review, and keeps
//! running telemetry: confusion patterns for low-confidence stages,
//! per-stage success rates, a trend estimator, and a histogram suitable
//! for the distribution report.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::models::{ExtractedElements, MarketTermClass};

lazy_static! {
    static ref YEAR_IN_TOPIC: Regex = Regex::new(r"\b20\d{2}\b").unwrap();
    static ref UPPER_TOKEN: Regex = Regex::new(r"\b[A-Z0-9]{2,}\b").unwrap();
    static ref NORMALIZED_NAME: Regex = Regex::new(r"^[a-z0-9-]+$").unwrap();
}

/// Fixed component weights for the weighted average.
const WEIGHT_MARKET: f64 = 0.15;
const WEIGHT_DATE: f64 = 0.20;
const WEIGHT_REPORT: f64 = 0.15;
const WEIGHT_REGIONS: f64 = 0.25;
const WEIGHT_TOPIC: f64 = 0.25;

/// Completeness penalties for missing extractions.
const PENALTY_DATE_MISSING: f64 = -0.10;
const PENALTY_REPORT_MISSING: f64 = -0.05;
const PENALTY_REGIONS_MISSING: f64 = -0.15;
const PENALTY_TOPIC_MISSING: f64 = -0.30;

/// Quality adjustments.
const BONUS_TECHNICAL_COMPOUND: f64 = 0.05;
const BONUS_NORMALIZED_NAME: f64 = 0.03;
const PENALTY_STAGE_ERROR: f64 = -0.15;
const PENALTY_PATTERN_CONFLICT: f64 = -0.10;

/// A stage's confidence below this threshold records a confusion pattern.
const CONFUSION_THRESHOLD: f64 = 0.7;

/// Confidence level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Good,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            ConfidenceLevel::High
        } else if score >= 0.8 {
            ConfidenceLevel::Good
        } else if score >= 0.6 {
            ConfidenceLevel::Medium
        } else if score >= 0.4 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Good => "good",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::VeryLow => "very_low",
        }
    }
}

/// Human review gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFlag {
    NoReview,
    StandardReview,
    PriorityReview,
    CriticalReview,
}

impl ReviewFlag {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ReviewFlag::NoReview
        } else if score >= 0.6 {
            ReviewFlag::StandardReview
        } else if score >= 0.4 {
            ReviewFlag::PriorityReview
        } else {
            ReviewFlag::CriticalReview
        }
    }

    pub fn needs_review(&self) -> bool {
        !matches!(self, ReviewFlag::NoReview)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewFlag::NoReview => "no_review",
            ReviewFlag::StandardReview => "standard_review",
            ReviewFlag::PriorityReview => "priority_review",
            ReviewFlag::CriticalReview => "critical_review",
        }
    }
}

/// Per-stage confidence scores feeding the aggregate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub market_classification: f64,
    pub date_extraction: f64,
    pub report_extraction: f64,
    pub geographic_detection: f64,
    pub topic_extraction: f64,
}

impl ComponentScores {
    fn pairs(&self) -> [(&'static str, f64, f64); 5] {
        [
            ("market_classification", self.market_classification, WEIGHT_MARKET),
            ("date_extraction", self.date_extraction, WEIGHT_DATE),
            ("report_extraction", self.report_extraction, WEIGHT_REPORT),
            ("geographic_detection", self.geographic_detection, WEIGHT_REGIONS),
            ("topic_extraction", self.topic_extraction, WEIGHT_TOPIC),
        ]
    }

    pub fn max(&self) -> f64 {
        self.pairs()
            .iter()
            .map(|(_, score, _)| *score)
            .fold(0.0, f64::max)
    }
}

/// Everything stage 6 needs to score one title.
#[derive(Debug, Clone)]
pub struct ExtractionSummary {
    pub title: String,
    pub elements: ExtractedElements,
    pub scores: ComponentScores,
    pub technical_compounds: Vec<String>,
    pub errors: Vec<String>,
    pub processing_time_ms: f64,
}

/// A confusion-pattern diagnostic for a low-confidence stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionPattern {
    pub stage: String,
    pub actual_result: Option<String>,
    pub title: String,
    pub diagnostic: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Complete confidence analysis for one title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceAnalysis {
    pub overall: f64,
    pub level: ConfidenceLevel,
    pub review_flag: ReviewFlag,
    pub component_scores: ComponentScores,
    /// Fraction of the four optional components present
    pub completeness: f64,
    pub completeness_adjustment: f64,
    pub quality_adjustment: f64,
    pub confusion: Vec<String>,
    pub recommendation: String,
    pub timestamp: DateTime<Utc>,
}

/// Trend direction over the recent confidence history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

/// Running performance metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_processed: usize,
    pub high_count: usize,
    pub good_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub very_low_count: usize,
    pub flagged_for_review: usize,
    pub average_confidence: f64,
    /// Fraction of titles where the stage scored >= 0.8
    pub stage_success_rates: std::collections::BTreeMap<String, f64>,
    pub mean_processing_time_ms: f64,
    pub trend: TrendDirection,
}

/// Histogram over the fixed confidence bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub total_samples: usize,
    pub average: f64,
    pub bins: Vec<String>,
    pub counts: Vec<usize>,
}

/// A recommendation derived from a weak stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecommendation {
    pub stage: String,
    pub success_rate: f64,
    pub suggestion: String,
}

/// Confidence tracker; accumulates telemetry across a batch.
#[derive(Debug, Default)]
pub struct ConfidenceTracker {
    history: Vec<f64>,
    stage_scores: std::collections::BTreeMap<String, Vec<f64>>,
    processing_times: Vec<f64>,
    flagged: usize,
    confusion_patterns: Vec<ConfusionPattern>,
}

impl ConfidenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one title and fold it into the running telemetry.
    pub fn analyze(&mut self, summary: &ExtractionSummary) -> ConfidenceAnalysis {
        let weighted = weighted_average(&summary.scores);
        let completeness = summary.elements.components_present() as f64 * 0.25;
        let completeness_adjustment = completeness_adjustment(&summary.elements);
        let quality_adjustment = self.quality_adjustment(summary);

        let overall =
            (weighted + completeness_adjustment + quality_adjustment).clamp(0.0, 1.0);
        let overall = round3(overall);

        let level = ConfidenceLevel::from_score(overall);
        let review_flag = ReviewFlag::from_score(overall);
        let confusion = self.track_confusion(summary);
        let recommendation = recommendation_text(overall, review_flag);

        // Fold into running metrics
        self.history.push(overall);
        for (stage, score, _) in summary.scores.pairs() {
            self.stage_scores
                .entry(stage.to_string())
                .or_default()
                .push(score);
        }
        if summary.processing_time_ms > 0.0 {
            self.processing_times.push(summary.processing_time_ms);
        }
        if review_flag.needs_review() {
            self.flagged += 1;
        }

        ConfidenceAnalysis {
            overall,
            level,
            review_flag,
            component_scores: summary.scores,
            completeness,
            completeness_adjustment: round3(completeness_adjustment),
            quality_adjustment: round3(quality_adjustment),
            confusion,
            recommendation,
            timestamp: Utc::now(),
        }
    }

    /// True when the score falls below the review threshold.
    pub fn should_flag_for_review(&self, confidence: f64) -> bool {
        confidence < 0.8
    }

    fn quality_adjustment(&self, summary: &ExtractionSummary) -> f64 {
        let mut adjustment = 0.0;

        let has_compound = !summary.technical_compounds.is_empty()
            || summary
                .elements
                .topic
                .as_deref()
                .map(|t| UPPER_TOKEN.is_match(t))
                .unwrap_or(false);
        if has_compound {
            adjustment += BONUS_TECHNICAL_COMPOUND;
        }

        if summary
            .elements
            .topic_name
            .as_deref()
            .map(|n| NORMALIZED_NAME.is_match(n))
            .unwrap_or(false)
        {
            adjustment += BONUS_NORMALIZED_NAME;
        }

        if !summary.errors.is_empty() {
            adjustment += PENALTY_STAGE_ERROR;
        }

        if !detect_conflicts(&summary.elements).is_empty() {
            adjustment += PENALTY_PATTERN_CONFLICT;
        }

        adjustment
    }

    /// Record confusion patterns for every stage below the threshold,
    /// plus any cross-extraction conflicts.
    fn track_confusion(&mut self, summary: &ExtractionSummary) -> Vec<String> {
        let mut confusion = Vec::new();
        let now = Utc::now();

        for (stage, score, _) in summary.scores.pairs() {
            if score >= CONFUSION_THRESHOLD {
                continue;
            }
            if let Some(diagnostic) = stage_diagnostic(stage, summary) {
                confusion.push(format!("{stage}: {diagnostic}"));
                self.confusion_patterns.push(ConfusionPattern {
                    stage: stage.to_string(),
                    actual_result: stage_result(stage, &summary.elements),
                    title: summary.title.clone(),
                    diagnostic,
                    confidence: score,
                    timestamp: now,
                });
            }
        }

        confusion.extend(detect_conflicts(&summary.elements));
        confusion
    }

    /// Accumulated confusion patterns.
    pub fn confusion_patterns(&self) -> &[ConfusionPattern] {
        &self.confusion_patterns
    }

    /// Current running metrics.
    pub fn metrics(&self) -> PerformanceMetrics {
        let total = self.history.len();
        let count_in = |lo: f64, hi: f64| {
            self.history
                .iter()
                .filter(|s| **s >= lo && **s < hi)
                .count()
        };

        let mut stage_success_rates = std::collections::BTreeMap::new();
        for (stage, scores) in &self.stage_scores {
            if scores.is_empty() {
                continue;
            }
            let rate = scores.iter().filter(|s| **s >= 0.8).count() as f64 / scores.len() as f64;
            stage_success_rates.insert(stage.clone(), round3(rate));
        }

        PerformanceMetrics {
            total_processed: total,
            high_count: self.history.iter().filter(|s| **s >= 0.9).count(),
            good_count: count_in(0.8, 0.9),
            medium_count: count_in(0.6, 0.8),
            low_count: count_in(0.4, 0.6),
            very_low_count: self.history.iter().filter(|s| **s < 0.4).count(),
            flagged_for_review: self.flagged,
            average_confidence: round3(mean(&self.history)),
            stage_success_rates,
            mean_processing_time_ms: round3(mean(&self.processing_times)),
            trend: self.trend(),
        }
    }

    /// Compare the mean of the last ten scores against the preceding ten.
    fn trend(&self) -> TrendDirection {
        if self.history.len() < 20 {
            return TrendDirection::InsufficientData;
        }
        let recent = &self.history[self.history.len() - 10..];
        let earlier = &self.history[self.history.len() - 20..self.history.len() - 10];
        let delta = mean_slice(recent) - mean_slice(earlier);
        if delta > 0.05 {
            TrendDirection::Improving
        } else if delta < -0.05 {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }

    /// Histogram over [0, 0.2, 0.4, 0.6, 0.8, 0.9, 1.0].
    pub fn distribution(&self) -> DistributionReport {
        let edges = [0.0, 0.2, 0.4, 0.6, 0.8, 0.9, 1.0];
        let mut counts = vec![0usize; edges.len() - 1];
        for score in &self.history {
            for i in 0..edges.len() - 1 {
                let last_bin = i == edges.len() - 2;
                if (*score >= edges[i] && *score < edges[i + 1]) || (last_bin && *score >= 1.0) {
                    counts[i] += 1;
                    break;
                }
            }
        }
        DistributionReport {
            total_samples: self.history.len(),
            average: round3(mean(&self.history)),
            bins: edges
                .windows(2)
                .map(|w| format!("{:.1}-{:.1}", w[0], w[1]))
                .collect(),
            counts,
        }
    }

    /// Recommendations for every stage whose success rate is below 0.8.
    pub fn recommendations(&self) -> Vec<StageRecommendation> {
        self.metrics()
            .stage_success_rates
            .iter()
            .filter(|(_, rate)| **rate < 0.8)
            .map(|(stage, rate)| StageRecommendation {
                stage: stage.clone(),
                success_rate: *rate,
                suggestion: format!("review {} patterns and accuracy", stage.replace('_', " ")),
            })
            .collect()
    }
}

// ----------------------------------------------------------------------
// Scoring helpers
// ----------------------------------------------------------------------

fn weighted_average(scores: &ComponentScores) -> f64 {
    let pairs = scores.pairs();
    let total_weight: f64 = pairs.iter().map(|(_, _, w)| w).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    pairs.iter().map(|(_, s, w)| s * w).sum::<f64>() / total_weight
}

fn completeness_adjustment(elements: &ExtractedElements) -> f64 {
    let mut adjustment = 0.0;
    if elements.extracted_forecast_date_range.is_none() {
        adjustment += PENALTY_DATE_MISSING;
    }
    if elements.extracted_report_type.is_none() {
        adjustment += PENALTY_REPORT_MISSING;
    }
    if elements.extracted_regions.is_empty() {
        adjustment += PENALTY_REGIONS_MISSING;
    }
    if elements.topic.is_none() {
        adjustment += PENALTY_TOPIC_MISSING;
    }
    adjustment
}

/// Conflicts between extractions: a year token inside the topic while a
/// date was extracted, or (standard workflow) a region inside the topic.
fn detect_conflicts(elements: &ExtractedElements) -> Vec<String> {
    let mut conflicts = Vec::new();
    let topic = match &elements.topic {
        Some(topic) => topic,
        None => return conflicts,
    };

    if elements.extracted_forecast_date_range.is_some() && YEAR_IN_TOPIC.is_match(topic) {
        conflicts.push("date appears in both topic and date extraction".to_string());
    }

    let standard = matches!(
        elements.market_term_type,
        Some(MarketTermClass::Standard) | Some(MarketTermClass::Ambiguous) | None
    );
    if standard {
        let topic_lower = topic.to_lowercase();
        for region in &elements.extracted_regions {
            let pattern = format!(r"\b{}\b", regex::escape(&region.to_lowercase()));
            if Regex::new(&pattern)
                .map(|re| re.is_match(&topic_lower))
                .unwrap_or(false)
            {
                conflicts.push(format!(
                    "region '{region}' appears in both topic and region list"
                ));
            }
        }
    }

    conflicts
}

fn stage_diagnostic(stage: &str, summary: &ExtractionSummary) -> Option<String> {
    let elements = &summary.elements;
    match stage {
        "date_extraction" => {
            if elements.extracted_forecast_date_range.is_none()
                && YEAR_IN_TOPIC.is_match(&summary.title)
            {
                Some("date indicators present but not extracted".to_string())
            } else {
                None
            }
        }
        "report_extraction" => {
            if elements.extracted_report_type.is_none() {
                let lower = summary.title.to_lowercase();
                let indicator = ["report", "analysis", "study", "outlook", "forecast"]
                    .iter()
                    .any(|t| lower.contains(t));
                indicator.then(|| "report type indicators present but not extracted".to_string())
            } else {
                None
            }
        }
        "geographic_detection" => {
            if elements.extracted_regions.is_empty() {
                let lower = summary.title.to_lowercase();
                let indicator = ["global", "north america", "europe", "asia", "apac", "china"]
                    .iter()
                    .any(|r| lower.contains(r));
                indicator.then(|| "geographic indicators present but not extracted".to_string())
            } else {
                None
            }
        }
        "topic_extraction" => match &elements.topic {
            None => Some("no topic extracted from title".to_string()),
            Some(topic) if topic.trim().len() < 2 => Some("extracted topic too short".to_string()),
            Some(_) => None,
        },
        _ => None,
    }
}

fn stage_result(stage: &str, elements: &ExtractedElements) -> Option<String> {
    match stage {
        "market_classification" => elements.market_term_type.map(|c| c.as_str().to_string()),
        "date_extraction" => elements.extracted_forecast_date_range.clone(),
        "report_extraction" => elements.extracted_report_type.clone(),
        "geographic_detection" => {
            if elements.extracted_regions.is_empty() {
                None
            } else {
                Some(elements.extracted_regions.join(", "))
            }
        }
        "topic_extraction" => elements.topic.clone(),
        _ => None,
    }
}

fn recommendation_text(confidence: f64, flag: ReviewFlag) -> String {
    let pct = confidence * 100.0;
    match flag {
        ReviewFlag::NoReview => {
            format!("high quality extraction ({pct:.1}%), ready for production use")
        }
        ReviewFlag::StandardReview => format!("good extraction ({pct:.1}%), minor review recommended"),
        ReviewFlag::PriorityReview => format!("moderate confidence ({pct:.1}%), priority review needed"),
        ReviewFlag::CriticalReview => format!("low confidence ({pct:.1}%), critical review required"),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn mean_slice(values: &[f64]) -> f64 {
    mean(values)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(
        scores: ComponentScores,
        date: Option<&str>,
        report: Option<&str>,
        regions: &[&str],
        topic: Option<&str>,
    ) -> ExtractionSummary {
        ExtractionSummary {
            title: "Test Title Market Report, 2030".to_string(),
            elements: ExtractedElements {
                market_term_type: Some(MarketTermClass::Standard),
                extracted_forecast_date_range: date.map(str::to_string),
                extracted_report_type: report.map(str::to_string),
                extracted_regions: regions.iter().map(|r| r.to_string()).collect(),
                topic: topic.map(str::to_string),
                topic_name: topic.and_then(crate::util::text::normalize_topic_name),
            },
            scores,
            technical_compounds: Vec::new(),
            errors: Vec::new(),
            processing_time_ms: 10.0,
        }
    }

    fn good_scores() -> ComponentScores {
        ComponentScores {
            market_classification: 0.95,
            date_extraction: 0.98,
            report_extraction: 0.90,
            geographic_detection: 0.85,
            topic_extraction: 0.88,
        }
    }

    // ============================================================
    // Aggregation
    // ============================================================

    #[test]
    fn test_complete_extraction_scores_high() {
        let mut tracker = ConfidenceTracker::new();
        let analysis = tracker.analyze(&summary(
            good_scores(),
            Some("2030"),
            Some("Market Report"),
            &["Global"],
            Some("Artificial Intelligence"),
        ));
        assert!(analysis.overall >= 0.8, "got {}", analysis.overall);
        assert_eq!(analysis.review_flag, ReviewFlag::NoReview);
        assert!((analysis.completeness - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_components_penalized() {
        let mut tracker = ConfidenceTracker::new();
        let full = tracker.analyze(&summary(
            good_scores(),
            Some("2030"),
            Some("Market Report"),
            &["Global"],
            Some("Artificial Intelligence"),
        ));
        let missing = tracker.analyze(&summary(good_scores(), None, None, &[], None));
        assert!(missing.overall < full.overall);
        // date -0.10, report -0.05, regions -0.15, topic -0.30
        assert!((missing.completeness_adjustment + 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_overall_clamped() {
        let mut tracker = ConfidenceTracker::new();
        let analysis = tracker.analyze(&summary(
            ComponentScores {
                market_classification: 0.1,
                date_extraction: 0.1,
                report_extraction: 0.1,
                geographic_detection: 0.1,
                topic_extraction: 0.1,
            },
            None,
            None,
            &[],
            None,
        ));
        assert!(analysis.overall >= 0.0);
        assert!(analysis.overall <= 1.0);
    }

    #[test]
    fn test_overall_bounded_by_component_max_plus_adjustments() {
        let mut tracker = ConfidenceTracker::new();
        let s = summary(
            good_scores(),
            Some("2030"),
            Some("Market Report"),
            &["Global"],
            Some("Artificial Intelligence"),
        );
        let analysis = tracker.analyze(&s);
        // The weighted average never exceeds the best component; only the
        // bounded quality bonus can sit on top
        assert!(analysis.overall <= s.scores.max() + 0.08 + 1e-9);
    }

    // ============================================================
    // Quality adjustments and conflicts
    // ============================================================

    #[test]
    fn test_error_penalty() {
        let mut tracker = ConfidenceTracker::new();
        let mut with_error = summary(
            good_scores(),
            Some("2030"),
            Some("Market Report"),
            &["Global"],
            Some("Artificial Intelligence"),
        );
        with_error.errors.push("stage failure".to_string());
        let clean = tracker.analyze(&summary(
            good_scores(),
            Some("2030"),
            Some("Market Report"),
            &["Global"],
            Some("Artificial Intelligence"),
        ));
        let errored = tracker.analyze(&with_error);
        assert!(errored.overall < clean.overall);
    }

    #[test]
    fn test_year_in_topic_conflict() {
        let conflicts = detect_conflicts(&ExtractedElements {
            market_term_type: Some(MarketTermClass::Standard),
            extracted_forecast_date_range: Some("2030".to_string()),
            extracted_report_type: None,
            extracted_regions: Vec::new(),
            topic: Some("Energy 2030 Outlook".to_string()),
            topic_name: None,
        });
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].contains("date"));
    }

    #[test]
    fn test_region_in_topic_conflict_standard_only() {
        let mut elements = ExtractedElements {
            market_term_type: Some(MarketTermClass::Standard),
            extracted_forecast_date_range: None,
            extracted_report_type: None,
            extracted_regions: vec!["Europe".to_string()],
            topic: Some("Europe Logistics".to_string()),
            topic_name: None,
        };
        assert_eq!(detect_conflicts(&elements).len(), 1);

        // market_in keeps regions as context; no conflict there
        elements.market_term_type = Some(MarketTermClass::MarketIn);
        assert!(detect_conflicts(&elements).is_empty());
    }

    // ============================================================
    // Levels and review gates
    // ============================================================

    #[test]
    fn test_level_thresholds() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.9), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.85), ConfidenceLevel::Good);
        assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.3), ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_review_thresholds() {
        assert_eq!(ReviewFlag::from_score(0.85), ReviewFlag::NoReview);
        assert_eq!(ReviewFlag::from_score(0.7), ReviewFlag::StandardReview);
        assert_eq!(ReviewFlag::from_score(0.5), ReviewFlag::PriorityReview);
        assert_eq!(ReviewFlag::from_score(0.2), ReviewFlag::CriticalReview);
    }

    // ============================================================
    // Telemetry
    // ============================================================

    #[test]
    fn test_confusion_recorded_below_threshold() {
        let mut tracker = ConfidenceTracker::new();
        let mut scores = good_scores();
        scores.date_extraction = 0.3;
        tracker.analyze(&summary(
            scores,
            None,
            Some("Market Report"),
            &["Global"],
            Some("Artificial Intelligence"),
        ));
        // Title contains "2030" so the date diagnostic fires
        assert_eq!(tracker.confusion_patterns().len(), 1);
        assert_eq!(tracker.confusion_patterns()[0].stage, "date_extraction");
    }

    #[test]
    fn test_metrics_counts_and_rates() {
        let mut tracker = ConfidenceTracker::new();
        for _ in 0..3 {
            tracker.analyze(&summary(
                good_scores(),
                Some("2030"),
                Some("Market Report"),
                &["Global"],
                Some("Artificial Intelligence"),
            ));
        }
        let metrics = tracker.metrics();
        assert_eq!(metrics.total_processed, 3);
        assert!(metrics.average_confidence > 0.0);
        assert_eq!(metrics.stage_success_rates.len(), 5);
        assert_eq!(metrics.trend, TrendDirection::InsufficientData);
    }

    #[test]
    fn test_trend_improving() {
        let mut tracker = ConfidenceTracker::new();
        tracker.history = (0..10).map(|_| 0.5).chain((0..10).map(|_| 0.9)).collect();
        assert_eq!(tracker.trend(), TrendDirection::Improving);
    }

    #[test]
    fn test_trend_declining() {
        let mut tracker = ConfidenceTracker::new();
        tracker.history = (0..10).map(|_| 0.9).chain((0..10).map(|_| 0.5)).collect();
        assert_eq!(tracker.trend(), TrendDirection::Declining);
    }

    #[test]
    fn test_distribution_bins() {
        let mut tracker = ConfidenceTracker::new();
        tracker.history = vec![0.1, 0.3, 0.5, 0.7, 0.85, 0.95, 1.0];
        let distribution = tracker.distribution();
        assert_eq!(distribution.total_samples, 7);
        assert_eq!(distribution.counts, vec![1, 1, 1, 1, 1, 2]);
        assert_eq!(distribution.bins.len(), 6);
    }

    #[test]
    fn test_recommendations_for_weak_stages() {
        let mut tracker = ConfidenceTracker::new();
        let mut scores = good_scores();
        scores.geographic_detection = 0.4;
        for _ in 0..5 {
            tracker.analyze(&summary(
                scores,
                Some("2030"),
                Some("Market Report"),
                &[],
                Some("Artificial Intelligence"),
            ));
        }
        let recommendations = tracker.recommendations();
        assert!(recommendations
            .iter()
            .any(|r| r.stage == "geographic_detection"));
    }
}
