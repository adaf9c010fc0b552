//! Stage 7: Pipeline orchestrator
//!
//! Drives each title through stages 1-6 in strict order, applies the
//! retry policy, and runs batches in parallel. Titles are independent;
//! the compiled stage tables are shared immutably across workers, and
//! the confidence tracker and counter queue are the only shared mutable
//! state.
//!
//! # Architecture
//!
//! - `PipelineConfig`: environment-backed knobs (batch size, retries,
//!   timeout, output directory)
//! - `PipelineOrchestrator`: per-title execution + rayon batch fan-out
//! - `persist`: result documents keyed by processing id
//! - `report`: the timestamped output directory and its artifacts

pub mod persist;
pub mod report;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::{ParserError, Result};
use crate::core::models::{ExtractedElements, ProcessingStatus, ResultFlag};
use crate::library::PatternLibrary;
use crate::stages::{
    ClassificationResult, ComponentScores, ConfidenceAnalysis, ConfidenceTracker,
    ConfusionPattern, DateExtraction, DateExtractor, DistributionReport, ExtractionSummary,
    GeographicDetector, GeographicExtraction, MarketTermClassifier, PerformanceMetrics,
    ReportTypeExtraction, ReportTypeExtractor, StageRecommendation, TopicExtraction,
    TopicExtractor, YearWindow,
};
use crate::util::timestamp::TimestampBundle;

/// Environment variable names recognized by [`PipelineConfig::from_env`].
pub const BATCH_SIZE_ENV: &str = "MRTP_BATCH_SIZE";
pub const RETRY_ATTEMPTS_ENV: &str = "MRTP_RETRY_ATTEMPTS";
pub const TIMEOUT_SECONDS_ENV: &str = "MRTP_TIMEOUT_SECONDS";
pub const OUTPUT_DIR_ENV: &str = "MRTP_OUTPUT_DIR";
/// Recognized for config portability; the pipeline is pattern-only and
/// never calls out to an NLP API.
pub const NLP_API_ENV: &str = "MRTP_NLP_API_ENABLED";

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-call chunking for batch execution
    pub batch_size: usize,
    /// Full-title retries on a stage error
    pub retry_attempts: u32,
    /// Per-title budget; exceeding it is a stage error
    pub timeout: Duration,
    /// Root of the outputs/YYYY/MM/DD layout
    pub output_dir: PathBuf,
    /// Year validity window for stage 2
    pub year_window: YearWindow,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            batch_size: 100,
            retry_attempts: 3,
            timeout: Duration::from_secs(30),
            output_dir: PathBuf::from("outputs"),
            year_window: YearWindow::default(),
        }
    }
}

impl PipelineConfig {
    /// Read the recognized environment variables over the defaults.
    pub fn from_env() -> Self {
        let mut config = PipelineConfig::default();
        if let Some(batch_size) = read_env::<usize>(BATCH_SIZE_ENV) {
            config.batch_size = batch_size.max(1);
        }
        if let Some(retries) = read_env::<u32>(RETRY_ATTEMPTS_ENV) {
            config.retry_attempts = retries;
        }
        if let Some(seconds) = read_env::<u64>(TIMEOUT_SECONDS_ENV) {
            config.timeout = Duration::from_secs(seconds.max(1));
        }
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            config.output_dir = PathBuf::from(dir);
        }
        if std::env::var(NLP_API_ENV).is_ok() {
            debug!("NLP API toggle present; pattern-only pipeline ignores it");
        }
        config
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(variable = name, value = %value, "ignoring unparseable environment value");
            None
        }
    }
}

/// The per-stage results attached to a processing record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentResults {
    pub market_classification: Option<ClassificationResult>,
    pub date_extraction: Option<DateExtraction>,
    pub report_extraction: Option<ReportTypeExtraction>,
    pub geographic_detection: Option<GeographicExtraction>,
    pub topic_extraction: Option<TopicExtraction>,
}

/// Result of complete pipeline processing for a single title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub batch_id: String,
    pub processing_id: String,
    pub original_title: String,
    pub status: ProcessingStatus,
    #[serde(flatten)]
    pub extracted: ExtractedElements,
    pub confidence_analysis: Option<ConfidenceAnalysis>,
    pub component_results: ComponentResults,
    pub processing_time_seconds: f64,
    pub error_message: Option<String>,
    #[serde(default)]
    pub flags: Vec<ResultFlag>,
    pub created_timestamp: String,
}

impl ProcessingResult {
    /// Overall confidence, zero when analysis is absent.
    pub fn overall_confidence(&self) -> f64 {
        self.confidence_analysis
            .as_ref()
            .map(|a| a.overall)
            .unwrap_or(0.0)
    }
}

/// Statistics for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    pub batch_id: String,
    pub total_titles: usize,
    pub completed: usize,
    pub failed: usize,
    pub requires_review: usize,
    pub processing_time_seconds: f64,
    pub success_rate: f64,
    pub titles_per_second: f64,
    pub start_timestamp: String,
    pub end_timestamp: String,
}

/// Everything a batch run produces.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub results: Vec<ProcessingResult>,
    pub stats: BatchStats,
}

/// Central orchestrator for the title processing pipeline.
pub struct PipelineOrchestrator {
    classifier: MarketTermClassifier,
    dates: DateExtractor,
    report_types: ReportTypeExtractor,
    geography: GeographicDetector,
    topics: TopicExtractor,
    tracker: Mutex<ConfidenceTracker>,
    library: Arc<PatternLibrary>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    /// Build every stage from the library.
    pub fn new(library: Arc<PatternLibrary>, config: PipelineConfig) -> Self {
        PipelineOrchestrator {
            classifier: MarketTermClassifier::new(&library),
            dates: DateExtractor::with_window(&library, config.year_window),
            report_types: ReportTypeExtractor::new(&library),
            geography: GeographicDetector::new(&library),
            topics: TopicExtractor::new(),
            tracker: Mutex::new(ConfidenceTracker::new()),
            library,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a batch of titles; chunks run sequentially, titles within
    /// a chunk in parallel. Every input yields exactly one result.
    pub fn process_batch(&self, titles: &[String]) -> BatchOutcome {
        let start_bundle = TimestampBundle::now();
        let batch_id = format!("batch_{}", start_bundle.batch_stamp());
        let started = Instant::now();
        let progress = AtomicUsize::new(0);

        info!(batch = %batch_id, titles = titles.len(), "starting batch");

        let mut results: Vec<ProcessingResult> = Vec::with_capacity(titles.len());
        for (chunk_index, chunk) in titles.chunks(self.config.batch_size.max(1)).enumerate() {
            let base = chunk_index * self.config.batch_size.max(1);
            let chunk_results: Vec<ProcessingResult> = chunk
                .par_iter()
                .enumerate()
                .map(|(offset, title)| {
                    let result = self.process_title(title, &batch_id, base + offset);
                    let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        info!(
                            batch = %batch_id,
                            progress = %format!("{done}/{}", titles.len()),
                            "batch progress"
                        );
                    }
                    result
                })
                .collect();
            results.extend(chunk_results);
        }

        let elapsed = started.elapsed().as_secs_f64();
        let end_bundle = TimestampBundle::now();

        let completed = results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Completed)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Failed)
            .count();
        let requires_review = results
            .iter()
            .filter(|r| r.status == ProcessingStatus::RequiresReview)
            .count();

        let stats = BatchStats {
            batch_id: batch_id.clone(),
            total_titles: titles.len(),
            completed,
            failed,
            requires_review,
            processing_time_seconds: elapsed,
            success_rate: if titles.is_empty() {
                0.0
            } else {
                completed as f64 / titles.len() as f64
            },
            titles_per_second: if elapsed > 0.0 {
                titles.len() as f64 / elapsed
            } else {
                0.0
            },
            start_timestamp: start_bundle.pacific.clone(),
            end_timestamp: end_bundle.pacific,
        };

        info!(
            batch = %batch_id,
            completed,
            failed,
            requires_review,
            rate = %format!("{:.2}/s", stats.titles_per_second),
            "batch complete"
        );

        BatchOutcome {
            batch_id,
            results,
            stats,
        }
    }

    /// Process one title with the retry policy: a stage error retries
    /// the whole title with exponential backoff; exhaustion records a
    /// failed result with partial components. No title is ever dropped.
    pub fn process_title(&self, title: &str, batch_id: &str, index: usize) -> ProcessingResult {
        let processing_id = format!("{batch_id}_title_{index:04}");
        let mut last_error: Option<ParserError> = None;
        let mut partial = ComponentResults::default();

        for attempt in 1..=self.config.retry_attempts.max(1) {
            match self.run_stages(title, batch_id, &processing_id) {
                Ok(result) => return result,
                Err((error, components)) => {
                    warn!(
                        title = %truncate(title, 60),
                        attempt,
                        error = %error,
                        "title processing error"
                    );
                    partial = components;
                    last_error = Some(error);
                    if attempt < self.config.retry_attempts.max(1) {
                        std::thread::sleep(Duration::from_secs(1u64 << (attempt - 1)));
                    }
                }
            }
        }

        let bundle = TimestampBundle::now();
        ProcessingResult {
            batch_id: batch_id.to_string(),
            processing_id,
            original_title: title.to_string(),
            status: ProcessingStatus::Failed,
            extracted: ExtractedElements::default(),
            confidence_analysis: None,
            component_results: partial,
            processing_time_seconds: 0.0,
            error_message: last_error.map(|e| e.to_string()),
            flags: vec![ResultFlag::ProcessingError],
            created_timestamp: bundle.pacific,
        }
    }

    /// One attempt at the full stage sequence 1 -> 6. Errors carry the
    /// components accumulated so far, so a final failure still records
    /// partial results.
    fn run_stages(
        &self,
        title: &str,
        batch_id: &str,
        processing_id: &str,
    ) -> std::result::Result<ProcessingResult, (ParserError, ComponentResults)> {
        let started = Instant::now();
        let bundle = TimestampBundle::now();
        let mut components = ComponentResults::default();

        // Stage 1: market-term classification (does not rewrite)
        let classification = self.classifier.classify(title);
        let class = classification.class;
        if let Some(id) = &classification.pattern_id {
            self.library.record_success(id);
        }
        components.market_classification = Some(classification.clone());
        if let Err(e) = self.check_timeout(started) {
            return Err((e, components));
        }

        // Stage 2: date extraction; the cleaned title flows forward
        let date = self.dates.extract(title);
        if let Some(id) = &date.matched_pattern_id {
            self.library.record_success(id);
        }
        let working_after_dates = date.cleaned_title.clone();
        components.date_extraction = Some(date.clone());
        if let Err(e) = self.check_timeout(started) {
            return Err((e, components));
        }

        // Stage 3: report type; connector titles substitute the
        // pipeline-forward text for downstream stages
        let report = self.report_types.extract(&working_after_dates, class);
        if let Some(id) = &report.acronym_template_id {
            self.library.record_success(id);
        }
        let working_after_report = report.pipeline_forward.clone();
        components.report_extraction = Some(report.clone());
        if let Err(e) = self.check_timeout(started) {
            return Err((e, components));
        }

        // Stage 4: geographic detection over stage 3's output
        let geo = self.geography.extract(&working_after_report);
        for id in &geo.pattern_ids {
            self.library.record_success(id);
        }
        let working_after_geo = geo.title.clone();
        components.geographic_detection = Some(geo.clone());
        if let Err(e) = self.check_timeout(started) {
            return Err((e, components));
        }

        // Stage 5: topic residualization over the structured outputs
        let mut elements = ExtractedElements {
            market_term_type: Some(class),
            extracted_forecast_date_range: date.extracted_date_range.clone(),
            extracted_report_type: report.extracted_report_type.clone(),
            extracted_regions: geo.extracted_regions.clone(),
            topic: None,
            topic_name: None,
        };
        let topic = self.topics.extract(
            title,
            &working_after_geo,
            &elements,
            report.extracted_acronym.as_deref(),
        );
        elements.topic = topic.topic.clone();
        elements.topic_name = topic.topic_name.clone();
        components.topic_extraction = Some(topic.clone());
        if let Err(e) = self.check_timeout(started) {
            return Err((e, components));
        }

        // Stage 6: confidence aggregation
        let summary = ExtractionSummary {
            title: title.to_string(),
            elements: elements.clone(),
            scores: ComponentScores {
                market_classification: classification.confidence,
                date_extraction: date.confidence,
                report_extraction: report.confidence,
                geographic_detection: geo.confidence,
                topic_extraction: topic.confidence,
            },
            technical_compounds: topic.technical_compounds.clone(),
            errors: Vec::new(),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        let analysis = match self.tracker.lock() {
            Ok(mut tracker) => tracker.analyze(&summary),
            Err(_) => {
                let error = ParserError::stage("confidence_tracking", "tracker lock poisoned");
                return Err((error, components));
            }
        };

        let mut flags = Vec::new();
        let status = if analysis.overall < 0.8 {
            flags.push(ResultFlag::LowConfidence);
            ProcessingStatus::RequiresReview
        } else {
            ProcessingStatus::Completed
        };
        if analysis.overall < 0.5 {
            flags.push(ResultFlag::VeryLowConfidence);
        }
        if elements.topic.is_none() {
            flags.push(ResultFlag::NoTopicExtracted);
        }

        debug!(
            title = %truncate(title, 60),
            topic = elements.topic.as_deref().unwrap_or("-"),
            confidence = analysis.overall,
            "title processed"
        );

        Ok(ProcessingResult {
            batch_id: batch_id.to_string(),
            processing_id: processing_id.to_string(),
            original_title: title.to_string(),
            status,
            extracted: elements,
            confidence_analysis: Some(analysis),
            component_results: components,
            processing_time_seconds: started.elapsed().as_secs_f64(),
            error_message: None,
            flags,
            created_timestamp: bundle.pacific,
        })
    }

    fn check_timeout(&self, started: Instant) -> Result<()> {
        let elapsed = started.elapsed();
        if elapsed > self.config.timeout {
            return Err(ParserError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.config.timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    /// Running metrics from the confidence tracker.
    pub fn metrics(&self) -> PerformanceMetrics {
        self.tracker
            .lock()
            .map(|t| t.metrics())
            .unwrap_or_else(|_| ConfidenceTracker::new().metrics())
    }

    /// Confidence histogram.
    pub fn distribution(&self) -> DistributionReport {
        self.tracker
            .lock()
            .map(|t| t.distribution())
            .unwrap_or_else(|_| ConfidenceTracker::new().distribution())
    }

    /// Recommendations for weak stages.
    pub fn recommendations(&self) -> Vec<StageRecommendation> {
        self.tracker
            .lock()
            .map(|t| t.recommendations())
            .unwrap_or_default()
    }

    /// Accumulated confusion telemetry.
    pub fn confusion_patterns(&self) -> Vec<ConfusionPattern> {
        self.tracker
            .lock()
            .map(|t| t.confusion_patterns().to_vec())
            .unwrap_or_default()
    }

    /// Drain pending pattern-counter events for the store merge.
    pub fn drain_counters(&self) -> Vec<crate::library::CounterEvent> {
        self.library.drain_counters()
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
