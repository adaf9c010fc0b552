//! Batch report writing
//!
//! One timestamped directory per run, `outputs/YYYY/MM/DD/<ts>_<name>/`,
//! holding the JSON results, a markdown summary, and the per-run text
//! artifacts. Every text file starts with the standardized header
//! carrying a Pacific-time and a UTC timestamp.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::error::Result;
use crate::core::models::ProcessingStatus;
use crate::pipeline::{BatchOutcome, ProcessingResult};
use crate::stages::{ConfusionPattern, DistributionReport, PerformanceMetrics, StageRecommendation};
use crate::util::timestamp::TimestampBundle;

/// Telemetry bundle accompanying a batch into the report writer.
#[derive(Debug)]
pub struct RunTelemetry {
    pub metrics: PerformanceMetrics,
    pub distribution: DistributionReport,
    pub recommendations: Vec<StageRecommendation>,
    pub confusion: Vec<ConfusionPattern>,
}

/// Outcome of a baseline comparison.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BaselineComparison {
    pub baseline_total: usize,
    pub current_total: usize,
    pub newly_passing: Vec<String>,
    pub newly_failing: Vec<String>,
    pub unchanged_passing: usize,
    pub unchanged_failing: usize,
}

impl BaselineComparison {
    /// A run is acceptable when no previously-passing title regressed.
    pub fn acceptable(&self) -> bool {
        self.newly_failing.is_empty()
    }
}

/// Writes the per-run output directory and its artifacts.
#[derive(Debug)]
pub struct ReportWriter {
    script_name: String,
}

impl ReportWriter {
    pub fn new(script_name: impl Into<String>) -> Self {
        ReportWriter {
            script_name: script_name.into(),
        }
    }

    /// Create `root/YYYY/MM/DD/<YYYYMMDD_HHMMSS>_<name>/`.
    pub fn create_run_directory(&self, root: &Path, bundle: &TimestampBundle) -> Result<PathBuf> {
        let (year, month, day) = bundle.date_parts();
        let dir = root
            .join(year)
            .join(month)
            .join(day)
            .join(format!("{}_{}", bundle.filename, self.script_name));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write every artifact for a batch run; returns the run directory.
    ///
    /// Report-write errors on individual artifacts are logged and do not
    /// affect already-written files.
    pub fn write_all(
        &self,
        root: &Path,
        outcome: &BatchOutcome,
        telemetry: &RunTelemetry,
        baseline: Option<&[ProcessingResult]>,
    ) -> Result<PathBuf> {
        let bundle = TimestampBundle::now();
        let dir = self.create_run_directory(root, &bundle)?;

        let artifacts: Vec<(&str, String)> = vec![
            (
                "pipeline_results.json",
                serde_json::to_string_pretty(&outcome.results)?,
            ),
            ("summary_report.md", self.summary_report(outcome, telemetry, &bundle)),
            (
                "final_topics.txt",
                self.listing(&bundle, "Final Topics", final_topics(&outcome.results)),
            ),
            (
                "market_classifications.txt",
                self.listing(
                    &bundle,
                    "Market Term Classifications",
                    classifications(&outcome.results),
                ),
            ),
            (
                "extracted_dates.txt",
                self.listing(
                    &bundle,
                    "Extracted Dates (deduplicated)",
                    dedup_preserving(
                        outcome
                            .results
                            .iter()
                            .filter_map(|r| r.extracted.extracted_forecast_date_range.clone()),
                    ),
                ),
            ),
            (
                "extracted_report_types.txt",
                self.listing(
                    &bundle,
                    "Extracted Report Types (deduplicated)",
                    dedup_preserving(
                        outcome
                            .results
                            .iter()
                            .filter_map(|r| r.extracted.extracted_report_type.clone()),
                    ),
                ),
            ),
            (
                "extracted_regions.txt",
                self.listing(
                    &bundle,
                    "Extracted Regions (deduplicated, order-preserving)",
                    dedup_preserving(
                        outcome
                            .results
                            .iter()
                            .flat_map(|r| r.extracted.extracted_regions.iter().cloned()),
                    ),
                ),
            ),
            (
                "oneline_pipeline_results.txt",
                self.listing(
                    &bundle,
                    "One-Line Pipeline Traces",
                    outcome.results.iter().map(oneline).collect(),
                ),
            ),
            (
                "successful_extractions.txt",
                self.listing(
                    &bundle,
                    "Successful Extractions",
                    outcome
                        .results
                        .iter()
                        .filter(|r| r.status == ProcessingStatus::Completed)
                        .map(oneline)
                        .collect(),
                ),
            ),
            (
                "failed_extractions.txt",
                self.listing(
                    &bundle,
                    "Failed Extractions",
                    outcome
                        .results
                        .iter()
                        .filter(|r| r.status == ProcessingStatus::Failed)
                        .map(failure_line)
                        .collect(),
                ),
            ),
            (
                "pattern_analysis.txt",
                self.pattern_analysis(outcome, telemetry, &bundle),
            ),
        ];

        for (name, content) in artifacts {
            if let Err(e) = std::fs::write(dir.join(name), content) {
                warn!(artifact = name, error = %e, "report artifact write failed");
            }
        }

        if let Some(baseline) = baseline {
            let comparison = compare_against_baseline(&outcome.results, baseline);
            let content = self.legacy_comparison(&comparison, &bundle);
            if let Err(e) = std::fs::write(dir.join("legacy_comparison.txt"), content) {
                warn!(error = %e, "legacy comparison write failed");
            }
        }

        info!(dir = %dir.display(), "batch report written");
        Ok(dir)
    }

    /// Standardized dual-timezone header for every text artifact.
    fn header(&self, title: &str, bundle: &TimestampBundle) -> String {
        let mut out = String::new();
        let rule = "=".repeat(70);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Analysis Date (PDT): {}", bundle.pacific);
        let _ = writeln!(out, "Analysis Date (UTC): {}", bundle.utc);
        let _ = writeln!(out, "Script: {}", self.script_name);
        let _ = writeln!(out, "{rule}");
        out.push('\n');
        out
    }

    fn listing(&self, bundle: &TimestampBundle, title: &str, lines: Vec<String>) -> String {
        let mut out = self.header(title, bundle);
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    fn summary_report(
        &self,
        outcome: &BatchOutcome,
        telemetry: &RunTelemetry,
        bundle: &TimestampBundle,
    ) -> String {
        let stats = &outcome.stats;
        let mut out = String::new();
        let _ = writeln!(out, "# Batch Processing Summary");
        let _ = writeln!(out);
        let _ = writeln!(out, "- Batch: `{}`", outcome.batch_id);
        let _ = writeln!(out, "- Generated (PDT): {}", bundle.pacific);
        let _ = writeln!(out, "- Generated (UTC): {}", bundle.utc);
        let _ = writeln!(out);
        let _ = writeln!(out, "## Statistics");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Metric | Value |");
        let _ = writeln!(out, "|---|---|");
        let _ = writeln!(out, "| Total titles | {} |", stats.total_titles);
        let _ = writeln!(out, "| Completed | {} |", stats.completed);
        let _ = writeln!(out, "| Requires review | {} |", stats.requires_review);
        let _ = writeln!(out, "| Failed | {} |", stats.failed);
        let _ = writeln!(out, "| Success rate | {:.1}% |", stats.success_rate * 100.0);
        let _ = writeln!(
            out,
            "| Throughput | {:.2} titles/s |",
            stats.titles_per_second
        );
        let _ = writeln!(
            out,
            "| Mean confidence | {:.3} |",
            telemetry.metrics.average_confidence
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "## Confidence Distribution");
        let _ = writeln!(out);
        for (bin, count) in telemetry
            .distribution
            .bins
            .iter()
            .zip(&telemetry.distribution.counts)
        {
            let _ = writeln!(out, "- {bin}: {count}");
        }
        if !telemetry.recommendations.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Recommendations");
            let _ = writeln!(out);
            for rec in &telemetry.recommendations {
                let _ = writeln!(
                    out,
                    "- {} at {:.1}% success: {}",
                    rec.stage,
                    rec.success_rate * 100.0,
                    rec.suggestion
                );
            }
        }

        // Representative samples
        let successes: Vec<&ProcessingResult> = outcome
            .results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Completed)
            .take(10)
            .collect();
        let failures: Vec<&ProcessingResult> = outcome
            .results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Failed)
            .take(5)
            .collect();
        let reviews: Vec<&ProcessingResult> = outcome
            .results
            .iter()
            .filter(|r| r.status == ProcessingStatus::RequiresReview)
            .take(5)
            .collect();
        for (label, sample) in [
            ("Sample Successes", successes),
            ("Sample Failures", failures),
            ("Sample Review Cases", reviews),
        ] {
            if sample.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "## {label}");
            let _ = writeln!(out);
            for result in sample {
                let _ = writeln!(out, "- {}", oneline(result));
            }
        }

        out
    }

    fn pattern_analysis(
        &self,
        outcome: &BatchOutcome,
        telemetry: &RunTelemetry,
        bundle: &TimestampBundle,
    ) -> String {
        let mut out = self.header("Pattern Analysis of Failures", bundle);

        let troubled: Vec<&ProcessingResult> = outcome
            .results
            .iter()
            .filter(|r| r.status != ProcessingStatus::Completed)
            .collect();

        let no_date = troubled
            .iter()
            .filter(|r| r.extracted.extracted_forecast_date_range.is_none())
            .count();
        let no_report = troubled
            .iter()
            .filter(|r| r.extracted.extracted_report_type.is_none())
            .count();
        let no_regions = troubled
            .iter()
            .filter(|r| r.extracted.extracted_regions.is_empty())
            .count();
        let no_topic = troubled.iter().filter(|r| r.extracted.topic.is_none()).count();

        let _ = writeln!(out, "Titles not completed: {}", troubled.len());
        let _ = writeln!(out, "  missing date:        {no_date}");
        let _ = writeln!(out, "  missing report type: {no_report}");
        let _ = writeln!(out, "  missing regions:     {no_regions}");
        let _ = writeln!(out, "  missing topic:       {no_topic}");
        let _ = writeln!(out);

        let _ = writeln!(out, "Confusion patterns: {}", telemetry.confusion.len());
        let mut tally: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
        for pattern in &telemetry.confusion {
            *tally.entry(pattern.diagnostic.as_str()).or_insert(0) += 1;
        }
        for (diagnostic, count) in tally {
            let _ = writeln!(out, "  {count:4}  {diagnostic}");
        }

        out
    }

    fn legacy_comparison(&self, comparison: &BaselineComparison, bundle: &TimestampBundle) -> String {
        let mut out = self.header("Legacy Baseline Comparison", bundle);
        let _ = writeln!(out, "Baseline titles: {}", comparison.baseline_total);
        let _ = writeln!(out, "Current titles:  {}", comparison.current_total);
        let _ = writeln!(out, "Unchanged passing: {}", comparison.unchanged_passing);
        let _ = writeln!(out, "Unchanged failing: {}", comparison.unchanged_failing);
        let _ = writeln!(out, "Newly passing: {}", comparison.newly_passing.len());
        for title in &comparison.newly_passing {
            let _ = writeln!(out, "  + {title}");
        }
        let _ = writeln!(out, "Newly failing: {}", comparison.newly_failing.len());
        for title in &comparison.newly_failing {
            let _ = writeln!(out, "  - {title}");
        }
        let _ = writeln!(
            out,
            "Run acceptable: {}",
            if comparison.acceptable() { "yes" } else { "no (unexplained regressions)" }
        );
        out
    }
}

// ----------------------------------------------------------------------
// Artifact content helpers
// ----------------------------------------------------------------------

fn final_topics(results: &[ProcessingResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.extracted.topic.clone())
        .collect()
}

fn classifications(results: &[ProcessingResult]) -> Vec<String> {
    results
        .iter()
        .map(|r| {
            format!(
                "{}\t{}",
                r.extracted
                    .market_term_type
                    .map(|c| c.as_str())
                    .unwrap_or("unknown"),
                r.original_title
            )
        })
        .collect()
}

/// Order-preserving deduplication.
pub fn dedup_preserving<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

/// `original → [class][date][report][regions] → topic`
pub fn oneline(result: &ProcessingResult) -> String {
    let extracted = &result.extracted;
    format!(
        "{} \u{2192} [{}][{}][{}][{}] \u{2192} {}",
        result.original_title,
        extracted
            .market_term_type
            .map(|c| c.as_str())
            .unwrap_or("unknown"),
        extracted
            .extracted_forecast_date_range
            .as_deref()
            .unwrap_or(""),
        extracted.extracted_report_type.as_deref().unwrap_or(""),
        extracted.extracted_regions.join(", "),
        extracted.topic.as_deref().unwrap_or("")
    )
}

fn failure_line(result: &ProcessingResult) -> String {
    format!(
        "{}\t{}",
        result.original_title,
        result.error_message.as_deref().unwrap_or("unknown error")
    )
}

/// Compare current results against a prior-version baseline.
///
/// A title "passes" when it was not marked failed and produced a topic.
/// Titles are matched by original text; titles present on only one side
/// count toward the totals but not the deltas.
pub fn compare_against_baseline(
    current: &[ProcessingResult],
    baseline: &[ProcessingResult],
) -> BaselineComparison {
    let passes = |r: &ProcessingResult| {
        r.status != ProcessingStatus::Failed && r.extracted.topic.is_some()
    };
    let baseline_map: std::collections::HashMap<&str, bool> = baseline
        .iter()
        .map(|r| (r.original_title.as_str(), passes(r)))
        .collect();

    let mut newly_passing = Vec::new();
    let mut newly_failing = Vec::new();
    let mut unchanged_passing = 0;
    let mut unchanged_failing = 0;

    for result in current {
        let now = passes(result);
        match baseline_map.get(result.original_title.as_str()) {
            Some(true) if now => unchanged_passing += 1,
            Some(true) => newly_failing.push(result.original_title.clone()),
            Some(false) if now => newly_passing.push(result.original_title.clone()),
            Some(false) => unchanged_failing += 1,
            None => {}
        }
    }

    BaselineComparison {
        baseline_total: baseline.len(),
        current_total: current.len(),
        newly_passing,
        newly_failing,
        unchanged_passing,
        unchanged_failing,
    }
}

/// Load a baseline from a prior run's `pipeline_results.json`.
pub fn load_baseline(path: &Path) -> Result<Vec<ProcessingResult>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
