//! End-to-end pipeline scenarios
//!
//! Each test drives one attested title through the full stage sequence
//! over the seeded pattern library and checks the complete structured
//! output: market-term class, date range, report type, regions, topic.

use std::sync::Arc;

use title_parser::core::MarketTermClass;
use title_parser::library::{seed, PatternLibrary, PatternStore};
use title_parser::pipeline::{PipelineConfig, PipelineOrchestrator, ProcessingResult};

fn pipeline() -> PipelineOrchestrator {
    let store = PatternStore::from_records(seed::default_records());
    let library = Arc::new(PatternLibrary::load(&store));
    PipelineOrchestrator::new(library, PipelineConfig::default())
}

fn process(title: &str) -> ProcessingResult {
    pipeline().process_title(title, "batch_scenario", 0)
}

#[test]
fn scenario_standard_with_ampersand_report() {
    let result = process("Global Artificial Intelligence Market Size & Share Report, 2030");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::Standard)
    );
    assert_eq!(
        result.extracted.extracted_forecast_date_range.as_deref(),
        Some("2030")
    );
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market Size & Share Report")
    );
    assert_eq!(result.extracted.extracted_regions, vec!["Global"]);
    assert_eq!(
        result.extracted.topic.as_deref(),
        Some("Artificial Intelligence")
    );
}

#[test]
fn scenario_standard_no_date() {
    let result = process("APAC Personal Protective Equipment Market Analysis");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::Standard)
    );
    assert_eq!(result.extracted.extracted_forecast_date_range, None);
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market Analysis")
    );
    assert_eq!(result.extracted.extracted_regions, vec!["Asia Pacific"]);
    assert_eq!(
        result.extracted.topic.as_deref(),
        Some("Personal Protective Equipment")
    );
}

#[test]
fn scenario_market_in_with_range() {
    let result = process("AI Market in Automotive Outlook & Trends, 2024-2029");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::MarketIn)
    );
    assert_eq!(
        result.extracted.extracted_forecast_date_range.as_deref(),
        Some("2024-2029")
    );
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market Outlook & Trends")
    );
    assert!(result.extracted.extracted_regions.is_empty());
    assert_eq!(result.extracted.topic.as_deref(), Some("AI in Automotive"));
}

#[test]
fn scenario_market_for_with_terminal_year() {
    let result = process("Veterinary Vaccine Market for Livestock Analysis, 2025");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::MarketFor)
    );
    assert_eq!(
        result.extracted.extracted_forecast_date_range.as_deref(),
        Some("2025")
    );
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market Analysis")
    );
    assert!(result.extracted.extracted_regions.is_empty());
    assert_eq!(
        result.extracted.topic.as_deref(),
        Some("Veterinary Vaccine for Livestock")
    );
}

#[test]
fn scenario_two_regions_with_connector() {
    let result = process("U.S. And Europe Digital Pathology Market Size Report, 2024-2030");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::Standard)
    );
    assert_eq!(
        result.extracted.extracted_forecast_date_range.as_deref(),
        Some("2024-2030")
    );
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market Size Report")
    );
    assert_eq!(
        result.extracted.extracted_regions,
        vec!["United States", "Europe"]
    );
    assert_eq!(result.extracted.topic.as_deref(), Some("Digital Pathology"));
}

#[test]
fn scenario_acronym_embedded() {
    let result = process("Real-Time Locating Systems Market Size, RTLS Industry Report, 2025");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::Standard)
    );
    assert_eq!(
        result.extracted.extracted_forecast_date_range.as_deref(),
        Some("2025")
    );
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market Size, Industry Report")
    );
    assert!(result.extracted.extracted_regions.is_empty());
    let topic = result.extracted.topic.expect("topic extracted");
    assert!(topic.contains("Real-Time Locating Systems"), "topic: {topic}");
    assert!(topic.contains("RTLS"), "topic: {topic}");
}

#[test]
fn scenario_compound_region_matched_as_unit() {
    let result = process("Europe, Middle East and Africa Financial Services Market, 2026");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::Standard)
    );
    assert_eq!(
        result.extracted.extracted_forecast_date_range.as_deref(),
        Some("2026")
    );
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market")
    );
    // One compound region, never its three components
    assert_eq!(
        result.extracted.extracted_regions,
        vec!["Europe, Middle East and Africa"]
    );
    assert_eq!(result.extracted.topic.as_deref(), Some("Financial Services"));
}

#[test]
fn scenario_misspelled_keyword_participates() {
    let result = process("Cloud Computing Market in Healthcare Industy");
    assert_eq!(
        result.extracted.market_term_type,
        Some(MarketTermClass::MarketIn)
    );
    assert_eq!(result.extracted.extracted_forecast_date_range, None);
    assert_eq!(
        result.extracted.extracted_report_type.as_deref(),
        Some("Market Industy")
    );
    assert!(result.extracted.extracted_regions.is_empty());
    assert_eq!(
        result.extracted.topic.as_deref(),
        Some("Cloud Computing in Healthcare")
    );
}

#[test]
fn batch_run_covers_all_scenarios() {
    let titles: Vec<String> = [
        "Global Artificial Intelligence Market Size & Share Report, 2030",
        "APAC Personal Protective Equipment Market Analysis",
        "AI Market in Automotive Outlook & Trends, 2024-2029",
        "Veterinary Vaccine Market for Livestock Analysis, 2025",
        "U.S. And Europe Digital Pathology Market Size Report, 2024-2030",
        "Real-Time Locating Systems Market Size, RTLS Industry Report, 2025",
        "Europe, Middle East and Africa Financial Services Market, 2026",
        "Cloud Computing Market in Healthcare Industy",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let outcome = pipeline().process_batch(&titles);
    assert_eq!(outcome.results.len(), titles.len());
    assert_eq!(outcome.stats.failed, 0);
    // Results carry processing ids in batch order
    for (index, result) in outcome.results.iter().enumerate() {
        assert!(result
            .processing_id
            .ends_with(&format!("_title_{index:04}")));
        assert_eq!(result.original_title, titles[index]);
    }
}
