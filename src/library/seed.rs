//! Default pattern record set
//!
//! A complete working library: market-term patterns, the four date
//! format families, the report-type dictionary (including the attested
//! misspellings), geographic entities with aliases, confusing terms,
//! and acronym-embedded templates. Offline tooling owns the production
//! store; this set seeds new stores and backs the test suites.

use crate::library::records::{DictionarySubtype, PatternKind, PatternRecord};

/// Build the full default record set.
pub fn default_records() -> Vec<PatternRecord> {
    let mut records = Vec::new();
    records.extend(market_term_records());
    records.extend(date_pattern_records());
    records.extend(dictionary_records());
    records.extend(geographic_records());
    records.extend(confusing_term_records());
    records.extend(acronym_template_records());
    records
}

fn market_term_records() -> Vec<PatternRecord> {
    vec![
        PatternRecord::new("mt_market_for", PatternKind::MarketTerm, "Market for")
            .with_pattern(r"\bmarket\s+for\b")
            .with_normalized_form("market_for")
            .with_priority(1),
        PatternRecord::new("mt_market_in", PatternKind::MarketTerm, "Market in")
            .with_pattern(r"\bmarket\s+in\b")
            .with_normalized_form("market_in")
            .with_priority(1),
        PatternRecord::new("mt_market_by", PatternKind::MarketTerm, "Market by")
            .with_pattern(r"\bmarket\s+by\b")
            .with_normalized_form("market_by")
            .with_priority(1),
    ]
}

fn date_pattern_records() -> Vec<PatternRecord> {
    vec![
        // Range family (highest priority)
        PatternRecord::new("dt_range_full", PatternKind::DatePattern, "YYYY-YYYY")
            .with_pattern(r"\b(20\d{2})\s*[-\u{2013}\u{2014}]\s*(20\d{2})\b")
            .with_format_type("range_format")
            .with_priority(1),
        PatternRecord::new("dt_range_to", PatternKind::DatePattern, "YYYY to YYYY")
            .with_pattern(r"\b(20\d{2})\s+to\s+(20\d{2})\b")
            .with_format_type("range_format")
            .with_priority(1),
        PatternRecord::new("dt_range_abbrev", PatternKind::DatePattern, "YYYY-YY")
            .with_pattern(r"\b(20\d{2})\s*[-\u{2013}\u{2014}]\s*(\d{2})\b")
            .with_format_type("range_format")
            .with_priority(2),
        // Terminal comma family
        PatternRecord::new("dt_terminal_comma", PatternKind::DatePattern, ", YYYY")
            .with_pattern(r",\s*(20\d{2})\s*\.?\s*$")
            .with_format_type("terminal_comma")
            .with_priority(3),
        // Bracket family (capture the whole bracket content so the
        // non-year words can be preserved)
        PatternRecord::new("dt_bracket_square", PatternKind::DatePattern, "[YYYY ...]")
            .with_pattern(r"\[([^\[\]]*\b20\d{2}\b[^\[\]]*)\]")
            .with_format_type("bracket_format")
            .with_priority(4),
        PatternRecord::new("dt_bracket_paren", PatternKind::DatePattern, "(YYYY ...)")
            .with_pattern(r"\(([^()]*\b20\d{2}\b[^()]*)\)")
            .with_format_type("bracket_format")
            .with_priority(4),
        // Embedded family
        PatternRecord::new("dt_embedded_outlook", PatternKind::DatePattern, "Outlook YYYY")
            .with_pattern(r"\b(?:outlook|forecast|forecasts)\s+(?:to\s+|till\s+|until\s+)?(20\d{2})\b")
            .with_format_type("embedded_format")
            .with_priority(5),
        PatternRecord::new("dt_embedded_through", PatternKind::DatePattern, "through YYYY")
            .with_pattern(r"\b(?:through|by|to|until|till)\s+(20\d{2})\b")
            .with_format_type("embedded_format")
            .with_priority(6),
        PatternRecord::new("dt_embedded_leading", PatternKind::DatePattern, "YYYY Outlook")
            .with_pattern(r"^\s*(20\d{2})\s+(?:outlook|forecast|report)\b")
            .with_format_type("embedded_format")
            .with_priority(6),
    ]
}

fn dictionary_records() -> Vec<PatternRecord> {
    let mut records = vec![
        // The boundary anchor. Coverage percentage from corpus analysis.
        PatternRecord::new("rtd_market", PatternKind::ReportTypeDictionary, "Market")
            .with_subtype(DictionarySubtype::PrimaryKeyword)
            .with_priority(1)
            .with_frequency(19553)
            .with_percentage(96.8),
    ];

    // Secondary keywords, most frequent first
    let secondary: &[(&str, u64)] = &[
        ("Size", 12083),
        ("Share", 9771),
        ("Report", 9515),
        ("Industry", 5867),
        ("Growth", 4072),
        ("Trends", 3706),
        ("Analysis", 3502),
        ("Forecast", 1797),
        ("Outlook", 1246),
        ("Insights", 832),
        ("Overview", 490),
        ("Study", 225),
        ("Research", 188),
        ("Statistics", 86),
    ];
    for (index, (term, frequency)) in secondary.iter().enumerate() {
        records.push(
            PatternRecord::new(
                format!("rtd_{}", term.to_lowercase()),
                PatternKind::ReportTypeDictionary,
                *term,
            )
            .with_subtype(DictionarySubtype::SecondaryKeyword)
            .with_priority(10 + index as u32)
            .with_frequency(*frequency),
        );
    }

    // Attested misspellings; normalized_form names the canonical keyword
    let misspellings: &[(&str, &str)] = &[
        ("Industy", "Industry"),
        ("Indsutry", "Industry"),
        ("Repot", "Report"),
        ("Sze", "Size"),
    ];
    for (term, canonical) in misspellings {
        records.push(
            PatternRecord::new(
                format!("rtd_miss_{}", term.to_lowercase()),
                PatternKind::ReportTypeDictionary,
                *term,
            )
            .with_subtype(DictionarySubtype::SecondaryKeyword)
            .with_normalized_form(*canonical)
            .with_priority(50)
            .with_frequency(1),
        );
    }

    // Separators, ordered by corpus frequency
    let separators = [",", "&", "and", "|", ":", ";", "-", "\u{2013}", "\u{2014}"];
    for (index, separator) in separators.iter().enumerate() {
        records.push(
            PatternRecord::new(
                format!("rtd_sep_{index}"),
                PatternKind::ReportTypeDictionary,
                *separator,
            )
            .with_subtype(DictionarySubtype::Separator)
            .with_priority(index as u32 + 1),
        );
    }

    // Boundary markers
    for (index, marker) in ["[", "]", "(", ")"].iter().enumerate() {
        records.push(
            PatternRecord::new(
                format!("rtd_bnd_{index}"),
                PatternKind::ReportTypeDictionary,
                *marker,
            )
            .with_subtype(DictionarySubtype::BoundaryMarker)
            .with_priority(index as u32 + 1),
        );
    }

    records
}

fn geographic_records() -> Vec<PatternRecord> {
    // (id suffix, primary term, aliases, priority). Priority 1 holds the
    // compound regions so they win over their components.
    let entries: &[(&str, &str, &[&str], u32)] = &[
        (
            "emea",
            "Europe, Middle East and Africa",
            &["EMEA", "Europe Middle East and Africa", "Europe, Middle East & Africa"],
            1,
        ),
        ("mea", "Middle East and Africa", &["MEA", "Middle East & Africa"], 1),
        (
            "mena",
            "Middle East and North Africa",
            &["MENA", "Middle East & North Africa"],
            1,
        ),
        (
            "apac_japan",
            "Asia Pacific Excluding Japan",
            &["APEJ", "Asia Pacific excluding Japan"],
            1,
        ),
        ("middle_east", "Middle East", &[], 2),
        (
            "asia_pacific",
            "Asia Pacific",
            &["APAC", "Asia-Pacific", "Asia Pac"],
            2,
        ),
        ("north_america", "North America", &["NA"], 2),
        ("latin_america", "Latin America", &["LATAM", "LatAm"], 2),
        ("south_america", "South America", &[], 2),
        ("central_america", "Central America", &[], 2),
        ("southeast_asia", "Southeast Asia", &["South East Asia", "SEA"], 2),
        ("eastern_europe", "Eastern Europe", &[], 2),
        ("western_europe", "Western Europe", &[], 2),
        ("north_africa", "North Africa", &[], 2),
        ("sub_saharan", "Sub-Saharan Africa", &["Sub Saharan Africa"], 2),
        (
            "united_states",
            "United States",
            &["U.S.", "US", "USA", "U.S.A.", "United States of America"],
            3,
        ),
        (
            "united_kingdom",
            "United Kingdom",
            &["U.K.", "UK", "Great Britain", "Britain"],
            3,
        ),
        (
            "uae",
            "United Arab Emirates",
            &["UAE", "U.A.E."],
            3,
        ),
        ("saudi_arabia", "Saudi Arabia", &["KSA"], 3),
        ("south_korea", "South Korea", &["Korea", "Republic of Korea"], 3),
        ("new_zealand", "New Zealand", &["NZ"], 3),
        ("south_africa", "South Africa", &[], 3),
        ("hong_kong", "Hong Kong", &[], 3),
        ("global", "Global", &["Worldwide", "World"], 4),
        ("europe", "Europe", &["European"], 4),
        ("asia", "Asia", &[], 5),
        ("africa", "Africa", &[], 5),
        ("china", "China", &["PRC"], 5),
        ("india", "India", &[], 5),
        ("japan", "Japan", &[], 5),
        ("germany", "Germany", &[], 5),
        ("france", "France", &[], 5),
        ("italy", "Italy", &[], 5),
        ("spain", "Spain", &[], 5),
        ("canada", "Canada", &[], 5),
        ("mexico", "Mexico", &[], 5),
        ("brazil", "Brazil", &[], 5),
        ("australia", "Australia", &[], 5),
        ("russia", "Russia", &[], 5),
        ("indonesia", "Indonesia", &[], 5),
        ("thailand", "Thailand", &[], 5),
        ("vietnam", "Vietnam", &[], 5),
        ("singapore", "Singapore", &[], 5),
        ("malaysia", "Malaysia", &[], 5),
        ("argentina", "Argentina", &[], 5),
        ("chile", "Chile", &[], 5),
        ("colombia", "Colombia", &[], 5),
        ("egypt", "Egypt", &[], 5),
        ("nigeria", "Nigeria", &[], 5),
        ("turkey", "Turkey", &[], 5),
        ("poland", "Poland", &[], 5),
        ("netherlands", "Netherlands", &["Holland"], 5),
        ("switzerland", "Switzerland", &[], 5),
        ("sweden", "Sweden", &[], 5),
        ("norway", "Norway", &[], 5),
        ("taiwan", "Taiwan", &[], 5),
        ("philippines", "Philippines", &[], 5),
    ];

    entries
        .iter()
        .map(|(suffix, term, aliases, priority)| {
            PatternRecord::new(
                format!("geo_{suffix}"),
                PatternKind::GeographicEntity,
                *term,
            )
            .with_aliases(aliases.iter().copied())
            .with_priority(*priority)
        })
        .collect()
}

fn confusing_term_records() -> Vec<PatternRecord> {
    // Context regexes that suppress a geographic match: when the pattern
    // matches the title, the named term is not treated as a region.
    vec![
        PatternRecord::new("cf_turkey_poultry", PatternKind::ConfusingTerm, "Turkey")
            .with_pattern(r"\bturkey\s+(?:meat|breast|farming|feed)\b")
            .with_priority(1),
        PatternRecord::new("cf_china_ware", PatternKind::ConfusingTerm, "China")
            .with_pattern(r"\b(?:bone|fine)\s+china\b")
            .with_priority(1),
    ]
}

fn acronym_template_records() -> Vec<PatternRecord> {
    vec![
        PatternRecord::new("acr_industry_report", PatternKind::AcronymEmbedded, "ACRONYM Industry Report")
            .with_pattern(r",\s*([A-Z][A-Za-z]{1,5})\s+Industry\s+Report\b")
            .with_base_type("Industry Report")
            .with_priority(1),
        PatternRecord::new("acr_market_report", PatternKind::AcronymEmbedded, "ACRONYM Market Report")
            .with_pattern(r",\s*([A-Z][A-Za-z]{1,5})\s+Market\s+Report\b")
            .with_base_type("Market Report")
            .with_priority(2),
        PatternRecord::new("acr_industry_analysis", PatternKind::AcronymEmbedded, "ACRONYM Industry Analysis")
            .with_pattern(r",\s*([A-Z][A-Za-z]{1,5})\s+Industry\s+Analysis\b")
            .with_base_type("Industry Analysis")
            .with_priority(3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{PatternLibrary, PatternStore};
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique() {
        let records = default_records();
        let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), records.len(), "duplicate record ids in seed");
    }

    #[test]
    fn test_every_regex_compiles() {
        let store = PatternStore::from_records(default_records());
        let library = PatternLibrary::load(&store);
        assert!(
            library.compile_failures().is_empty(),
            "seed contains invalid regexes: {:?}",
            library.compile_failures()
        );
    }

    #[test]
    fn test_exactly_one_primary_keyword() {
        let store = PatternStore::from_records(default_records());
        let library = PatternLibrary::load(&store);
        let primaries = library.dictionary(DictionarySubtype::PrimaryKeyword);
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].term(), "Market");
    }

    #[test]
    fn test_misspellings_present_with_canonical_form() {
        let records = default_records();
        let industy = records.iter().find(|r| r.term == "Industy").unwrap();
        assert_eq!(industy.normalized_form.as_deref(), Some("Industry"));
        assert!(records.iter().any(|r| r.term == "Repot"));
        assert!(records.iter().any(|r| r.term == "Sze"));
        assert!(records.iter().any(|r| r.term == "Indsutry"));
    }

    #[test]
    fn test_compound_regions_outrank_components() {
        let records = default_records();
        let emea = records
            .iter()
            .find(|r| r.term == "Europe, Middle East and Africa")
            .unwrap();
        let europe = records.iter().find(|r| r.term == "Europe").unwrap();
        assert!(emea.priority < europe.priority);
    }

    #[test]
    fn test_acronym_templates_have_capture_groups() {
        for record in acronym_template_records() {
            let source = record.pattern.unwrap();
            let regex = regex::Regex::new(&source).unwrap();
            assert_eq!(regex.captures_len(), 2, "template must have one capture group");
            assert!(record.base_type.is_some());
        }
    }
}
