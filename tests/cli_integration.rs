//! CLI integration tests for mrtp
//!
//! These tests execute the binary and verify:
//! - Store seeding and the fail-fast behavior on a missing store
//! - Full pipeline runs over inline titles and titles files
//! - The timestamped output directory layout and artifacts
//! - The patterns inspection command

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn mrtp() -> Command {
    Command::cargo_bin("mrtp").unwrap()
}

/// Seed a pattern store inside the temp dir and return its path.
fn seeded_store(dir: &TempDir) -> PathBuf {
    let store = dir.path().join("patterns.json");
    mrtp()
        .args(["seed"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded"));
    store
}

/// Locate the single run directory under outputs/YYYY/MM/DD/, skipping
/// the results store.
fn find_run_dir(outputs: &Path) -> PathBuf {
    let mut dir = outputs.to_path_buf();
    loop {
        let entries: Vec<PathBuf> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_dir()
                    && p.file_name()
                        .map(|name| name != "results")
                        .unwrap_or(true)
            })
            .collect();
        if entries.len() == 1 {
            dir = entries[0].clone();
        } else {
            break;
        }
    }
    dir
}

// ============================================================================
// Seeding
// ============================================================================

#[test]
fn test_seed_writes_store() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    assert!(store.exists());

    let content = fs::read_to_string(&store).unwrap();
    assert!(content.contains("\"report_type_dictionary\""));
    assert!(content.contains("\"geographic_entity\""));
    assert!(content.contains("Europe, Middle East and Africa"));
}

#[test]
fn test_seed_refuses_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    mrtp()
        .args(["seed"])
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    mrtp()
        .args(["seed", "--force"])
        .arg(&store)
        .assert()
        .success();
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_missing_store_fails_fast() {
    let dir = TempDir::new().unwrap();
    mrtp()
        .args(["run", "--pattern-store"])
        .arg(dir.path().join("nope.json"))
        .args(["--title", "Global AI Market Report, 2030"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("opening pattern store"));
}

#[test]
fn test_run_requires_titles() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    mrtp()
        .args(["run", "--pattern-store"])
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no titles"));
}

#[test]
fn test_run_inline_titles_writes_reports() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let outputs = dir.path().join("outputs");

    mrtp()
        .args(["run", "--pattern-store"])
        .arg(&store)
        .args(["--output-dir"])
        .arg(&outputs)
        .args([
            "--name",
            "cli_test",
            "--title",
            "Global Artificial Intelligence Market Size & Share Report, 2030",
            "--title",
            "APAC Personal Protective Equipment Market Analysis",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Titles:           2"))
        .stdout(predicate::str::contains("Report directory:"));

    // Results persisted under outputs/results
    let results_dir = outputs.join("results");
    assert!(results_dir.exists());
    assert_eq!(fs::read_dir(&results_dir).unwrap().count(), 2);

    // Artifacts inside outputs/YYYY/MM/DD/<ts>_cli_test/
    let run_dir = find_run_dir(&outputs);
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_cli_test"));

    let topics = fs::read_to_string(run_dir.join("final_topics.txt")).unwrap();
    assert!(topics.contains("Artificial Intelligence"));
    assert!(topics.contains("Personal Protective Equipment"));

    let oneline = fs::read_to_string(run_dir.join("oneline_pipeline_results.txt")).unwrap();
    assert!(oneline.contains("[standard][2030][Market Size & Share Report][Global]"));

    let json = fs::read_to_string(run_dir.join("pipeline_results.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
}

#[test]
fn test_run_titles_file() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let titles = dir.path().join("titles.txt");
    fs::write(
        &titles,
        "Europe Digital Pathology Market Size Report, 2024-2030\n\
         \n\
         Cloud Computing Market in Healthcare Industy\n",
    )
    .unwrap();

    mrtp()
        .args(["run", "--pattern-store"])
        .arg(&store)
        .args(["--titles-file"])
        .arg(&titles)
        .args(["--output-dir"])
        .arg(dir.path().join("outputs"))
        .args(["--no-persist"])
        .assert()
        .success()
        // The blank line is skipped
        .stdout(predicate::str::contains("Titles:           2"));
}

// ============================================================================
// Patterns
// ============================================================================

#[test]
fn test_patterns_listing() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    mrtp()
        .args(["patterns", "--pattern-store"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("report_type_dictionary"))
        .stdout(predicate::str::contains("geographic_entity"))
        .stdout(predicate::str::contains("Market"));
}

#[test]
fn test_patterns_kind_filter() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    mrtp()
        .args(["patterns", "--pattern-store"])
        .arg(&store)
        .args(["--kind", "geographic_entity"])
        .assert()
        .success()
        .stdout(predicate::str::contains("geographic_entity"))
        .stdout(predicate::str::contains("Asia Pacific"))
        .stdout(predicate::str::contains("market_term").not());
}

#[test]
fn test_patterns_unknown_kind_fails() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    mrtp()
        .args(["patterns", "--pattern-store"])
        .arg(&store)
        .args(["--kind", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown pattern kind"));
}
