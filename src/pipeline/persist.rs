//! Result persistence
//!
//! Processed results are stored as JSON documents keyed by processing
//! id, one file per record, inside a result directory. Insert failures
//! are logged and never abort the batch; the in-memory results remain
//! available to the report writer.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::error::{ParserError, Result};
use crate::pipeline::ProcessingResult;

/// Document-per-record result store.
#[derive(Debug)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Open (creating if needed) a result store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(ResultStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Insert one result, keyed by processing id.
    pub fn insert(&self, result: &ProcessingResult) -> Result<()> {
        let path = self.dir.join(format!("{}.json", result.processing_id));
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json).map_err(|e| ParserError::Persistence {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(())
    }

    /// Insert a batch; failures are logged, the batch continues.
    /// Returns (inserted, failed).
    pub fn insert_batch(&self, results: &[ProcessingResult]) -> (usize, usize) {
        let mut inserted = 0;
        let mut failed = 0;
        for result in results {
            match self.insert(result) {
                Ok(()) => inserted += 1,
                Err(e) => {
                    warn!(
                        processing_id = %result.processing_id,
                        error = %e,
                        "result insert failed"
                    );
                    failed += 1;
                }
            }
        }
        info!(inserted, failed, store = %self.dir.display(), "results persisted");
        (inserted, failed)
    }

    /// Load a previously persisted result by processing id.
    pub fn load(&self, processing_id: &str) -> Result<ProcessingResult> {
        let path = self.dir.join(format!("{processing_id}.json"));
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ExtractedElements, ProcessingStatus};
    use crate::pipeline::ComponentResults;
    use tempfile::TempDir;

    fn sample_result(id: &str) -> ProcessingResult {
        ProcessingResult {
            batch_id: "batch_test".to_string(),
            processing_id: id.to_string(),
            original_title: "AI Market Report, 2030".to_string(),
            status: ProcessingStatus::Completed,
            extracted: ExtractedElements::default(),
            confidence_analysis: None,
            component_results: ComponentResults::default(),
            processing_time_seconds: 0.01,
            error_message: None,
            flags: Vec::new(),
            created_timestamp: "2026-08-01 09:00:00 PDT".to_string(),
        }
    }

    #[test]
    fn test_insert_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path().join("results")).unwrap();

        let result = sample_result("batch_test_title_0000");
        store.insert(&result).unwrap();

        let loaded = store.load("batch_test_title_0000").unwrap();
        assert_eq!(loaded.original_title, result.original_title);
        assert_eq!(loaded.status, ProcessingStatus::Completed);
    }

    #[test]
    fn test_insert_batch_counts() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();

        let results = vec![
            sample_result("batch_test_title_0000"),
            sample_result("batch_test_title_0001"),
        ];
        let (inserted, failed) = store.insert_batch(&results);
        assert_eq!(inserted, 2);
        assert_eq!(failed, 0);
    }

    #[test]
    fn test_load_missing_is_error() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        assert!(store.load("nope").is_err());
    }
}
