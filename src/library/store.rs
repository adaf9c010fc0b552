//! Pattern store access
//!
//! The store is a JSON document collection on disk: one file holding an
//! array of pattern documents. The runtime opens it once at startup
//! (failing fast if unreachable) and reads it into memory; the only
//! write path is the best-effort counter merge.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::core::error::{ParserError, Result};
use crate::library::records::PatternRecord;

/// Environment variable naming the store location.
pub const STORE_URI_ENV: &str = "PATTERN_STORE_URI";

/// Outcome of a pattern application, queued for the counter merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOutcome {
    Success,
    Failure,
}

/// One queued counter increment.
#[derive(Debug, Clone)]
pub struct CounterEvent {
    pub pattern_id: String,
    pub outcome: CounterOutcome,
}

/// On-disk pattern document collection.
#[derive(Debug)]
pub struct PatternStore {
    path: Option<PathBuf>,
    records: Vec<PatternRecord>,
}

impl PatternStore {
    /// Open the store at `path`, failing fast with a descriptive error
    /// when the file is missing or malformed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| ParserError::StoreUnreachable {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let records: Vec<PatternRecord> =
            serde_json::from_str(&content).map_err(|e| ParserError::StoreUnreachable {
                path: path.clone(),
                message: format!("invalid document collection: {e}"),
            })?;

        info!(
            store = %path.display(),
            records = records.len(),
            "pattern store opened"
        );

        Ok(PatternStore {
            path: Some(path),
            records,
        })
    }

    /// Resolve the store location from `PATTERN_STORE_URI`.
    pub fn path_from_env() -> Option<PathBuf> {
        std::env::var(STORE_URI_ENV).ok().map(PathBuf::from)
    }

    /// Build an in-memory store (tests, seeding).
    pub fn from_records(records: Vec<PatternRecord>) -> Self {
        PatternStore {
            path: None,
            records,
        }
    }

    /// All records, active or not.
    pub fn records(&self) -> &[PatternRecord] {
        &self.records
    }

    /// Active records only.
    pub fn active_records(&self) -> impl Iterator<Item = &PatternRecord> {
        self.records.iter().filter(|r| r.active)
    }

    /// Write the collection back to disk (or to an explicit path for
    /// in-memory stores).
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Merge queued counter increments into the documents and persist.
    ///
    /// This is telemetry: failures are logged and swallowed so they can
    /// never affect extraction.
    pub fn apply_counters(&mut self, events: &[CounterEvent]) {
        if events.is_empty() {
            return;
        }
        for event in events {
            if let Some(record) = self.records.iter_mut().find(|r| r.id == event.pattern_id) {
                match event.outcome {
                    CounterOutcome::Success => record.success_count += 1,
                    CounterOutcome::Failure => record.failure_count += 1,
                }
                record.updated_at = Some(chrono::Utc::now());
            }
        }
        if let Some(path) = self.path.clone() {
            if let Err(e) = self.save_to(&path) {
                warn!(store = %path.display(), error = %e, "counter merge write failed");
            }
        }
    }
}

/// Append-only queue of counter events, drained out-of-band.
///
/// Workers push fire-and-forget increments; the orchestrator drains the
/// queue after a batch and hands it to [`PatternStore::apply_counters`].
#[derive(Debug, Default)]
pub struct CounterQueue {
    events: Mutex<Vec<CounterEvent>>,
}

impl CounterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, pattern_id: &str, outcome: CounterOutcome) {
        if let Ok(mut events) = self.events.lock() {
            events.push(CounterEvent {
                pattern_id: pattern_id.to_string(),
                outcome,
            });
        }
    }

    pub fn drain(&self) -> Vec<CounterEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::records::PatternKind;
    use tempfile::TempDir;

    fn sample_records() -> Vec<PatternRecord> {
        vec![
            PatternRecord::new("geo_europe", PatternKind::GeographicEntity, "Europe")
                .with_priority(2),
            PatternRecord::new("geo_apac", PatternKind::GeographicEntity, "Asia Pacific")
                .with_aliases(["APAC"])
                .with_priority(2),
        ]
    }

    #[test]
    fn test_open_missing_store_fails_fast() {
        let err = PatternStore::open("/nonexistent/patterns.json").unwrap_err();
        assert!(matches!(err, ParserError::StoreUnreachable { .. }));
    }

    #[test]
    fn test_open_malformed_store_fails_fast() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, "{ not a collection }").unwrap();

        let err = PatternStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("invalid document collection"));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store").join("patterns.json");

        let store = PatternStore::from_records(sample_records());
        store.save_to(&path).unwrap();

        let reopened = PatternStore::open(&path).unwrap();
        assert_eq!(reopened.records().len(), 2);
        assert_eq!(reopened.records()[1].aliases, vec!["APAC"]);
    }

    #[test]
    fn test_apply_counters_merges() {
        let mut store = PatternStore::from_records(sample_records());
        store.apply_counters(&[
            CounterEvent {
                pattern_id: "geo_europe".to_string(),
                outcome: CounterOutcome::Success,
            },
            CounterEvent {
                pattern_id: "geo_europe".to_string(),
                outcome: CounterOutcome::Success,
            },
            CounterEvent {
                pattern_id: "geo_apac".to_string(),
                outcome: CounterOutcome::Failure,
            },
            // Unknown ids are ignored, not errors
            CounterEvent {
                pattern_id: "missing".to_string(),
                outcome: CounterOutcome::Success,
            },
        ]);

        assert_eq!(store.records()[0].success_count, 2);
        assert_eq!(store.records()[1].failure_count, 1);
        assert!(store.records()[0].updated_at.is_some());
    }

    #[test]
    fn test_counter_queue_drain() {
        let queue = CounterQueue::new();
        assert!(queue.is_empty());

        queue.record("geo_europe", CounterOutcome::Success);
        queue.record("geo_apac", CounterOutcome::Failure);
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
        assert_eq!(drained[0].pattern_id, "geo_europe");
    }
}
