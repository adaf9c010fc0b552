//! Pattern library access
//!
//! Read-only typed views over the pattern store. The store is read once
//! per process; every regex source is compiled exactly once here, and
//! sources that fail to compile are dropped with a warning instead of
//! crashing a batch. Stages receive the library by reference and never
//! touch the store directly.
//!
//! # Architecture
//!
//! - `records`: the typed document shape
//! - `store`: on-disk JSON collection + counter queue
//! - `seed`: the default working record set
//! - `PatternLibrary` (this file): immutable per-kind tables with
//!   (priority asc, term length desc) ordering precomputed

pub mod records;
pub mod seed;
pub mod store;

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use tracing::warn;

pub use records::{DictionarySubtype, PatternKind, PatternRecord};
pub use store::{CounterEvent, CounterOutcome, CounterQueue, PatternStore, STORE_URI_ENV};

/// A pattern record together with its compiled matcher (when the record
/// carries a regex source).
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub record: PatternRecord,
    pub regex: Option<Regex>,
}

impl CompiledPattern {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn term(&self) -> &str {
        &self.record.term
    }
}

/// Diagnostic entry for a pattern whose regex source failed to compile.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    pub pattern_id: String,
    pub term: String,
    pub source: String,
    pub message: String,
}

/// Immutable, pre-sorted views of the active patterns per kind.
#[derive(Debug)]
pub struct PatternLibrary {
    by_kind: HashMap<PatternKind, Vec<CompiledPattern>>,
    compile_failures: Vec<CompileFailure>,
    counters: CounterQueue,
}

/// Compile a pattern source case-insensitively, the single compilation
/// point for the whole crate.
pub fn compile_insensitive(source: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

impl PatternLibrary {
    /// Load every active record from the store into typed tables.
    ///
    /// Unparseable regex sources are dropped with a warning and recorded
    /// in [`compile_failures`](Self::compile_failures); callers only ever
    /// see valid patterns.
    pub fn load(store: &PatternStore) -> Self {
        let mut by_kind: HashMap<PatternKind, Vec<CompiledPattern>> = HashMap::new();
        let mut compile_failures = Vec::new();

        for record in store.active_records() {
            let regex = match &record.pattern {
                Some(source) => match compile_insensitive(source) {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!(
                            pattern = %record.id,
                            term = %record.term,
                            error = %e,
                            "dropping pattern with invalid regex"
                        );
                        compile_failures.push(CompileFailure {
                            pattern_id: record.id.clone(),
                            term: record.term.clone(),
                            source: source.clone(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                },
                None => None,
            };

            by_kind
                .entry(record.kind)
                .or_default()
                .push(CompiledPattern {
                    record: record.clone(),
                    regex,
                });
        }

        // Priority ascending, longest term first within a priority tier.
        for patterns in by_kind.values_mut() {
            patterns.sort_by(|a, b| {
                a.record
                    .priority
                    .cmp(&b.record.priority)
                    .then(b.record.term.len().cmp(&a.record.term.len()))
            });
        }

        PatternLibrary {
            by_kind,
            compile_failures,
            counters: CounterQueue::new(),
        }
    }

    /// Active patterns of a kind, sorted (priority asc, term length desc).
    pub fn patterns(&self, kind: PatternKind) -> &[CompiledPattern] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dictionary entries of a given subtype, in table order.
    pub fn dictionary(&self, subtype: DictionarySubtype) -> Vec<&CompiledPattern> {
        self.patterns(PatternKind::ReportTypeDictionary)
            .iter()
            .filter(|p| p.record.subtype == Some(subtype))
            .collect()
    }

    /// Patterns of a kind narrowed by `format_type`.
    pub fn patterns_with_format(&self, kind: PatternKind, format_type: &str) -> Vec<&CompiledPattern> {
        self.patterns(kind)
            .iter()
            .filter(|p| p.record.format_type.as_deref() == Some(format_type))
            .collect()
    }

    /// Diagnostics for patterns dropped at load time.
    pub fn compile_failures(&self) -> &[CompileFailure] {
        &self.compile_failures
    }

    /// Total number of loaded (valid, active) patterns.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire-and-forget success increment for a pattern.
    pub fn record_success(&self, pattern_id: &str) {
        self.counters.record(pattern_id, CounterOutcome::Success);
    }

    /// Fire-and-forget failure increment for a pattern.
    pub fn record_failure(&self, pattern_id: &str) {
        self.counters.record(pattern_id, CounterOutcome::Failure);
    }

    /// Drain the pending counter events for an out-of-band store merge.
    pub fn drain_counters(&self) -> Vec<CounterEvent> {
        self.counters.drain()
    }
}
