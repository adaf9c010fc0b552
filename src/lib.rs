//! title_parser - Market-research title parsing pipeline
//!
//! This library parses market-research report titles into structured
//! components: a market-term classification, a forecast date range, a
//! report type, a set of geographic regions, and a residual topic. The
//! extraction runs as a five-stage ordered pipeline driven by a
//! versioned pattern library, with a confidence tracker and a batch
//! orchestrator on top.
//!
//! # Architecture
//!
//! This crate follows the "Library-First" pattern:
//! - **lib.rs** (this file): thin facade over the modules below
//! - **bin/mrtp.rs**: thin CLI wrapper that calls the library
//!
//! Modules:
//! - `core`: error types and shared models
//! - `library`: pattern store access, typed records, seed data
//! - `stages`: the five extraction stages plus the confidence tracker
//! - `pipeline`: orchestrator, persistence, report writing
//! - `util`: text normalization and timestamp helpers
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use title_parser::library::{seed, PatternLibrary, PatternStore};
//! use title_parser::pipeline::{PipelineConfig, PipelineOrchestrator};
//!
//! let store = PatternStore::from_records(seed::default_records());
//! let library = Arc::new(PatternLibrary::load(&store));
//! let pipeline = PipelineOrchestrator::new(library, PipelineConfig::default());
//!
//! let result = pipeline.process_title(
//!     "Global Artificial Intelligence Market Size & Share Report, 2030",
//!     "batch_demo",
//!     0,
//! );
//! assert_eq!(result.extracted.topic.as_deref(), Some("Artificial Intelligence"));
//! ```

pub mod core;
pub mod library;
pub mod pipeline;
pub mod stages;
pub mod util;

/// Crate version, exposed for the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export the types most callers need
pub use crate::core::{ExtractedElements, MarketTermClass, ParserError, ProcessingStatus, Result};
pub use crate::library::{PatternKind, PatternLibrary, PatternRecord, PatternStore};
pub use crate::pipeline::{BatchOutcome, PipelineConfig, PipelineOrchestrator, ProcessingResult};
