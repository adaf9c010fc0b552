//! Core module for the market-research title parser
//!
//! This module provides the foundational types shared by the pattern
//! library, the extraction stages, and the pipeline orchestrator.
//!
//! # Architecture
//!
//! - `error`: Error types using thiserror
//! - `models`: Shared data structures (MarketTermClass, ProcessingStatus,
//!   ExtractedElements)

pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::{ParserError, Result};
pub use models::{ExtractedElements, MarketTermClass, ProcessingStatus, ResultFlag};
