//! Timestamp bundles for report headers and identifiers
//!
//! Every output artifact carries both a Pacific-time and a UTC
//! timestamp; batch identifiers use a UTC timestamp at microsecond
//! resolution.

use chrono::{DateTime, Utc};
use chrono_tz::America::Los_Angeles;

/// A pair of formatted timestamps plus a filesystem-safe stamp.
#[derive(Debug, Clone)]
pub struct TimestampBundle {
    /// Pacific time, e.g. "2026-08-01 09:15:42 PDT"
    pub pacific: String,
    /// UTC, e.g. "2026-08-01 16:15:42 UTC"
    pub utc: String,
    /// Filesystem-safe stamp in Pacific time, e.g. "20260801_091542"
    pub filename: String,
    /// The instant the bundle was captured
    pub instant: DateTime<Utc>,
}

impl TimestampBundle {
    /// Capture the current instant.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Build a bundle for a specific instant (used by deterministic tests).
    pub fn at(instant: DateTime<Utc>) -> Self {
        let pacific = instant.with_timezone(&Los_Angeles);
        TimestampBundle {
            pacific: pacific.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
            utc: instant.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            filename: pacific.format("%Y%m%d_%H%M%S").to_string(),
            instant,
        }
    }

    /// Batch identifier stamp at microsecond resolution (UTC).
    pub fn batch_stamp(&self) -> String {
        self.instant.format("%Y%m%d_%H%M%S_%6f").to_string()
    }

    /// Date components for the outputs/YYYY/MM/DD directory layout.
    pub fn date_parts(&self) -> (String, String, String) {
        let pacific = self.instant.with_timezone(&Los_Angeles);
        (
            pacific.format("%Y").to_string(),
            pacific.format("%m").to_string(),
            pacific.format("%d").to_string(),
        )
    }
}
