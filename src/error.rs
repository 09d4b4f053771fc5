use crate::data::{Period, RegionId};
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the analysis core
///
/// `MalformedRecord` aborts a run. The others are local to one evaluation
/// and are reported next to the successful results.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("malformed record #{index}: {field} is not set")]
    MalformedRecord { index: usize, field: &'static str },

    #[error(
        "insufficient history for {region} at {period}: {available} non-outage periods in window, need at least 2"
    )]
    InsufficientHistory {
        region: RegionId,
        period: Period,
        available: usize,
    },

    #[error("correlation of '{series_a}' and '{series_b}' needs at least 2 paired samples, got {paired}")]
    SampleSize {
        series_a: String,
        series_b: String,
        paired: usize,
    },

    #[error("series '{series_a}' has {len_a} samples but '{series_b}' has {len_b}")]
    SeriesLengthMismatch {
        series_a: String,
        len_a: usize,
        series_b: String,
        len_b: usize,
    },
}

impl AnalysisError {
    pub fn insufficient_history(region: &RegionId, period: Period, available: usize) -> Self {
        AnalysisError::InsufficientHistory {
            region: region.clone(),
            period,
            available,
        }
    }

    /// Structural errors abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::MalformedRecord { .. })
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
