//! # Tracking metrics
//!
//! Summaries of how well a simulated run followed its target.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::SimulationRecord;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of consecutive records which must be within tolerance for the run to count as settled.
pub const SETTLE_WINDOW: usize = 25;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MetricsError {
    #[error("Cannot compute a metric over an empty trace")]
    Empty,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Root mean square of the tracking error.
pub fn rmse(records: &[SimulationRecord]) -> Result<f64, MetricsError> {
    if records.is_empty() {
        return Err(MetricsError::Empty);
    }

    let sum_sq: f64 = records.iter().map(|r| r.error * r.error).sum();

    Ok((sum_sq / records.len() as f64).sqrt())
}

/// Largest magnitude of the tracking error.
pub fn max_abs_error(records: &[SimulationRecord]) -> Result<f64, MetricsError> {
    if records.is_empty() {
        return Err(MetricsError::Empty);
    }

    Ok(records.iter().map(|r| r.error.abs()).fold(0.0, f64::max))
}

/// Time of the first record from which [`SETTLE_WINDOW`] records in a row have an error within
/// `tolerance`.
///
/// Returns `None` if the run never settles or is shorter than the window.
pub fn settle_time(records: &[SimulationRecord], tolerance: f64) -> Option<f64> {
    if records.len() < SETTLE_WINDOW {
        return None;
    }

    (0..records.len() - SETTLE_WINDOW)
        .find(|&idx| {
            records[idx..idx + SETTLE_WINDOW]
                .iter()
                .all(|r| r.error.abs() <= tolerance)
        })
        .map(|idx| records[idx].t)
}
