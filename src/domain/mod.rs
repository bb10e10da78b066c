//! Core domain types and logic.

pub mod observation;
pub mod trade;
pub mod model;
pub mod driver;
pub mod sweep;
pub mod aggregate;
pub mod error;

use chrono::Duration;

/// Days between consecutive window start dates in a sweep.
pub const STRIDE_DAYS: i64 = 3;

/// Buffer subtracted from every skip hint so the driver still visits the
/// observations just before a trigger boundary (2 x the sampling stride).
pub fn lookahead_padding() -> Duration {
    Duration::days(2 * STRIDE_DAYS)
}

/// Nominal year length used for window arithmetic.
pub const DAYS_PER_YEAR: i64 = 365;
