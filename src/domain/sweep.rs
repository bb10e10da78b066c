//! Sweep runner: slides the evaluation window across the whole series.

use chrono::Duration;

use super::driver;
use super::error::RetsweepError;
use super::model::{TradingModel, WindowOutcome};
use super::observation::PriceSeries;
use super::{DAYS_PER_YEAR, STRIDE_DAYS};

/// Outcomes of one sweep plus the count of windows that failed to replay.
/// Failed windows are excluded, never synthesized; one bad window must not
/// invalidate the whole sweep.
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub outcomes: Vec<WindowOutcome>,
    pub failed_windows: usize,
}

/// Run `model` over every window of `window_years` that fits in the series,
/// advancing the start date by the stride each time. Windows are independent:
/// the model is re-configured from scratch for each one.
pub fn run_sweep(
    model: &mut dyn TradingModel,
    series: &PriceSeries,
    window_years: i64,
) -> Result<SweepResult, RetsweepError> {
    let first = series.first().ok_or_else(|| RetsweepError::Data {
        reason: "cannot sweep an empty series".into(),
    })?;
    let last_date = series
        .last()
        .map(|o| o.date)
        .unwrap_or(first.date);

    let window = Duration::days(window_years * DAYS_PER_YEAR);
    let stride = Duration::days(STRIDE_DAYS);

    let mut outcomes = Vec::new();
    let mut failed_windows = 0usize;
    let mut start = first.date;

    while start + window < last_date {
        match driver::run(model, series, start, window_years) {
            Ok(outcome) => outcomes.push(outcome),
            Err(
                RetsweepError::IncompleteWindow { .. }
                | RetsweepError::NonPositivePrice { .. },
            ) => failed_windows += 1,
            // Configuration problems affect every window alike: abort.
            Err(e) => return Err(e),
        }
        start += stride;
    }

    Ok(SweepResult {
        outcomes,
        failed_windows,
    })
}
