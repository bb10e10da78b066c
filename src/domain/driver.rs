//! Window driver: replays one model across one evaluation window.

use chrono::NaiveDate;

use super::error::RetsweepError;
use super::lookahead_padding;
use super::model::{TradingModel, WindowOutcome};
use super::observation::PriceSeries;

/// Replay `model` over the window starting at `start_date`.
///
/// The walk begins a padding's worth of days before the window so periodic
/// models can anchor their first rebalance even when `start_date` falls
/// between sample points. Skip hints returned by the model move the cursor
/// forward past observations that cannot cause a transition; the cursor
/// never moves backward.
pub fn run(
    model: &mut dyn TradingModel,
    series: &PriceSeries,
    start_date: NaiveDate,
    window_years: i64,
) -> Result<WindowOutcome, RetsweepError> {
    model.configure(start_date, window_years)?;

    let end_date = start_date + chrono::Duration::days(window_years * super::DAYS_PER_YEAR);
    let mut cursor = start_date - lookahead_padding();

    for obs in series.observations() {
        if obs.date < cursor {
            continue;
        }
        if let Some(hint) = model.advance(obs)? {
            if hint > cursor {
                cursor = hint;
            }
        }
        if obs.date >= end_date {
            break;
        }
    }

    // If the series ran out before the exit trigger fired this reports
    // IncompleteWindow; a partial window never becomes an outcome.
    model.total_return()
}
