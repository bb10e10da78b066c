//! Append-only trade log entries.

use chrono::NaiveDate;

/// One capital/position change recorded by a model. The log is only ever
/// appended to; `capital_after` and `shares_after` snapshot the account
/// immediately after the change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub price: f64,
    pub interest_rate: f64,
    pub delta_shares: f64,
    pub capital_after: f64,
    pub shares_after: f64,
}
