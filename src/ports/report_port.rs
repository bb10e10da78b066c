//! Results persistence port trait.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::domain::aggregate::AggregateSummary;
use crate::domain::error::RetsweepError;
use crate::domain::model::WindowOutcome;

/// Port for persisting sweep outcomes and their aggregate summaries.
/// Returns the path written so callers can report it.
pub trait ReportPort {
    /// One CSV of window outcomes for a single (window length, model) run.
    fn write_outcomes(
        &self,
        window_years: i64,
        label: &str,
        outcomes: &[WindowOutcome],
    ) -> Result<PathBuf, RetsweepError>;

    /// One summary row per window length for a single model.
    fn write_summary(
        &self,
        label: &str,
        summaries: &[AggregateSummary],
    ) -> Result<PathBuf, RetsweepError>;

    /// Raw outcome vectors keyed by window length, for downstream tooling.
    fn write_outcomes_json(
        &self,
        label: &str,
        by_period: &BTreeMap<i64, Vec<WindowOutcome>>,
    ) -> Result<PathBuf, RetsweepError>;
}
