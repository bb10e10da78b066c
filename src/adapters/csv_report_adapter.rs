//! CSV/JSON results adapter.
//!
//! File naming follows `returns_{years}_{label}_{tag}.csv` for raw window
//! outcomes, `summary_{label}_{tag}.csv` for aggregate rows, and
//! `total_returns_{label}_{tag}.json` for the raw outcome dump. The tag
//! distinguishes runs sharing one output directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::aggregate::AggregateSummary;
use crate::domain::error::RetsweepError;
use crate::domain::model::WindowOutcome;
use crate::ports::report_port::ReportPort;

const OUTCOME_HEADER: [&str; 5] = [
    "date",
    "frac_return",
    "yearly_return_rate",
    "time_span",
    "model_name",
];

pub struct CsvReportAdapter {
    out_dir: PathBuf,
    run_tag: String,
}

impl CsvReportAdapter {
    pub fn new(out_dir: PathBuf, run_tag: String) -> Self {
        Self { out_dir, run_tag }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn ensure_dir(&self) -> Result<(), RetsweepError> {
        fs::create_dir_all(&self.out_dir)?;
        Ok(())
    }
}

fn csv_err(path: &Path, e: csv::Error) -> RetsweepError {
    RetsweepError::Data {
        reason: format!("{}: {}", path.display(), e),
    }
}

/// Write one outcome row per window, dates as `YYYY-MM-DD`.
pub fn write_outcomes_csv(path: &Path, outcomes: &[WindowOutcome]) -> Result<(), RetsweepError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    wtr.write_record(OUTCOME_HEADER)
        .map_err(|e| csv_err(path, e))?;
    for o in outcomes {
        wtr.write_record([
            o.start_date.to_string(),
            o.frac_return.to_string(),
            o.yearly_return_rate.to_string(),
            o.span_years.to_string(),
            o.model_label.clone(),
        ])
        .map_err(|e| csv_err(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read back a file produced by [`write_outcomes_csv`].
pub fn read_outcomes_csv(path: &Path) -> Result<Vec<WindowOutcome>, RetsweepError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| csv_err(path, e))?;
    let mut outcomes = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| csv_err(path, e))?;
        let bad = |what: &str| RetsweepError::Data {
            reason: format!("{}: bad {} in row {:?}", path.display(), what, record),
        };
        let start_date = record
            .get(0)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| bad("date"))?;
        let parse = |i: usize, what: &str| {
            record
                .get(i)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| bad(what))
        };
        outcomes.push(WindowOutcome {
            start_date,
            frac_return: parse(1, "frac_return")?,
            yearly_return_rate: parse(2, "yearly_return_rate")?,
            span_years: parse(3, "time_span")?,
            model_label: record.get(4).ok_or_else(|| bad("model_name"))?.to_string(),
        });
    }
    Ok(outcomes)
}

/// Write aggregate rows, one per window length, via serde field names.
pub fn write_summary_csv(
    path: &Path,
    summaries: &[AggregateSummary],
) -> Result<(), RetsweepError> {
    let mut sorted = summaries.to_vec();
    sorted.sort_by(|a, b| a.time_span.total_cmp(&b.time_span));

    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    for row in &sorted {
        wtr.serialize(row).map_err(|e| csv_err(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_outcomes(
        &self,
        window_years: i64,
        label: &str,
        outcomes: &[WindowOutcome],
    ) -> Result<PathBuf, RetsweepError> {
        self.ensure_dir()?;
        let path = self
            .out_dir
            .join(format!("returns_{window_years}_{label}_{}.csv", self.run_tag));
        write_outcomes_csv(&path, outcomes)?;
        Ok(path)
    }

    fn write_summary(
        &self,
        label: &str,
        summaries: &[AggregateSummary],
    ) -> Result<PathBuf, RetsweepError> {
        self.ensure_dir()?;
        let path = self
            .out_dir
            .join(format!("summary_{label}_{}.csv", self.run_tag));
        write_summary_csv(&path, summaries)?;
        Ok(path)
    }

    fn write_outcomes_json(
        &self,
        label: &str,
        by_period: &BTreeMap<i64, Vec<WindowOutcome>>,
    ) -> Result<PathBuf, RetsweepError> {
        self.ensure_dir()?;
        let path = self
            .out_dir
            .join(format!("total_returns_{label}_{}.json", self.run_tag));

        let mut map = serde_json::Map::new();
        for (years, outcomes) in by_period {
            let rows: Vec<serde_json::Value> = outcomes
                .iter()
                .map(|o| {
                    json!([
                        o.start_date.to_string(),
                        o.frac_return,
                        o.yearly_return_rate,
                        o.span_years,
                        o.model_label,
                    ])
                })
                .collect();
            map.insert(years.to_string(), json!(rows));
        }
        let body = serde_json::to_string_pretty(&serde_json::Value::Object(map)).map_err(
            |e| RetsweepError::Data {
                reason: format!("{}: {}", path.display(), e),
            },
        )?;
        fs::write(&path, body)?;
        Ok(path)
    }
}
