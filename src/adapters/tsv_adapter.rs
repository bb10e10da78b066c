//! TSV market-data adapter.
//!
//! Reads an index price file (tab-separated, dates like `Jan 03, 2020`,
//! values with thousands separators) and a per-year interest-rate file
//! (tab-separated, year in the first column, percent strings elsewhere),
//! and joins them into one [`PriceSeries`] by calendar year.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};

use crate::domain::error::RetsweepError;
use crate::domain::observation::{Observation, PriceSeries};
use crate::ports::data_port::MarketDataPort;

const DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Debug)]
pub struct TsvMarketData {
    prices_path: PathBuf,
    interest_path: PathBuf,
    /// Column of the price file holding the closing price.
    price_column: usize,
    /// Column of the interest file holding the rate to use.
    interest_column: usize,
}

impl TsvMarketData {
    pub fn new(
        prices_path: PathBuf,
        interest_path: PathBuf,
        price_column: usize,
        interest_column: usize,
    ) -> Self {
        Self {
            prices_path,
            interest_path,
            price_column,
            interest_column,
        }
    }

    /// Year → annual rate, plus the header names past the year column.
    fn load_interest(&self) -> Result<(HashMap<i32, f64>, Vec<String>), RetsweepError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(&self.interest_path)
            .map_err(|e| RetsweepError::Data {
                reason: format!("failed to read {}: {}", self.interest_path.display(), e),
            })?;

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| RetsweepError::Data {
                reason: format!("interest header: {e}"),
            })?
            .iter()
            .skip(1)
            .map(str::to_string)
            .collect();

        let mut rates = HashMap::new();
        for result in rdr.records() {
            let record = result.map_err(|e| RetsweepError::Data {
                reason: format!("interest row: {e}"),
            })?;
            let year: i32 = field(&record, 0, "year")?.trim().parse().map_err(|e| {
                RetsweepError::Data {
                    reason: format!("invalid year: {e}"),
                }
            })?;
            let raw = field(&record, self.interest_column, "interest rate")?;
            let rate: f64 = raw
                .trim()
                .trim_end_matches('%')
                .parse()
                .map_err(|e| RetsweepError::Data {
                    reason: format!("invalid interest rate {raw:?}: {e}"),
                })?;
            rates.insert(year, rate / 100.0);
        }
        Ok((rates, header))
    }
}

fn field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'a str, RetsweepError> {
    record.get(index).ok_or_else(|| RetsweepError::Data {
        reason: format!("missing {name} column {index}"),
    })
}

/// Strip thousands separators before parsing, e.g. "3,257.85".
fn parse_grouped(raw: &str) -> Result<f64, RetsweepError> {
    raw.trim()
        .replace(',', "")
        .parse()
        .map_err(|e| RetsweepError::Data {
            reason: format!("invalid numeric value {raw:?}: {e}"),
        })
}

impl MarketDataPort for TsvMarketData {
    fn load_series(&self) -> Result<PriceSeries, RetsweepError> {
        let (rates, interest_header) = self.load_interest()?;

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(&self.prices_path)
            .map_err(|e| RetsweepError::Data {
                reason: format!("failed to read {}: {}", self.prices_path.display(), e),
            })?;

        let mut fields: Vec<String> = rdr
            .headers()
            .map_err(|e| RetsweepError::Data {
                reason: format!("price header: {e}"),
            })?
            .iter()
            .map(str::to_string)
            .collect();
        fields.extend(interest_header);

        let mut observations = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| RetsweepError::Data {
                reason: format!("price row: {e}"),
            })?;
            let date_str = field(&record, 0, "date")?;
            let date =
                NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT).map_err(|e| {
                    RetsweepError::Data {
                        reason: format!("invalid date {date_str:?}: {e}"),
                    }
                })?;
            let price = parse_grouped(field(&record, self.price_column, "price")?)?;
            let interest_rate =
                *rates
                    .get(&date.year())
                    .ok_or_else(|| RetsweepError::Data {
                        reason: format!("no interest rate for year {}", date.year()),
                    })?;
            observations.push(Observation {
                date,
                price,
                interest_rate,
            });
        }

        observations.sort_by_key(|o| o.date);
        PriceSeries::new(fields, observations)
    }
}
