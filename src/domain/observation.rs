//! Market observations and the read-only price series.

use chrono::NaiveDate;

use super::error::RetsweepError;

/// One sampled point of the market: closing price plus the prevailing
/// annual interest rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub price: f64,
    pub interest_rate: f64,
}

/// A date-sorted sequence of observations, shared read-only by every
/// window replay.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    fields: Vec<String>,
    observations: Vec<Observation>,
}

impl PriceSeries {
    /// Build a series from loader output. Observations must be
    /// non-decreasing in date.
    pub fn new(
        fields: Vec<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, RetsweepError> {
        for pair in observations.windows(2) {
            if pair[1].date < pair[0].date {
                return Err(RetsweepError::Data {
                    reason: format!(
                        "series not sorted: {} follows {}",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }
        Ok(Self {
            fields,
            observations,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(y: i32, m: u32, d: u32, price: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            price,
            interest_rate: 0.02,
        }
    }

    #[test]
    fn sorted_series_accepted() {
        let series = PriceSeries::new(
            vec!["Date".into(), "Close".into(), "Rate".into()],
            vec![obs(2020, 1, 1, 100.0), obs(2020, 1, 2, 101.0)],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().unwrap().price, 100.0);
        assert_eq!(series.last().unwrap().price, 101.0);
    }

    #[test]
    fn duplicate_dates_accepted() {
        // Non-decreasing, not strictly increasing.
        let series = PriceSeries::new(
            vec![],
            vec![obs(2020, 1, 1, 100.0), obs(2020, 1, 1, 100.5)],
        );
        assert!(series.is_ok());
    }

    #[test]
    fn unsorted_series_rejected() {
        let result = PriceSeries::new(
            vec![],
            vec![obs(2020, 1, 2, 101.0), obs(2020, 1, 1, 100.0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_series() {
        let series = PriceSeries::new(vec![], vec![]).unwrap();
        assert!(series.is_empty());
        assert!(series.first().is_none());
        assert!(series.last().is_none());
    }
}
