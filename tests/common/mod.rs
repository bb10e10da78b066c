#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use retsweep::domain::observation::{Observation, PriceSeries};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily series starting 2020-01-01, one observation per price.
pub fn series_from_prices(prices: &[f64], rate: f64) -> PriceSeries {
    let start = date(2020, 1, 1);
    let observations = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| Observation {
            date: start + Duration::days(i as i64),
            price,
            interest_rate: rate,
        })
        .collect();
    PriceSeries::new(vec!["Price".into(), "Rate".into()], observations).unwrap()
}

pub fn flat_series(days: usize, price: f64, rate: f64) -> PriceSeries {
    series_from_prices(&vec![price; days], rate)
}

/// Prices start at `start_price` and climb by `step` per day.
pub fn linear_series(days: usize, start_price: f64, step: f64, rate: f64) -> PriceSeries {
    let prices: Vec<f64> = (0..days).map(|i| start_price + step * i as f64).collect();
    series_from_prices(&prices, rate)
}
