//! Returns aggregation: from a pile of window outcomes to summary statistics.

use serde::Serialize;

use super::error::RetsweepError;
use super::model::WindowOutcome;

/// Bin count for the return histogram used by the mode estimate.
pub const HISTOGRAM_BINS: usize = 45;

/// Summary statistics over one model configuration's window outcomes.
/// Derived, read-only; recomputed from the outcome collection each time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub sample_size: usize,
    pub time_span: f64,
    pub model_name: String,
    pub mean_total_returns: f64,
    pub mean_yearly_returns: f64,
    pub median_total_returns: f64,
    pub median_yearly_returns: f64,
    pub sdev_total_returns: f64,
    pub sdev_yearly_returns: f64,
    pub fraction_losing: f64,
    pub mode_total_returns: f64,
    pub mode_yearly_returns: f64,
}

/// Summarize a batch of outcomes sharing one nominal window length.
pub fn summarize(outcomes: &[WindowOutcome]) -> Result<AggregateSummary, RetsweepError> {
    if outcomes.is_empty() {
        return Err(RetsweepError::EmptySample);
    }

    let totals: Vec<f64> = outcomes.iter().map(|o| o.frac_return).collect();
    let yearlies: Vec<f64> = outcomes.iter().map(|o| o.yearly_return_rate).collect();

    let losing = totals.iter().filter(|&&r| r < 0.0).count();

    Ok(AggregateSummary {
        sample_size: outcomes.len(),
        time_span: outcomes[0].span_years.round(),
        model_name: outcomes[0].model_label.clone(),
        mean_total_returns: mean(&totals),
        mean_yearly_returns: mean(&yearlies),
        median_total_returns: median(&totals),
        median_yearly_returns: median(&yearlies),
        sdev_total_returns: stddev(&totals),
        sdev_yearly_returns: stddev(&yearlies),
        fraction_losing: losing as f64 / outcomes.len() as f64,
        mode_total_returns: histogram_mode(&totals),
        mode_yearly_returns: histogram_mode(&yearlies),
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Population standard deviation.
fn stddev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mode estimate from a fixed-bin histogram.
///
/// Buckets the values into equal-width bins over the observed range, finds
/// the adjacent pair of bins with the highest combined count, and reports
/// the edge shared by that pair. The two-bin midpoint quantizes less
/// harshly than a single bin center.
fn histogram_mode(values: &[f64]) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return min;
    }

    let width = (max - min) / HISTOGRAM_BINS as f64;
    let mut counts = [0usize; HISTOGRAM_BINS];
    for &v in values {
        let bin = (((v - min) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }

    let mut best_pair = 0usize;
    let mut best_count = 0usize;
    for i in 0..HISTOGRAM_BINS - 1 {
        let combined = counts[i] + counts[i + 1];
        if combined > best_count {
            best_count = combined;
            best_pair = i;
        }
    }

    min + (best_pair + 1) as f64 * width
}
