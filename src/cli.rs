//! CLI definition and dispatch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use crate::adapters::csv_report_adapter::{self, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::tsv_adapter::TsvMarketData;
use crate::domain::aggregate::{self, AggregateSummary};
use crate::domain::error::RetsweepError;
use crate::domain::model::{ModelSpec, WindowOutcome};
use crate::domain::observation::PriceSeries;
use crate::domain::sweep;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "retsweep", about = "Rolling-window investment strategy sweeps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configured model over every window length
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured window lengths, e.g. "1-15" or "1,2,5"
        #[arg(short, long)]
        years: Option<String>,
    },
    /// Re-aggregate previously written outcome files
    Summarize {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding returns_*.csv files (defaults to configured output)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Show the date range and shape of the configured data files
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Sweep {
            config,
            output,
            years,
        } => run_sweep_command(&config, output, years.as_deref()),
        Command::Summarize { config, dir } => run_summarize(&config, dir),
        Command::Info { config } => run_info(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RetsweepError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Parse a window-length spec like "1,2,3" or "1-15" (or a mix of both).
pub fn parse_years(raw: &str) -> Result<Vec<i64>, RetsweepError> {
    let invalid = |reason: String| RetsweepError::ConfigInvalid {
        section: "sweep".into(),
        key: "years".into(),
        reason,
    };
    let parse_one = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("{s:?} is not a whole number of years")))
    };

    let mut years = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((lo, hi)) = part.split_once('-') {
            let lo = parse_one(lo)?;
            let hi = parse_one(hi)?;
            if lo < 1 || hi < lo {
                return Err(invalid(format!("bad range {part:?}")));
            }
            years.extend(lo..=hi);
        } else {
            let y = parse_one(part)?;
            if y < 1 {
                return Err(invalid(format!("window length {y} must be at least 1")));
            }
            years.push(y);
        }
    }

    if years.is_empty() {
        return Err(invalid("no window lengths given".into()));
    }
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

fn parse_f64_list(
    raw: &str,
    section: &str,
    key: &str,
) -> Result<Vec<f64>, RetsweepError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| RetsweepError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("{s:?} is not a number"),
            })
        })
        .collect()
}

fn parse_i64_list(
    raw: &str,
    section: &str,
    key: &str,
) -> Result<Vec<i64>, RetsweepError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| RetsweepError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("{s:?} is not a whole number"),
            })
        })
        .collect()
}

pub fn build_data_port(config: &dyn ConfigPort) -> Result<TsvMarketData, RetsweepError> {
    let require = |key: &str| {
        config
            .get_string("data", key)
            .ok_or_else(|| RetsweepError::ConfigMissing {
                section: "data".into(),
                key: key.into(),
            })
    };
    let prices = PathBuf::from(require("prices")?);
    let interest = PathBuf::from(require("interest")?);
    let price_column = config.get_int("data", "price_column", 5);
    let interest_column = config.get_int("data", "interest_column", 1);
    Ok(TsvMarketData::new(
        prices,
        interest,
        price_column as usize,
        interest_column as usize,
    ))
}

/// Expand the [models] section (plus per-model parameter grids) into the
/// flat list of model configurations the sweep will run.
pub fn build_model_specs(config: &dyn ConfigPort) -> Result<Vec<ModelSpec>, RetsweepError> {
    let mut specs = Vec::new();

    if config.get_bool("models", "buy_hold", true) {
        specs.push(ModelSpec::BuyHold);
    }

    if config.get_bool("models", "rebalance", false) {
        let fracs = config
            .get_string("rebalance", "bond_fracs")
            .unwrap_or_else(|| "0.1,0.2,0.3,0.4,0.5".into());
        let periods = config
            .get_string("rebalance", "periods")
            .unwrap_or_else(|| "90".into());
        for &period in &parse_i64_list(&periods, "rebalance", "periods")? {
            for &frac in &parse_f64_list(&fracs, "rebalance", "bond_fracs")? {
                specs.push(ModelSpec::Rebalance {
                    bond_frac: frac,
                    rebalance_period_days: period,
                });
            }
        }
    }

    if config.get_bool("models", "insurance", false) {
        let fracs = config
            .get_string("insurance", "fracs")
            .unwrap_or_else(|| "0.1".into());
        let deductibles = config
            .get_string("insurance", "deductibles")
            .unwrap_or_else(|| "0.15".into());
        let periods = config
            .get_string("insurance", "periods")
            .unwrap_or_else(|| "90".into());
        let payout_factor = config.get_double("insurance", "payout_factor", 10.0);
        let loss_window = config.get_int("insurance", "loss_window", 6);
        if loss_window < 2 {
            return Err(RetsweepError::ConfigInvalid {
                section: "insurance".into(),
                key: "loss_window".into(),
                reason: "loss window needs at least two observations".into(),
            });
        }
        for &period in &parse_i64_list(&periods, "insurance", "periods")? {
            for &deductible in &parse_f64_list(&deductibles, "insurance", "deductibles")? {
                for &frac in &parse_f64_list(&fracs, "insurance", "fracs")? {
                    specs.push(ModelSpec::Insurance {
                        insurance_frac: frac,
                        deductible,
                        payout_factor,
                        rebalance_period_days: period,
                        loss_window: loss_window as usize,
                    });
                }
            }
        }
    }

    Ok(specs)
}

fn run_tag() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    match chrono::DateTime::from_timestamp(secs as i64, 0) {
        Some(dt) => dt.format("%Y%m%d_%H%M%S").to_string(),
        None => secs.to_string(),
    }
}

fn load_series(config: &dyn ConfigPort) -> Result<PriceSeries, RetsweepError> {
    let data_port = build_data_port(config)?;
    data_port.load_series()
}

/// Sweep one model over every window length, writing outcomes as we go.
fn sweep_one_model(
    spec: &ModelSpec,
    series: &PriceSeries,
    years: &[i64],
    initial_capital: f64,
    reporter: &CsvReportAdapter,
) -> Result<(), RetsweepError> {
    let label = spec.label();
    let mut summaries: Vec<AggregateSummary> = Vec::new();
    let mut by_period: BTreeMap<i64, Vec<WindowOutcome>> = BTreeMap::new();

    for &window_years in years {
        let mut model = spec.build(initial_capital);
        let result = sweep::run_sweep(model.as_mut(), series, window_years)?;

        eprintln!(
            "{label}: {window_years}y windows: {} outcomes, {} failed",
            result.outcomes.len(),
            result.failed_windows,
        );
        if result.outcomes.is_empty() {
            continue;
        }

        reporter.write_outcomes(window_years, &label, &result.outcomes)?;
        summaries.push(aggregate::summarize(&result.outcomes)?);
        by_period.insert(window_years, result.outcomes);
    }

    if summaries.is_empty() {
        eprintln!("{label}: no window length produced outcomes, nothing to summarize");
        return Ok(());
    }

    let summary_path = reporter.write_summary(&label, &summaries)?;
    eprintln!("{label}: summary written to {}", summary_path.display());
    reporter.write_outcomes_json(&label, &by_period)?;
    Ok(())
}

fn run_sweep_command(
    config_path: &Path,
    output_override: Option<PathBuf>,
    years_override: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let years_raw = match years_override {
        Some(y) => y.to_string(),
        None => config
            .get_string("sweep", "years")
            .unwrap_or_else(|| "1,2,3".to_string()),
    };
    let years = match parse_years(&years_raw) {
        Ok(y) => y,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let initial_capital = config.get_double("sweep", "initial_capital", 10_000.0);

    let specs = match build_model_specs(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if specs.is_empty() {
        eprintln!("error: no models enabled in [models]");
        return ExitCode::from(2);
    }

    let series = match load_series(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => {
            eprintln!(
                "Loaded {} observations, {} to {}",
                series.len(),
                first.date,
                last.date,
            );
        }
        _ => {
            eprintln!("error: data files contain no observations");
            return ExitCode::from(3);
        }
    }

    let out_dir = output_override.unwrap_or_else(|| {
        PathBuf::from(
            config
                .get_string("output", "directory")
                .unwrap_or_else(|| "./out_data".to_string()),
        )
    });
    let reporter = CsvReportAdapter::new(out_dir, run_tag());

    eprintln!(
        "Sweeping {} model configurations over {} window lengths",
        specs.len(),
        years.len(),
    );

    // One worker per model configuration; windows within a model stay
    // sequential so outcome files are written in window-length order.
    let worker_results: Vec<Result<(), RetsweepError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = specs
            .iter()
            .map(|spec| {
                let series = &series;
                let years = &years;
                let reporter = &reporter;
                scope.spawn(move || {
                    sweep_one_model(spec, series, years, initial_capital, reporter)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(_) => Err(RetsweepError::Data {
                    reason: "sweep worker panicked".into(),
                }),
            })
            .collect()
    });

    let mut exit = ExitCode::SUCCESS;
    let mut any_failed = false;
    for result in &worker_results {
        if let Err(e) = result {
            eprintln!("error: {e}");
            any_failed = true;
            exit = e.into();
        }
    }
    if !any_failed {
        eprintln!("Sweep complete: results in {}", reporter.out_dir().display());
    }
    exit
}

/// Group previously written outcome files by model suffix, keyed by the
/// window length baked into each file name.
fn collect_outcome_files(
    dir: &Path,
) -> Result<BTreeMap<String, BTreeMap<i64, Vec<WindowOutcome>>>, RetsweepError> {
    let mut grouped: BTreeMap<String, BTreeMap<i64, Vec<WindowOutcome>>> = BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(stem) = name
            .strip_prefix("returns_")
            .and_then(|s| s.strip_suffix(".csv"))
        else {
            continue;
        };
        // Stem is "{years}_{label}_{tag}".
        let Some((years_str, suffix)) = stem.split_once('_') else {
            continue;
        };
        let Ok(years) = years_str.parse::<i64>() else {
            continue;
        };

        let outcomes = csv_report_adapter::read_outcomes_csv(&entry.path())?;
        grouped
            .entry(suffix.to_string())
            .or_default()
            .insert(years, outcomes);
    }

    Ok(grouped)
}

fn run_summarize(config_path: &Path, dir_override: Option<PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = dir_override.unwrap_or_else(|| {
        PathBuf::from(
            config
                .get_string("output", "directory")
                .unwrap_or_else(|| "./out_data".to_string()),
        )
    });

    let grouped = match collect_outcome_files(&dir) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if grouped.is_empty() {
        eprintln!("No returns_*.csv files found in {}", dir.display());
        return ExitCode::from(5);
    }

    for (suffix, by_years) in &grouped {
        let mut summaries = Vec::new();
        for outcomes in by_years.values() {
            if outcomes.is_empty() {
                continue;
            }
            match aggregate::summarize(outcomes) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }
        if summaries.is_empty() {
            continue;
        }

        let path = dir.join(format!("summary_{suffix}.csv"));
        if let Err(e) = csv_report_adapter::write_summary_csv(&path, &summaries) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("{}: {} window lengths", path.display(), summaries.len());
    }

    ExitCode::SUCCESS
}

fn run_info(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let series = match load_series(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match (series.first(), series.last()) {
        (Some(first), Some(last)) => {
            println!("{} observations, {} to {}", series.len(), first.date, last.date);
            println!("fields: {}", series.fields().join(", "));
        }
        _ => {
            println!("no observations");
        }
    }
    ExitCode::SUCCESS
}
