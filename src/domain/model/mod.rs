//! Trading-model state machines.
//!
//! A model replays one evaluation window: it enters the market once, applies a
//! variant-specific periodic rule while the window is open, and liquidates once
//! the window ends. Every capital or share change is appended to the model's
//! own trade log. Variants are selected by [`ModelSpec`], not by subclassing,
//! so new strategies never touch the driver.

pub mod buy_hold;
pub mod insurance;
pub mod rebalance;

use chrono::{Duration, NaiveDate};

pub use buy_hold::BuyHold;
pub use insurance::LossTriggeredOverlay;
pub use rebalance::PeriodicRebalance;

use super::error::RetsweepError;
use super::observation::Observation;
use super::trade::Trade;
use super::DAYS_PER_YEAR;

/// Lifecycle of one configured window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unconfigured,
    AwaitingEntry,
    InWindow,
    Closed,
}

/// Which transition `advance` should take for a given date. At most one
/// trigger fires per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Entry,
    Daily,
    Exit,
    Idle,
}

/// Return outcome of one completed window replay.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOutcome {
    pub start_date: NaiveDate,
    pub frac_return: f64,
    pub yearly_return_rate: f64,
    pub span_years: f64,
    pub model_label: String,
}

/// Annualized compounding rate for a total growth multiple over a span.
///
/// Defined as 0 for a non-positive multiple (loss of 100% or more) and for a
/// non-positive span, since neither has a well-defined compounding rate.
pub fn yearly_return(multiple: f64, years: f64) -> f64 {
    if multiple <= 0.0 || years <= 0.0 {
        return 0.0;
    }
    (multiple.ln() / years).exp() - 1.0
}

/// Capital, position, and trigger state shared by every model variant.
///
/// Owns the append-only trade log for exactly one window at a time;
/// `configure` resets it for reuse.
#[derive(Debug, Clone)]
pub struct Account {
    pub initial_capital: f64,
    pub capital: f64,
    pub shares: f64,
    pub trades: Vec<Trade>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    entry_pending: bool,
    exit_pending: bool,
    phase: Phase,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        Account {
            initial_capital,
            capital: initial_capital,
            shares: 0.0,
            trades: Vec::new(),
            start_date: epoch,
            end_date: epoch,
            entry_pending: false,
            exit_pending: false,
            phase: Phase::Unconfigured,
        }
    }

    /// Reset to a clean state for a new window. Idempotent.
    pub fn configure(
        &mut self,
        start_date: NaiveDate,
        window_years: i64,
    ) -> Result<(), RetsweepError> {
        if window_years <= 0 {
            return Err(RetsweepError::InvalidConfiguration {
                reason: format!("window_years must be positive, got {window_years}"),
            });
        }
        if self.initial_capital <= 0.0 {
            return Err(RetsweepError::InvalidConfiguration {
                reason: format!(
                    "initial capital must be positive, got {}",
                    self.initial_capital
                ),
            });
        }
        self.capital = self.initial_capital;
        self.shares = 0.0;
        self.trades.clear();
        self.start_date = start_date;
        self.end_date = start_date + Duration::days(window_years * DAYS_PER_YEAR);
        self.entry_pending = true;
        self.exit_pending = true;
        self.phase = Phase::AwaitingEntry;
        Ok(())
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn classify(&self, date: NaiveDate) -> Step {
        if self.phase == Phase::Unconfigured {
            return Step::Idle;
        }
        let in_window = date >= self.start_date && date < self.end_date;
        if in_window && self.entry_pending {
            Step::Entry
        } else if in_window && !self.entry_pending && self.exit_pending {
            Step::Daily
        } else if date >= self.end_date && self.exit_pending {
            Step::Exit
        } else {
            Step::Idle
        }
    }

    fn fire_entry(&mut self) {
        self.entry_pending = false;
        self.phase = Phase::InWindow;
    }

    fn fire_exit(&mut self) {
        self.exit_pending = false;
        self.phase = Phase::Closed;
    }

    /// Trade `delta_shares` at the observed price and log the change.
    fn execute(&mut self, obs: &Observation, delta_shares: f64) -> Result<(), RetsweepError> {
        if obs.price <= 0.0 {
            return Err(RetsweepError::NonPositivePrice {
                date: obs.date,
                price: obs.price,
            });
        }
        self.capital -= delta_shares * obs.price;
        self.shares += delta_shares;
        self.trades.push(Trade {
            date: obs.date,
            price: obs.price,
            interest_rate: obs.interest_rate,
            delta_shares,
            capital_after: self.capital,
            shares_after: self.shares,
        });
        Ok(())
    }

    /// Change the cash balance without trading shares (insurance payouts)
    /// and log a zero-share entry.
    fn adjust_capital(&mut self, obs: &Observation, amount: f64) -> Result<(), RetsweepError> {
        if obs.price <= 0.0 {
            return Err(RetsweepError::NonPositivePrice {
                date: obs.date,
                price: obs.price,
            });
        }
        self.capital += amount;
        self.trades.push(Trade {
            date: obs.date,
            price: obs.price,
            interest_rate: obs.interest_rate,
            delta_shares: 0.0,
            capital_after: self.capital,
            shares_after: self.shares,
        });
        Ok(())
    }

    /// Compound interest on the cash balance for the whole days elapsed
    /// since `anchor`, at the observation's annual rate.
    fn accrue_interest(&mut self, obs: &Observation, anchor: NaiveDate) {
        let days = (obs.date - anchor).num_days();
        if days <= 0 || 1.0 + obs.interest_rate <= 0.0 {
            return;
        }
        self.capital *= (1.0 + obs.interest_rate).powf(days as f64 / DAYS_PER_YEAR as f64);
    }

    /// The window's return, valid only once the exit trigger has fired.
    fn total_return(&self, label: String) -> Result<WindowOutcome, RetsweepError> {
        if self.phase != Phase::Closed || self.trades.len() < 2 {
            return Err(RetsweepError::IncompleteWindow {
                start_date: self.start_date,
                reason: format!(
                    "phase {:?} with {} trades, need a closed window with at least 2",
                    self.phase,
                    self.trades.len()
                ),
            });
        }
        let first = &self.trades[0];
        let last = &self.trades[self.trades.len() - 1];
        let frac_return = (self.capital - self.initial_capital) / self.initial_capital;
        let span_years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR as f64;
        Ok(WindowOutcome {
            start_date: self.start_date,
            frac_return,
            yearly_return_rate: yearly_return(1.0 + frac_return, span_years),
            span_years,
            model_label: label,
        })
    }
}

/// Retarget the stock allocation to `stock_frac` of total value, after
/// accruing interest on cash since `anchor`. Shared by the rebalanced
/// variants; returns nothing because the trade lands in the account log.
fn rebalance_to_target(
    account: &mut Account,
    obs: &Observation,
    stock_frac: f64,
    anchor: NaiveDate,
) -> Result<(), RetsweepError> {
    if obs.price <= 0.0 {
        return Err(RetsweepError::NonPositivePrice {
            date: obs.date,
            price: obs.price,
        });
    }
    account.accrue_interest(obs, anchor);
    let total = account.capital + account.shares * obs.price;
    let delta = stock_frac * total / obs.price - account.shares;
    account.execute(obs, delta)
}

/// The contract every strategy fulfils. One instance replays one window at a
/// time; `configure` makes it reusable for the next.
pub trait TradingModel {
    /// Arm the entry/exit triggers for a fresh window.
    fn configure(&mut self, start_date: NaiveDate, window_years: i64)
        -> Result<(), RetsweepError>;

    /// Process one observation. The returned date, if any, is a skip hint:
    /// no transition can occur strictly before it, so the driver may fast
    /// forward.
    fn advance(&mut self, obs: &Observation) -> Result<Option<NaiveDate>, RetsweepError>;

    /// The window's outcome; fails until the window has closed.
    fn total_return(&self) -> Result<WindowOutcome, RetsweepError>;

    /// Human-readable label, derived purely from the parameters.
    fn label(&self) -> String;
}

/// Tagged strategy configuration. Building a model from a spec is the only
/// way the rest of the system selects a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSpec {
    BuyHold,
    Rebalance {
        bond_frac: f64,
        rebalance_period_days: i64,
    },
    Insurance {
        insurance_frac: f64,
        deductible: f64,
        payout_factor: f64,
        rebalance_period_days: i64,
        loss_window: usize,
    },
}

impl ModelSpec {
    /// Label formatting is a pure function of the parameters, computed fresh
    /// each time; it never accumulates across configure calls.
    pub fn label(&self) -> String {
        match self {
            ModelSpec::BuyHold => "Buy_Hold".to_string(),
            ModelSpec::Rebalance {
                bond_frac,
                rebalance_period_days,
            } => format!("Kelly_{bond_frac}_{rebalance_period_days}"),
            ModelSpec::Insurance {
                insurance_frac,
                deductible,
                rebalance_period_days,
                ..
            } => format!("Insurance_{insurance_frac}_{deductible}_{rebalance_period_days}"),
        }
    }

    pub fn build(&self, initial_capital: f64) -> Box<dyn TradingModel + Send> {
        match *self {
            ModelSpec::BuyHold => Box::new(BuyHold::new(initial_capital)),
            ModelSpec::Rebalance {
                bond_frac,
                rebalance_period_days,
            } => Box::new(PeriodicRebalance::new(
                initial_capital,
                bond_frac,
                rebalance_period_days,
            )),
            ModelSpec::Insurance {
                insurance_frac,
                deductible,
                payout_factor,
                rebalance_period_days,
                loss_window,
            } => Box::new(LossTriggeredOverlay::new(
                initial_capital,
                insurance_frac,
                deductible,
                payout_factor,
                rebalance_period_days,
                loss_window,
            )),
        }
    }
}
