//! Periodically rebalanced bond/stock mix.

use chrono::{Duration, NaiveDate};

use super::{rebalance_to_target, Account, Step, TradingModel, WindowOutcome};
use crate::domain::error::RetsweepError;
use crate::domain::lookahead_padding;
use crate::domain::observation::Observation;

/// Holds a fixed stock fraction, keeps the rest as interest-bearing cash, and
/// rebalances back to target once per period. Between rebalances nothing can
/// change, which is what makes the skip hint sound: the driver can jump
/// straight to the next rebalance date (minus padding).
#[derive(Debug, Clone)]
pub struct PeriodicRebalance {
    account: Account,
    bond_frac: f64,
    stock_frac: f64,
    period: Duration,
    last_rebalance: NaiveDate,
}

impl PeriodicRebalance {
    pub fn new(initial_capital: f64, bond_frac: f64, rebalance_period_days: i64) -> Self {
        PeriodicRebalance {
            account: Account::new(initial_capital),
            bond_frac,
            stock_frac: 1.0 - bond_frac,
            period: Duration::days(rebalance_period_days),
            last_rebalance: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    fn enter(&mut self, obs: &Observation) -> Result<(), RetsweepError> {
        if obs.price <= 0.0 {
            return Err(RetsweepError::NonPositivePrice {
                date: obs.date,
                price: obs.price,
            });
        }
        let delta = self.stock_frac * self.account.capital / obs.price;
        self.account.execute(obs, delta)
    }

    fn exit(&mut self, obs: &Observation) -> Result<(), RetsweepError> {
        // Settle accrued interest on cash before liquidating.
        self.account.accrue_interest(obs, self.last_rebalance);
        let delta = -self.account.shares;
        self.account.execute(obs, delta)
    }

    fn rebalance(&mut self, obs: &Observation) -> Result<(), RetsweepError> {
        rebalance_to_target(&mut self.account, obs, self.stock_frac, self.last_rebalance)?;
        self.last_rebalance = obs.date;
        Ok(())
    }

    /// Next date at which a transition is possible, clamped to the window
    /// end and pulled back by the padding so the exit trigger is never
    /// skipped over.
    fn skip_hint(&self, date: NaiveDate) -> Option<NaiveDate> {
        let next = (self.last_rebalance + self.period).min(self.account.end_date());
        let hint = next - lookahead_padding();
        (hint > date).then_some(hint)
    }
}

impl TradingModel for PeriodicRebalance {
    fn configure(
        &mut self,
        start_date: NaiveDate,
        window_years: i64,
    ) -> Result<(), RetsweepError> {
        self.account.configure(start_date, window_years)?;
        self.last_rebalance = start_date;
        Ok(())
    }

    fn advance(&mut self, obs: &Observation) -> Result<Option<NaiveDate>, RetsweepError> {
        match self.account.classify(obs.date) {
            Step::Entry => {
                self.enter(obs)?;
                self.account.fire_entry();
                Ok(None)
            }
            Step::Daily => {
                if obs.date >= self.last_rebalance + self.period {
                    self.rebalance(obs)?;
                }
                Ok(self.skip_hint(obs.date))
            }
            Step::Exit => {
                self.exit(obs)?;
                self.account.fire_exit();
                Ok(None)
            }
            Step::Idle => Ok(None),
        }
    }

    fn total_return(&self) -> Result<WindowOutcome, RetsweepError> {
        self.account.total_return(self.label())
    }

    fn label(&self) -> String {
        format!(
            "Kelly_{}_{}",
            self.bond_frac,
            self.period.num_days()
        )
    }
}
