//! Buy-and-hold baseline strategy.

use chrono::NaiveDate;

use super::{Account, Step, TradingModel, WindowOutcome};
use crate::domain::error::RetsweepError;
use crate::domain::lookahead_padding;
use crate::domain::observation::Observation;

/// Allocates all capital into shares on entry and liquidates on exit.
/// Nothing happens in between, so the daily step is pure skip hint.
#[derive(Debug, Clone)]
pub struct BuyHold {
    account: Account,
}

impl BuyHold {
    pub fn new(initial_capital: f64) -> Self {
        BuyHold {
            account: Account::new(initial_capital),
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
        let delta = self.account.capital / obs.price;
        self.account.execute(obs, delta)
    }

    fn exit(&mut self, obs: &Observation) -> Result<(), RetsweepError> {
        let delta = -self.account.shares;
        self.account.execute(obs, delta)
    }
}

impl TradingModel for BuyHold {
    fn configure(
        &mut self,
        start_date: NaiveDate,
        window_years: i64,
    ) -> Result<(), RetsweepError> {
        self.account.configure(start_date, window_years)
    }

    fn advance(&mut self, obs: &Observation) -> Result<Option<NaiveDate>, RetsweepError> {
        match self.account.classify(obs.date) {
            Step::Entry => {
                self.enter(obs)?;
                self.account.fire_entry();
                Ok(None)
            }
            Step::Daily => {
                // No state can change until the exit boundary.
                let hint = self.account.end_date() - lookahead_padding();
                Ok((hint > obs.date).then_some(hint))
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
        "Buy_Hold".to_string()
    }
}
