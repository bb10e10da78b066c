//! Rebalanced mix with a loss-triggered insurance payout overlay.

use std::collections::VecDeque;

use chrono::{Duration, NaiveDate};

use super::{rebalance_to_target, Account, Step, TradingModel, WindowOutcome};
use crate::domain::error::RetsweepError;
use crate::domain::observation::Observation;

/// Like [`PeriodicRebalance`](super::PeriodicRebalance), but watches a
/// trailing price window and pays out when the trailing loss exceeds the
/// deductible. Because the loss trigger needs every observation, this
/// variant never emits a skip hint; it is strictly more expensive to
/// simulate than the other two.
#[derive(Debug, Clone)]
pub struct LossTriggeredOverlay {
    account: Account,
    insurance_frac: f64,
    stock_frac: f64,
    deductible: f64,
    payout_factor: f64,
    period: Duration,
    loss_window: usize,
    last_rebalance: NaiveDate,
    trailing: VecDeque<f64>,
}

impl LossTriggeredOverlay {
    pub fn new(
        initial_capital: f64,
        insurance_frac: f64,
        deductible: f64,
        payout_factor: f64,
        rebalance_period_days: i64,
        loss_window: usize,
    ) -> Self {
        LossTriggeredOverlay {
            account: Account::new(initial_capital),
            insurance_frac,
            stock_frac: 1.0 - insurance_frac,
            deductible,
            payout_factor,
            period: Duration::days(rebalance_period_days),
            loss_window,
            last_rebalance: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            trailing: VecDeque::new(),
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
        self.account.accrue_interest(obs, self.last_rebalance);
        let delta = -self.account.shares;
        self.account.execute(obs, delta)
    }

    /// Slide the trailing window forward by one price. Returns true when a
    /// payout fired; the buffer is then reset to just the triggering price.
    fn check_loss_trigger(&mut self, obs: &Observation) -> Result<bool, RetsweepError> {
        if self.trailing.len() < self.loss_window {
            self.trailing.push_back(obs.price);
            return Ok(false);
        }
        let Some(oldest) = self.trailing.pop_front() else {
            self.trailing.push_back(obs.price);
            return Ok(false);
        };
        let loss = (obs.price - oldest) / oldest;
        if loss <= -self.deductible {
            let amount = -self.account.capital * loss * self.payout_factor;
            self.account.adjust_capital(obs, amount)?;
            self.trailing.clear();
            self.trailing.push_back(obs.price);
            Ok(true)
        } else {
            self.trailing.push_back(obs.price);
            Ok(false)
        }
    }

    fn daily(&mut self, obs: &Observation) -> Result<(), RetsweepError> {
        let payout_fired = self.check_loss_trigger(obs)?;
        if payout_fired || obs.date >= self.last_rebalance + self.period {
            rebalance_to_target(&mut self.account, obs, self.stock_frac, self.last_rebalance)?;
            self.last_rebalance = obs.date;
        }
        Ok(())
    }
}

impl TradingModel for LossTriggeredOverlay {
    fn configure(
        &mut self,
        start_date: NaiveDate,
        window_years: i64,
    ) -> Result<(), RetsweepError> {
        self.account.configure(start_date, window_years)?;
        self.last_rebalance = start_date;
        self.trailing.clear();
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
                // Every observation matters here: no skip hint, ever.
                self.daily(obs)?;
                Ok(None)
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
            "Insurance_{}_{}_{}",
            self.insurance_frac,
            self.deductible,
            self.period.num_days()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(y: i32, m: u32, d: u32, price: f64, rate: f64) -> Observation {
        Observation {
            date: date(y, m, d),
            price,
            interest_rate: rate,
        }
    }

    fn configured() -> LossTriggeredOverlay {
        let mut model = LossTriggeredOverlay::new(10_000.0, 0.10, 0.15, 10.0, 90, 6);
        model.configure(date(2020, 1, 1), 2).unwrap();
        model
    }

    #[test]
    fn entry_buys_stock_fraction() {
        let mut model = configured();
        model.advance(&obs(2020, 1, 1, 100.0, 0.0)).unwrap();
        assert_relative_eq!(model.account.shares, 90.0);
        assert_relative_eq!(model.account.capital, 1_000.0);
    }

    #[test]
    fn incomplete_history_never_triggers() {
        let mut model = configured();
        model.account.fire_entry();
        model.account.capital = 10_000.0;
        model.account.shares = 900.0;
        model.trailing.extend([100.0, 100.0, 100.0]);

        model.advance(&obs(2020, 1, 10, 100.0, -0.10)).unwrap();
        assert_relative_eq!(model.account.capital, 10_000.0);
        assert_relative_eq!(model.account.shares, 900.0);
        assert!(model.account.trades.is_empty());
        assert_eq!(model.last_rebalance, date(2020, 1, 1));
        assert_eq!(
            model.trailing.iter().copied().collect::<Vec<_>>(),
            vec![100.0, 100.0, 100.0, 100.0]
        );
    }

    #[test]
    fn payout_fires_on_trailing_loss() {
        // Full 6-sample history with a 16% drop to 84: the deductible (15%)
        // is exceeded, so a zero-share payout trade fires and is followed
        // immediately by a rebalance trade.
        let mut model = configured();
        model.account.fire_entry();
        model.account.capital = 10_000.0;
        model.account.shares = 900.0;
        model.trailing.extend([100.0, 100.0, 100.0, 95.0, 90.0, 88.0]);

        model.advance(&obs(2020, 1, 10, 84.0, 0.0)).unwrap();

        assert_eq!(model.account.trades.len(), 2);
        let payout = model.account.trades[0];
        assert_relative_eq!(payout.delta_shares, 0.0);
        // payout = -capital * loss * factor = 10000 * 0.16 * 10
        assert_relative_eq!(payout.capital_after, 26_000.0, max_relative = 1e-12);

        // Rebalance back to 90% stock of 26000 + 900*84 = 101600.
        assert_relative_eq!(model.account.capital, 10_160.0, max_relative = 1e-9);
        assert_relative_eq!(
            model.account.shares,
            0.9 * 101_600.0 / 84.0,
            max_relative = 1e-9
        );
        assert_eq!(model.last_rebalance, date(2020, 1, 10));
        assert_eq!(model.trailing.iter().copied().collect::<Vec<_>>(), vec![84.0]);
    }

    #[test]
    fn drop_below_deductible_does_not_pay() {
        let mut model = configured();
        model.account.fire_entry();
        model.account.capital = 10_000.0;
        model.account.shares = 900.0;
        model.trailing.extend([100.0, 100.0, 100.0, 98.0, 96.0, 95.0]);

        // 10% drop, deductible is 15%.
        model.advance(&obs(2020, 1, 10, 90.0, 0.0)).unwrap();
        assert!(model.account.trades.is_empty());
        assert_eq!(model.trailing.len(), 6);
        assert_eq!(model.trailing.back(), Some(&90.0));
        assert_eq!(model.trailing.front(), Some(&100.0));
    }

    #[test]
    fn periodic_rebalance_without_payout() {
        let mut model = configured();
        model.account.fire_entry();
        model.account.capital = 10_000.0;
        model.account.shares = 900.0;

        // 91 days after the anchor at a -10% observed rate.
        model.advance(&obs(2020, 4, 1, 100.0, -0.10)).unwrap();
        let expected_cash = 10_000.0 * 0.9_f64.powf(91.0 / 365.0);
        let total = expected_cash + 90_000.0;
        assert_relative_eq!(model.account.capital, 0.1 * total, max_relative = 1e-9);
        assert_relative_eq!(
            model.account.shares,
            0.9 * total / 100.0,
            max_relative = 1e-9
        );
        assert_eq!(model.last_rebalance, date(2020, 4, 1));
    }

    #[test]
    fn never_returns_skip_hint() {
        let mut model = configured();
        model.advance(&obs(2020, 1, 1, 100.0, 0.0)).unwrap();
        for day in 2..20 {
            let skip = model.advance(&obs(2020, 1, day, 100.0, 0.0)).unwrap();
            assert!(skip.is_none());
        }
    }

    #[test]
    fn configure_resets_trailing_buffer() {
        let mut model = configured();
        model.trailing.extend([100.0, 99.0, 98.0]);
        model.configure(date(2020, 1, 4), 2).unwrap();
        assert!(model.trailing.is_empty());
        assert_eq!(model.last_rebalance, date(2020, 1, 4));
    }

    #[test]
    fn label_reflects_parameters() {
        let model = LossTriggeredOverlay::new(10_000.0, 0.1, 0.15, 10.0, 90, 6);
        assert_eq!(model.label(), "Insurance_0.1_0.15_90");
    }
}
