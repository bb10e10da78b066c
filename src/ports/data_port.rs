//! Market data access port trait.

use crate::domain::error::RetsweepError;
use crate::domain::observation::PriceSeries;

/// Supplies the combined price/interest series the engine replays.
/// Implementations own file formats and column conventions; the engine
/// only sees dated observations.
pub trait MarketDataPort {
    fn load_series(&self) -> Result<PriceSeries, RetsweepError>;
}
