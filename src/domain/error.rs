//! Domain error types.

/// Top-level error type for retsweep.
///
/// Every variant is local to one window, one sweep, or one I/O operation;
/// a failed window never corrupts another window's state.
#[derive(Debug, thiserror::Error)]
pub enum RetsweepError {
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("incomplete window starting {start_date}: {reason}")]
    IncompleteWindow {
        start_date: chrono::NaiveDate,
        reason: String,
    },

    #[error("cannot aggregate an empty outcome sample")]
    EmptySample,

    #[error("non-positive price {price} on {date}")]
    NonPositivePrice {
        date: chrono::NaiveDate,
        price: f64,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RetsweepError> for std::process::ExitCode {
    fn from(err: &RetsweepError) -> Self {
        let code: u8 = match err {
            RetsweepError::Io(_) => 1,
            RetsweepError::ConfigParse { .. }
            | RetsweepError::ConfigMissing { .. }
            | RetsweepError::ConfigInvalid { .. }
            | RetsweepError::InvalidConfiguration { .. } => 2,
            RetsweepError::Data { .. } => 3,
            RetsweepError::IncompleteWindow { .. }
            | RetsweepError::NonPositivePrice { .. }
            | RetsweepError::EmptySample => 5,
        };
        std::process::ExitCode::from(code)
    }
}
