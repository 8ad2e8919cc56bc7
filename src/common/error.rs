use std::time::Duration;

use thiserror::Error;

pub type TickerResult<T> = Result<T, TickerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickerError {
    /// Interval was zero, or jitter was below one timer tick.
    #[error("{reason} {name} for JitterTicker: {value:?}")]
    InvalidArgument {
        name: &'static str,
        value: Duration,
        reason: &'static str,
    },

    /// Construction was attempted outside a tokio runtime.
    #[error("JitterTicker must be created from within a tokio runtime")]
    NoRuntime,
}
