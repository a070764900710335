use smol_str::SmolStr;
use std::time::Duration;
use thiserror::Error;

/// All errors generated in `pairs-data`.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DataError {
    #[error("failed to start FeedClient due to empty instrument set")]
    InstrumentsEmpty,

    #[error("invalid stream url for {instrument}: {reason}")]
    InvalidUrl { instrument: SmolStr, reason: String },

    #[error("invalid backoff policy: {0}")]
    InvalidBackoff(String),

    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("SocketError: {0}")]
    Socket(String),
}

impl DataError {
    /// Determine if an error is transient, meaning the failed connection should be retried
    /// after a backoff rather than abandoned.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DataError::Socket(_) | DataError::ConnectTimeout(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DataError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        DataError::Socket(error.to_string())
    }
}
