use thiserror::Error;

/// All errors generated in `pairs-analytics`.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("series length mismatch: x has {x} observations, y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid window {window}: must be at least {minimum}")]
    InvalidWindow { window: usize, minimum: usize },

    #[error("window {window} exceeds series length {len}")]
    WindowTooLarge { window: usize, len: usize },

    #[error("non-finite value in {series} at index {index}")]
    NonFinite { series: &'static str, index: usize },

    #[error("degenerate regression: {0}")]
    Degenerate(String),

    #[error("ADF requires at least {required} observations after dropping NaN, got {actual}")]
    InsufficientAdfSample { required: usize, actual: usize },

    #[error("ADF max lag {max_lag} exceeds limit {limit} for this sample size")]
    InvalidLag { max_lag: usize, limit: usize },
}
