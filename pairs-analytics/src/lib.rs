#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cast_lossless,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Pairs-Analytics
//! Pure statistics over two aligned price series `x` and `y`.
//!
//! * [`hedge_ratio`]: OLS slope of `y` on `x`.
//! * [`spread_and_zscore`]: hedged spread and its trailing-window z-score.
//! * [`rolling_correlation`]: trailing-window Pearson correlation.
//! * [`adf_test`]: Augmented Dickey-Fuller unit-root test with MacKinnon p-value and critical
//!   values.
//! * [`check_zscore_alert`]: threshold breach check on a single z-score.
//!
//! Rolling outputs have the same length as their inputs, with the first `window - 1`
//! entries set to `NaN`. Invalid inputs are rejected with an [`AnalyticsError`]; too little
//! history is represented by `NaN`s, never by zeros.

/// Augmented Dickey-Fuller stationarity test.
pub mod adf;

/// Z-score threshold alerts.
pub mod alert;

/// All errors generated in `pairs-analytics`.
pub mod error;

/// OLS regression and hedge ratio.
pub mod regression;

/// Trailing-window mean, standard deviation and correlation.
pub mod rolling;

/// Hedged spread, z-score and the combined [`AnalyticsResult`](spread::AnalyticsResult).
pub mod spread;

/// Normal distribution helpers.
pub mod stats;

pub use adf::{AdfConfig, CriticalValues, LagSelection, StationarityReport, adf_test, adf_test_with};
pub use alert::{Alert, check_zscore_alert};
pub use error::AnalyticsError;
pub use regression::hedge_ratio;
pub use rolling::{rolling_correlation, rolling_mean, rolling_std};
pub use spread::{AnalyticsResult, SpreadAnalysis, analyze, spread_and_zscore};
