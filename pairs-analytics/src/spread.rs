use crate::{
    error::AnalyticsError,
    regression::{hedge_ratio, validate_pair},
    rolling::{rolling_correlation, rolling_mean, rolling_std, validate_window},
};
use serde::{Deserialize, Serialize};

/// Hedged spread `y - beta * x` and its trailing-window z-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadAnalysis {
    pub hedge_ratio: f64,
    pub spread: Vec<f64>,
    pub zscore: Vec<f64>,
}

/// Full per-cycle analytics for one aligned pair, every series aligned to the input index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub hedge_ratio: f64,
    pub spread: Vec<f64>,
    pub zscore: Vec<f64>,
    pub correlation: Vec<f64>,
}

impl AnalyticsResult {
    /// Most recent z-score, `None` if there are no observations.
    pub fn latest_zscore(&self) -> Option<f64> {
        self.zscore.last().copied()
    }

    /// Most recent rolling correlation, `None` if there are no observations.
    pub fn latest_correlation(&self) -> Option<f64> {
        self.correlation.last().copied()
    }

    /// Spread values with every leading or missing `NaN` removed.
    pub fn clean_spread(&self) -> Vec<f64> {
        self.spread
            .iter()
            .copied()
            .filter(|value| !value.is_nan())
            .collect()
    }
}

/// Compute the hedge ratio of `y` on `x`, the spread `y - beta * x` and the trailing-window
/// z-score `(spread - mean) / std` using sample standard deviation.
///
/// The first `window - 1` z-scores are `NaN`. A window whose spread is constant has zero
/// standard deviation and yields a `NaN` z-score.
///
/// # Errors
/// * [`AnalyticsError::LengthMismatch`] if `x` and `y` differ in length.
/// * [`AnalyticsError::InvalidWindow`] if `window < 2`.
/// * [`AnalyticsError::WindowTooLarge`] if `window` exceeds the series length.
/// * Any error of [`hedge_ratio`].
pub fn spread_and_zscore(
    x: &[f64],
    y: &[f64],
    window: usize,
) -> Result<SpreadAnalysis, AnalyticsError> {
    validate_pair(x, y, 0)?;
    validate_window(window, 2, x.len())?;

    let beta = hedge_ratio(x, y)?;

    let spread = x
        .iter()
        .zip(y)
        .map(|(x, y)| y - beta * x)
        .collect::<Vec<_>>();

    let means = rolling_mean(&spread, window)?;
    let stds = rolling_std(&spread, window)?;

    let zscore = spread
        .iter()
        .zip(means.iter().zip(&stds))
        .map(|(spread, (mean, std))| {
            if *std > 0.0 && std.is_finite() {
                (spread - mean) / std
            } else {
                f64::NAN
            }
        })
        .collect();

    Ok(SpreadAnalysis {
        hedge_ratio: beta,
        spread,
        zscore,
    })
}

/// Run [`spread_and_zscore`] and [`rolling_correlation`] over the same window.
pub fn analyze(x: &[f64], y: &[f64], window: usize) -> Result<AnalyticsResult, AnalyticsError> {
    let SpreadAnalysis {
        hedge_ratio,
        spread,
        zscore,
    } = spread_and_zscore(x, y, window)?;

    let correlation = rolling_correlation(x, y, window)?;

    Ok(AnalyticsResult {
        hedge_ratio,
        spread,
        zscore,
        correlation,
    })
}
