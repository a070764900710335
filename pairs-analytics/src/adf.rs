//! Augmented Dickey-Fuller unit-root test with a constant term.
//!
//! The lag order of the differenced regressors is selected by information criterion over
//! every order from zero to a maximum that grows with the sample size, all candidate
//! regressions sharing the same observations. The selected order is then refitted on the
//! longest sample it allows and the test statistic is the t-value of the lagged level.
//!
//! p-values follow the MacKinnon (1994) response surface and critical values the MacKinnon
//! (2010) finite-sample table, both for the single-series constant-only case.

use crate::{
    error::AnalyticsError,
    regression::{OlsFit, ols},
    stats::norm_cdf,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default minimum number of non-NaN observations required to run the test.
pub const DEFAULT_MIN_OBSERVATIONS: usize = 50;

/// Smallest sample the regression can be built from, whatever the configured minimum.
const STRUCTURAL_MIN_OBSERVATIONS: usize = 6;

/// MacKinnon (1994) bounds and polynomial coefficients, constant-only regression, N = 1.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// MacKinnon (2010) critical value coefficients, constant-only regression, N = 1.
const CRITICAL_1_PCT: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRITICAL_5_PCT: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRITICAL_10_PCT: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// How the number of lagged differences is chosen.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Deserialize, Serialize)]
pub enum LagSelection {
    /// Minimise the Akaike information criterion.
    #[default]
    Aic,
    /// Minimise the Bayesian information criterion.
    Bic,
    /// Use the maximum lag as given.
    Fixed,
}

/// Configuration for [`adf_test_with`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub struct AdfConfig {
    /// Minimum number of non-NaN observations.
    pub min_observations: usize,
    /// Upper bound on the lag order, defaulting to `ceil(12 * (n / 100)^(1/4))`.
    pub max_lag: Option<usize>,
    pub lag_selection: LagSelection,
}

impl Default for AdfConfig {
    fn default() -> Self {
        Self {
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            max_lag: None,
            lag_selection: LagSelection::default(),
        }
    }
}

impl AdfConfig {
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    pub fn with_max_lag(mut self, max_lag: usize) -> Self {
        self.max_lag = Some(max_lag);
        self
    }

    pub fn with_lag_selection(mut self, lag_selection: LagSelection) -> Self {
        self.lag_selection = lag_selection;
        self
    }
}

/// Test statistic thresholds at the 1%, 5% and 10% significance levels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

impl CriticalValues {
    /// Critical values for a regression over `nobs` observations.
    pub fn for_observations(nobs: usize) -> Self {
        let inverse = 1.0 / nobs as f64;
        let surface = |coefficients: [f64; 4]| polyval(&coefficients, inverse);

        Self {
            one_percent: surface(CRITICAL_1_PCT),
            five_percent: surface(CRITICAL_5_PCT),
            ten_percent: surface(CRITICAL_10_PCT),
        }
    }

    /// Iterate `(level label, threshold)` pairs, eg/ `("5%", -2.86)`.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("1%", self.one_percent),
            ("5%", self.five_percent),
            ("10%", self.ten_percent),
        ]
        .into_iter()
    }

    /// Threshold for a level label of `"1%"`, `"5%"` or `"10%"`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.iter()
            .find(|(level, _)| *level == label)
            .map(|(_, value)| value)
    }
}

/// Outcome of an Augmented Dickey-Fuller test.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StationarityReport {
    pub test_statistic: f64,
    /// MacKinnon approximate p-value in `[0, 1]`.
    pub p_value: f64,
    pub critical_values: CriticalValues,
    /// Number of lagged differences in the final regression.
    pub used_lag: usize,
    /// Number of observations in the final regression.
    pub n_obs: usize,
    /// Best information criterion value, `None` for [`LagSelection::Fixed`].
    pub ic_best: Option<f64>,
}

impl StationarityReport {
    /// True if the unit-root null is rejected at `significance`, eg/ `0.05`.
    pub fn is_stationary(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Run [`adf_test_with`] using the default [`AdfConfig`].
pub fn adf_test(series: &[f64]) -> Result<StationarityReport, AnalyticsError> {
    adf_test_with(series, &AdfConfig::default())
}

/// Augmented Dickey-Fuller test with a constant term on `series` after dropping `NaN`s.
///
/// # Errors
/// * [`AnalyticsError::InsufficientAdfSample`] if fewer than `config.min_observations`
///   values remain after dropping `NaN`s.
/// * [`AnalyticsError::InvalidLag`] if `config.max_lag` is too large for the sample.
/// * [`AnalyticsError::Degenerate`] if the regression is singular, eg/ a constant series.
pub fn adf_test_with(
    series: &[f64],
    config: &AdfConfig,
) -> Result<StationarityReport, AnalyticsError> {
    let clean = series
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .collect::<Vec<_>>();

    let required = config.min_observations.max(STRUCTURAL_MIN_OBSERVATIONS);
    if clean.len() < required {
        return Err(AnalyticsError::InsufficientAdfSample {
            required,
            actual: clean.len(),
        });
    }

    let n = clean.len();
    let limit = n / 2 - 2;
    let max_lag = match config.max_lag {
        Some(max_lag) if max_lag > limit => {
            return Err(AnalyticsError::InvalidLag { max_lag, limit });
        }
        Some(max_lag) => max_lag,
        None => default_max_lag(n).min(limit),
    };

    let diffs = clean
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect::<Vec<_>>();

    let (used_lag, ic_best) = match config.lag_selection {
        LagSelection::Fixed => (max_lag, None),
        LagSelection::Aic => select_lag(&clean, &diffs, max_lag, OlsFit::aic)?,
        LagSelection::Bic => select_lag(&clean, &diffs, max_lag, OlsFit::bic)?,
    };

    let (mut columns, response) = design(&clean, &diffs, used_lag);
    let n_obs = response.len();
    columns.push(vec![1.0; n_obs]);

    let fit = ols(&columns, &response)?;
    let test_statistic = fit
        .t_value(0)
        .filter(|value| value.is_finite())
        .ok_or_else(|| AnalyticsError::Degenerate("ADF statistic is not finite".to_string()))?;

    let report = StationarityReport {
        test_statistic,
        p_value: mackinnon_p_value(test_statistic),
        critical_values: CriticalValues::for_observations(n_obs),
        used_lag,
        n_obs,
        ic_best,
    };

    debug!(
        statistic = report.test_statistic,
        p_value = report.p_value,
        used_lag,
        n_obs,
        "ADF test complete"
    );

    Ok(report)
}

/// MacKinnon (1994) approximate p-value of an ADF statistic, constant-only regression.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let z = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };

    norm_cdf(z).clamp(0.0, 1.0)
}

fn default_max_lag(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Evaluate `c0 + c1 x + c2 x² + ...`.
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |accumulator, coefficient| accumulator * x + coefficient)
}

/// Regressors `[level, diff lag 1, .., diff lag lags]` and response `diff` for every
/// observation with `lags` prior differences available.
fn design(levels: &[f64], diffs: &[f64], lags: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let rows = lags..diffs.len();

    let mut columns = Vec::with_capacity(lags + 2);
    columns.push(rows.clone().map(|t| levels[t]).collect::<Vec<_>>());
    for lag in 1..=lags {
        columns.push(rows.clone().map(|t| diffs[t - lag]).collect());
    }

    let response = rows.map(|t| diffs[t]).collect();
    (columns, response)
}

/// Choose the lag order minimising `criterion`, fitting every candidate on the sample of
/// the largest order so the criteria are comparable.
fn select_lag<F>(
    levels: &[f64],
    diffs: &[f64],
    max_lag: usize,
    criterion: F,
) -> Result<(usize, Option<f64>), AnalyticsError>
where
    F: Fn(&OlsFit) -> f64,
{
    let (lagged, response) = design(levels, diffs, max_lag);
    let constant = vec![1.0; response.len()];

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let columns = std::iter::once(constant.clone())
            .chain(lagged[..=lag].iter().cloned())
            .collect::<Vec<_>>();

        let value = criterion(&ols(&columns, &response)?);
        if best.is_none_or(|(_, best_value)| value < best_value) {
            best = Some((lag, value));
        }
    }

    Ok(best.map_or((0, None), |(lag, value)| (lag, Some(value))))
}
