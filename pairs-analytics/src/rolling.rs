use crate::{
    error::AnalyticsError,
    regression::validate_pair,
    stats::{mean, sample_std},
};

/// Trailing-window arithmetic mean. The first `window - 1` entries are `NaN`, as is any
/// window containing a non-finite value.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>, AnalyticsError> {
    validate_window(window, 1, values.len())?;
    Ok(rolling(values, window, mean))
}

/// Trailing-window sample (n - 1) standard deviation, with the same `NaN` policy as
/// [`rolling_mean`].
pub fn rolling_std(values: &[f64], window: usize) -> Result<Vec<f64>, AnalyticsError> {
    validate_window(window, 2, values.len())?;
    Ok(rolling(values, window, sample_std))
}

/// Trailing-window Pearson correlation of `x` and `y`.
///
/// The first `window - 1` entries are `NaN`. A window in which either series is constant has
/// no defined correlation and is also `NaN`.
pub fn rolling_correlation(
    x: &[f64],
    y: &[f64],
    window: usize,
) -> Result<Vec<f64>, AnalyticsError> {
    validate_pair(x, y, 0)?;
    validate_window(window, 2, x.len())?;

    let correlations = x
        .windows(window)
        .zip(y.windows(window))
        .map(|(x, y)| pearson(x, y));

    Ok(std::iter::repeat_n(f64::NAN, window - 1)
        .chain(correlations)
        .collect())
}

pub(crate) fn validate_window(
    window: usize,
    minimum: usize,
    len: usize,
) -> Result<(), AnalyticsError> {
    if window < minimum {
        return Err(AnalyticsError::InvalidWindow { window, minimum });
    }
    if window > len {
        return Err(AnalyticsError::WindowTooLarge { window, len });
    }
    Ok(())
}

fn rolling<F>(values: &[f64], window: usize, statistic: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let computed = values.windows(window).map(|slice| {
        if slice.iter().all(|value| value.is_finite()) {
            statistic(slice)
        } else {
            f64::NAN
        }
    });

    std::iter::repeat_n(f64::NAN, window - 1)
        .chain(computed)
        .collect()
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = mean(x);
    let mean_y = mean(y);

    let (covariance, variance_x, variance_y) = x.iter().zip(y).fold(
        (0.0, 0.0, 0.0),
        |(covariance, variance_x, variance_y), (x, y)| {
            let dx = x - mean_x;
            let dy = y - mean_y;
            (covariance + dx * dy, variance_x + dx * dx, variance_y + dy * dy)
        },
    );

    if variance_x == 0.0 || variance_y == 0.0 {
        return f64::NAN;
    }

    (covariance / (variance_x.sqrt() * variance_y.sqrt())).clamp(-1.0, 1.0)
}
