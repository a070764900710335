use crate::error::AnalyticsError;

/// Relative pivot size below which the normal equations are treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Hedge ratio `beta` of the OLS fit `y = alpha + beta * x`; the intercept is discarded.
///
/// # Errors
/// * [`AnalyticsError::LengthMismatch`] if `x` and `y` differ in length.
/// * [`AnalyticsError::InsufficientData`] for fewer than two observations.
/// * [`AnalyticsError::NonFinite`] if either series contains `NaN` or an infinity.
/// * [`AnalyticsError::Degenerate`] if `x` is constant.
///
/// # Mathematical Definition
/// beta = Σ[(xi - x̄)(yi - ȳ)] / Σ(xi - x̄)²
pub fn hedge_ratio(x: &[f64], y: &[f64]) -> Result<f64, AnalyticsError> {
    validate_pair(x, y, 2)?;

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (covariance, variance_x) =
        x.iter()
            .zip(y)
            .fold((0.0, 0.0), |(covariance, variance_x), (x, y)| {
                let dx = x - mean_x;
                (covariance + dx * (y - mean_y), variance_x + dx * dx)
            });

    if variance_x == 0.0 {
        return Err(AnalyticsError::Degenerate(
            "x has zero variance, hedge ratio undefined".to_string(),
        ));
    }

    Ok(covariance / variance_x)
}

/// Check two series have equal length of at least `minimum` and contain only finite values.
pub(crate) fn validate_pair(x: &[f64], y: &[f64], minimum: usize) -> Result<(), AnalyticsError> {
    if x.len() != y.len() {
        return Err(AnalyticsError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < minimum {
        return Err(AnalyticsError::InsufficientData {
            required: minimum,
            actual: x.len(),
        });
    }
    validate_finite("x", x)?;
    validate_finite("y", y)
}

pub(crate) fn validate_finite(series: &'static str, values: &[f64]) -> Result<(), AnalyticsError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(AnalyticsError::NonFinite { series, index }),
        None => Ok(()),
    }
}

/// Result of an ordinary least squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Coefficient per regressor, in regressor order.
    pub params: Vec<f64>,
    /// Standard error per coefficient.
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Number of observations.
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of the coefficient at `index`.
    pub fn t_value(&self, index: usize) -> Option<f64> {
        Some(self.params.get(index)? / self.std_errors.get(index)?)
    }

    /// Gaussian log-likelihood of the fit.
    pub fn log_likelihood(&self) -> f64 {
        let nobs = self.nobs as f64;
        -nobs / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / nobs).ln() + 1.0)
    }

    /// Akaike information criterion, counting every regressor as a parameter.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.params.len() as f64
    }

    /// Bayesian information criterion, counting every regressor as a parameter.
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood() + (self.nobs as f64).ln() * self.params.len() as f64
    }
}

/// Ordinary least squares of `response` on the given regressor columns.
///
/// Any intercept must be supplied explicitly as a column of ones. Solved through the normal
/// equations with Gauss-Jordan elimination, which is accurate for the small, well-scaled
/// designs used here.
pub fn ols(columns: &[Vec<f64>], response: &[f64]) -> Result<OlsFit, AnalyticsError> {
    let nobs = response.len();
    let k = columns.len();

    if k == 0 {
        return Err(AnalyticsError::Degenerate("no regressors".to_string()));
    }
    if let Some(column) = columns.iter().find(|column| column.len() != nobs) {
        return Err(AnalyticsError::LengthMismatch {
            x: column.len(),
            y: nobs,
        });
    }
    if nobs <= k {
        return Err(AnalyticsError::InsufficientData {
            required: k + 1,
            actual: nobs,
        });
    }

    // X'X and X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in i..k {
            let dot = dot(&columns[i], &columns[j]);
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
        xty[i] = dot(&columns[i], response);
    }

    let inverse = invert(xtx)?;

    let params = inverse
        .iter()
        .map(|row| dot(row, &xty))
        .collect::<Vec<_>>();

    let ssr = (0..nobs)
        .map(|row| {
            let fitted = columns
                .iter()
                .zip(&params)
                .map(|(column, param)| column[row] * param)
                .sum::<f64>();
            (response[row] - fitted).powi(2)
        })
        .sum::<f64>();

    let sigma_sq = ssr / (nobs - k) as f64;
    let std_errors = (0..k)
        .map(|index| (sigma_sq * inverse[index][index]).sqrt())
        .collect();

    Ok(OlsFit {
        params,
        std_errors,
        ssr,
        nobs,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

/// Invert a symmetric positive semi-definite matrix with partially pivoted Gauss-Jordan.
fn invert(mut matrix: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>, AnalyticsError> {
    let n = matrix.len();
    let mut inverse = (0..n)
        .map(|row| {
            let mut identity = vec![0.0; n];
            identity[row] = 1.0;
            identity
        })
        .collect::<Vec<_>>();

    let scale = (0..n)
        .map(|index| matrix[index][index].abs())
        .fold(0.0, f64::max);

    for pivot in 0..n {
        let best = (pivot..n)
            .max_by(|a, b| matrix[*a][pivot].abs().total_cmp(&matrix[*b][pivot].abs()))
            .unwrap_or(pivot);

        if !(matrix[best][pivot].abs() > scale * SINGULAR_TOLERANCE) {
            return Err(AnalyticsError::Degenerate(
                "regressors are collinear".to_string(),
            ));
        }

        matrix.swap(pivot, best);
        inverse.swap(pivot, best);

        let divisor = matrix[pivot][pivot];
        for column in 0..n {
            matrix[pivot][column] /= divisor;
            inverse[pivot][column] /= divisor;
        }

        for row in 0..n {
            if row == pivot {
                continue;
            }
            let factor = matrix[row][pivot];
            if factor == 0.0 {
                continue;
            }
            for column in 0..n {
                matrix[row][column] -= factor * matrix[pivot][column];
                inverse[row][column] -= factor * inverse[pivot][column];
            }
        }
    }

    Ok(inverse)
}
