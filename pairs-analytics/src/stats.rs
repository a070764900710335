use std::f64::consts::PI;

/// Standard normal probability density.
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal cumulative distribution (Abramowitz & Stegun 26.2.17, |error| < 7.5e-8).
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + 0.231_641_9 * x.abs());
    let poly = k
        * (0.319_381_530
            + k * (-0.356_563_782 + k * (1.781_477_937 + k * (-1.821_255_978 + k * 1.330_274_429))));

    let upper = 1.0 - norm_pdf(x) * poly;

    if x >= 0.0 { upper } else { 1.0 - upper }
}

/// Arithmetic mean, `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation, `NaN` for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = mean(values);
    let sum_sq = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_cdf_reference_points() {
        struct TestCase {
            input: f64,
            expected: f64,
        }

        let tests = vec![
            TestCase {
                // TC0: median
                input: 0.0,
                expected: 0.5,
            },
            TestCase {
                // TC1: one-sided 5% quantile
                input: -1.644_853_6,
                expected: 0.05,
            },
            TestCase {
                // TC2: one-sided 97.5% quantile
                input: 1.959_964,
                expected: 0.975,
            },
            TestCase {
                // TC3: deep lower tail
                input: -6.0,
                expected: 9.865_876e-10,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = norm_cdf(test.input);
            assert!(
                (actual - test.expected).abs() < 1e-7,
                "TC{} failed: {} != {}",
                index,
                actual,
                test.expected
            );
        }
    }

    #[test]
    fn test_sample_std() {
        assert!((sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.138_089_9).abs() < 1e-6);
        assert!(sample_std(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }
}
