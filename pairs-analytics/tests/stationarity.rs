use pairs_analytics::{AdfConfig, LagSelection, adf_test, adf_test_with, analyze, hedge_ratio};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SEEDS: u64 = 20;
const SAMPLE: usize = 500;

/// Standard normal draw via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn white_noise(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| gaussian(&mut rng)).collect()
}

fn random_walk(seed: u64, len: usize) -> Vec<f64> {
    white_noise(seed, len)
        .into_iter()
        .scan(100.0, |level, step| {
            *level += step;
            Some(*level)
        })
        .collect()
}

#[test]
fn white_noise_is_stationary() {
    let stationary = (0..SEEDS)
        .filter(|seed| adf_test(&white_noise(*seed, SAMPLE)).unwrap().p_value < 0.05)
        .count();

    assert!(stationary >= 19, "only {stationary}/{SEEDS} rejected the unit root");
}

#[test]
fn random_walk_is_not_stationary() {
    let non_stationary = (0..SEEDS)
        .filter(|seed| adf_test(&random_walk(1_000 + seed, SAMPLE)).unwrap().p_value >= 0.05)
        .count();

    assert!(non_stationary >= 15, "only {non_stationary}/{SEEDS} kept the unit root");
}

#[test]
fn report_is_well_formed() {
    let report = adf_test(&white_noise(7, SAMPLE)).unwrap();

    assert!((0.0..=1.0).contains(&report.p_value));
    assert!(report.critical_values.one_percent < report.critical_values.five_percent);
    assert!(report.critical_values.five_percent < report.critical_values.ten_percent);
    assert!(report.ic_best.is_some());

    // maxlag = ceil(12 * 5^0.25) = 18, final regression drops used_lag + 1 observations
    assert!(report.used_lag <= 18);
    assert_eq!(report.n_obs, SAMPLE - 1 - report.used_lag);
    assert!(report.is_stationary(0.05));
}

#[test]
fn fixed_and_bic_lag_selection() {
    let series = random_walk(42, 200);

    let fixed = adf_test_with(
        &series,
        &AdfConfig::default()
            .with_max_lag(4)
            .with_lag_selection(LagSelection::Fixed),
    )
    .unwrap();
    assert_eq!(fixed.used_lag, 4);
    assert_eq!(fixed.n_obs, 195);
    assert_eq!(fixed.ic_best, None);

    let bic = adf_test_with(&series, &AdfConfig::default().with_lag_selection(LagSelection::Bic))
        .unwrap();
    let aic = adf_test(&series).unwrap();

    // BIC penalises extra lags at least as hard as AIC once ln(n) > 2
    assert!(bic.used_lag <= aic.used_lag);
}

#[test]
fn cointegrated_pair_has_stationary_spread() {
    let x = random_walk(99, SAMPLE);
    let noise = white_noise(100, SAMPLE);
    let y = x
        .iter()
        .zip(&noise)
        .map(|(x, noise)| 2.0 * x + 5.0 + noise)
        .collect::<Vec<_>>();

    let beta = hedge_ratio(&x, &y).unwrap();
    assert!((beta - 2.0).abs() < 0.05, "beta {beta}");

    let result = analyze(&x, &y, 30).unwrap();
    assert!(result.zscore[..29].iter().all(|z| z.is_nan()));
    assert!(result.zscore[29..].iter().all(|z| z.is_finite()));

    let report = adf_test(&result.clean_spread()).unwrap();
    assert!(report.is_stationary(0.05), "p-value {}", report.p_value);
}
