use pairs_analytics::{check_zscore_alert, hedge_ratio, rolling_correlation, spread_and_zscore};
use proptest::prelude::*;

fn arb_prices(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1_000.0, len)
}

proptest! {
    #[test]
    fn rolling_outputs_lead_with_exactly_window_minus_one_nans(
        (x, y, window) in arb_prices(10..80).prop_flat_map(|x| {
            let len = x.len();
            (Just(x), arb_prices(len..len + 1), 2..=len)
        })
    ) {
        let analysis = spread_and_zscore(&x, &y, window).unwrap();
        let correlation = rolling_correlation(&x, &y, window).unwrap();

        prop_assert_eq!(analysis.spread.len(), x.len());
        prop_assert_eq!(analysis.zscore.len(), x.len());
        prop_assert_eq!(correlation.len(), x.len());

        prop_assert!(analysis.zscore[..window - 1].iter().all(|z| z.is_nan()));
        prop_assert!(correlation[..window - 1].iter().all(|c| c.is_nan()));
        prop_assert!(correlation.iter().all(|c| c.is_nan() || (-1.0..=1.0).contains(c)));
    }

    #[test]
    fn hedge_ratio_recovers_linear_slope(
        x in arb_prices(3..60),
        slope in -5.0f64..5.0,
        intercept in -100.0f64..100.0,
    ) {
        prop_assume!(x.iter().any(|value| (value - x[0]).abs() > 1e-3));

        let y = x.iter().map(|x| slope * x + intercept).collect::<Vec<_>>();
        let beta = hedge_ratio(&x, &y).unwrap();

        prop_assert!((beta - slope).abs() < 1e-6, "beta {} slope {}", beta, slope);
    }

    #[test]
    fn alert_iff_absolute_zscore_exceeds_threshold(
        zscore in -10.0f64..10.0,
        threshold in 1.0f64..3.0,
    ) {
        let alert = check_zscore_alert(zscore, threshold);
        prop_assert_eq!(alert.is_some(), zscore.abs() > threshold);
    }
}
