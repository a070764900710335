use chrono::{DateTime, Utc};
use pairs_analytics::{
    AdfConfig, Alert, AnalyticsError, AnalyticsResult, StationarityReport, adf_test_with, analyze,
    check_zscore_alert, rolling_mean,
};
use pairs_data::{Granularity, TickStore, align};
use smol_str::SmolStr;
use tracing::{debug, warn};

/// Minimum aligned history required regardless of the rolling window.
pub const MIN_HISTORY: usize = 50;

/// Aligned bars required before a cycle is analysed with the given rolling `window`.
pub fn min_points(window: usize) -> usize {
    (window + 5).max(MIN_HISTORY)
}

/// Analytics parameters of one monitored pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub x: SmolStr,
    pub y: SmolStr,
    pub granularity: Granularity,
    pub window: usize,
    pub z_threshold: f64,
    pub adf: AdfConfig,
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// At least one instrument has no bars yet.
    WaitingForBars { x_bars: usize, y_bars: usize },
    /// Both instruments have bars, but fewer aligned buckets than the analysis needs.
    Collecting { have: usize, need: usize },
    Ready(Box<CycleAnalytics>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleAnalytics {
    /// Start of the most recent aligned bucket.
    pub last_bar: DateTime<Utc>,
    pub observations: usize,
    pub analytics: AnalyticsResult,
    pub alert: Option<Alert>,
    /// `None` while the clean spread is shorter than [`AdfConfig::min_observations`], or when
    /// the test cannot be fitted to it.
    pub stationarity: Option<StationarityReport>,
    /// Latest trailing-window mean of the spread.
    pub spread_rolling_mean: f64,
}

impl CycleAnalytics {
    pub fn latest_zscore(&self) -> f64 {
        self.analytics.latest_zscore().unwrap_or(f64::NAN)
    }

    pub fn latest_correlation(&self) -> f64 {
        self.analytics.latest_correlation().unwrap_or(f64::NAN)
    }

    pub fn latest_spread(&self) -> f64 {
        self.analytics.spread.last().copied().unwrap_or(f64::NAN)
    }
}

/// Resample both instruments of the pair, join their bars and analyse the joined series.
///
/// Too little data is reported through [`CycleReport`] rather than as an error. Errors are
/// only returned for series the analytics reject, eg/ a constant `x` leg. A failed
/// stationarity test is logged and leaves the rest of the cycle intact.
pub fn evaluate(store: &TickStore, config: &PipelineConfig) -> Result<CycleReport, AnalyticsError> {
    let x_bars = store.resample(&config.x, config.granularity);
    let y_bars = store.resample(&config.y, config.granularity);

    if x_bars.is_empty() || y_bars.is_empty() {
        return Ok(CycleReport::WaitingForBars {
            x_bars: x_bars.len(),
            y_bars: y_bars.len(),
        });
    }

    let aligned = align(&x_bars, &y_bars);
    let need = min_points(config.window);
    if aligned.len() < need {
        return Ok(CycleReport::Collecting {
            have: aligned.len(),
            need,
        });
    }

    let Some(last_bar) = aligned.time.last().copied() else {
        return Ok(CycleReport::Collecting { have: 0, need });
    };

    let analytics = analyze(&aligned.x, &aligned.y, config.window)?;

    let alert = analytics
        .latest_zscore()
        .and_then(|zscore| check_zscore_alert(zscore, config.z_threshold));

    let clean_spread = analytics.clean_spread();
    let stationarity = if clean_spread.len() >= config.adf.min_observations {
        adf_test_with(&clean_spread, &config.adf)
            .inspect_err(|error| warn!(%error, "stationarity test failed"))
            .ok()
    } else {
        debug!(
            observations = clean_spread.len(),
            required = config.adf.min_observations,
            "skipping stationarity test"
        );
        None
    };

    let spread_rolling_mean = rolling_mean(&analytics.spread, config.window)?
        .last()
        .copied()
        .unwrap_or(f64::NAN);

    Ok(CycleReport::Ready(Box::new(CycleAnalytics {
        last_bar,
        observations: aligned.len(),
        analytics,
        alert,
        stationarity,
        spread_rolling_mean,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pairs_data::Tick;

    fn config(window: usize) -> PipelineConfig {
        PipelineConfig {
            x: SmolStr::new("BTCUSDT"),
            y: SmolStr::new("ETHUSDT"),
            granularity: Granularity::Minute,
            window,
            z_threshold: 2.0,
            adf: AdfConfig::default(),
        }
    }

    fn minute(index: usize) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_040, 0).unwrap() + TimeDelta::minutes(index as i64)
    }

    /// One tick per instrument per minute, `y` tracks `2 * x + 10` with a small wobble.
    fn pair_ticks(minutes: usize) -> Vec<Tick> {
        (0..minutes)
            .flat_map(|index| {
                let x = 100.0 + (index as f64 * 0.7).sin() * 5.0 + index as f64 * 0.1;
                let wobble = ((index * 7_919) % 101) as f64 / 101.0 - 0.5;
                let time = minute(index) + TimeDelta::seconds(30);
                [
                    Tick::new(time, SmolStr::new("BTCUSDT"), x, 1.0),
                    Tick::new(time, SmolStr::new("ETHUSDT"), 2.0 * x + 10.0 + wobble, 2.0),
                ]
            })
            .collect()
    }

    #[test]
    fn test_min_points() {
        assert_eq!(min_points(10), 50);
        assert_eq!(min_points(30), 50);
        assert_eq!(min_points(45), 50);
        assert_eq!(min_points(60), 65);
        assert_eq!(min_points(100), 105);
    }

    #[test]
    fn test_evaluate_waiting_for_bars() {
        let mut store = TickStore::new();
        assert_eq!(
            evaluate(&store, &config(30)).unwrap(),
            CycleReport::WaitingForBars {
                x_bars: 0,
                y_bars: 0
            }
        );

        store.update(
            pair_ticks(3)
                .into_iter()
                .filter(|tick| tick.instrument == "BTCUSDT"),
        );
        assert_eq!(
            evaluate(&store, &config(30)).unwrap(),
            CycleReport::WaitingForBars {
                x_bars: 3,
                y_bars: 0
            }
        );
    }

    #[test]
    fn test_evaluate_collecting() {
        let mut store = TickStore::new();
        store.update(pair_ticks(20));

        assert_eq!(
            evaluate(&store, &config(30)).unwrap(),
            CycleReport::Collecting { have: 20, need: 50 }
        );

        // Bars in disjoint buckets do not count towards the aligned history
        store.update([Tick::new(minute(500), SmolStr::new("ETHUSDT"), 250.0, 1.0)]);
        assert_eq!(
            evaluate(&store, &config(30)).unwrap(),
            CycleReport::Collecting { have: 20, need: 50 }
        );
    }

    #[test]
    fn test_evaluate_ready() {
        let mut store = TickStore::new();
        store.update(pair_ticks(120));

        let CycleReport::Ready(cycle) = evaluate(&store, &config(30)).unwrap() else {
            panic!("expected a ready cycle");
        };

        assert_eq!(cycle.observations, 120);
        assert_eq!(cycle.last_bar, minute(119));
        assert!((cycle.analytics.hedge_ratio - 2.0).abs() < 0.05);
        assert_eq!(cycle.analytics.spread.len(), 120);
        assert!(cycle.analytics.zscore[..29].iter().all(|z| z.is_nan()));
        assert!(cycle.latest_zscore().is_finite());
        assert!(cycle.latest_correlation() > 0.9);
        assert!(cycle.spread_rolling_mean.is_finite());
        assert_eq!(
            cycle.alert.is_some(),
            cycle.latest_zscore().abs() > 2.0
        );

        let stationarity = cycle.stationarity.as_ref().unwrap();
        assert!((0.0..=1.0).contains(&stationarity.p_value));
    }

    #[test]
    fn test_evaluate_skips_stationarity_below_minimum() {
        let mut store = TickStore::new();
        store.update(pair_ticks(60));

        let config = PipelineConfig {
            adf: AdfConfig::default().with_min_observations(100),
            ..config(30)
        };

        let CycleReport::Ready(cycle) = evaluate(&store, &config).unwrap() else {
            panic!("expected a ready cycle");
        };
        assert_eq!(cycle.observations, 60);
        assert_eq!(cycle.stationarity, None);
    }

    #[test]
    fn test_evaluate_constant_leg_is_an_error() {
        let ticks = (0..60).flat_map(|index| {
            let time = minute(index);
            [
                Tick::new(time, SmolStr::new("BTCUSDT"), 100.0, 1.0),
                Tick::new(time, SmolStr::new("ETHUSDT"), 200.0 + index as f64, 1.0),
            ]
        });

        let mut store = TickStore::new();
        store.update(ticks);

        assert!(matches!(
            evaluate(&store, &config(30)),
            Err(AnalyticsError::Degenerate(_))
        ));
    }

    #[test]
    fn test_evaluate_keeps_alert_when_stationarity_fails() {
        let mut ticks = pair_ticks(79);
        let x = 110.0;
        ticks.extend([
            Tick::new(minute(79), SmolStr::new("BTCUSDT"), x, 1.0),
            Tick::new(minute(79), SmolStr::new("ETHUSDT"), 2.0 * x + 30.0, 1.0),
        ]);

        let mut store = TickStore::new();
        store.update(ticks);

        // Lag order far beyond what 80 observations support
        let config = PipelineConfig {
            adf: AdfConfig::default().with_max_lag(1_000),
            ..config(30)
        };

        let CycleReport::Ready(cycle) = evaluate(&store, &config).unwrap() else {
            panic!("expected a ready cycle");
        };
        assert_eq!(cycle.observations, 80);
        assert_eq!(cycle.stationarity, None);
        assert!(cycle.latest_zscore() > 2.0, "zscore {}", cycle.latest_zscore());
        assert_eq!(
            cycle.alert.map(|alert| alert.zscore),
            Some(cycle.latest_zscore())
        );
    }

    #[test]
    fn test_evaluate_keeps_alert_for_near_degenerate_spread() {
        // Spread is flat to within floating point noise, then jumps on the last bar
        let ticks = (0..80).flat_map(|index| {
            let x = 100.0 + (index as f64 * 0.7).sin() * 5.0 + index as f64 * 0.1;
            let noise = (((index * 7_919) % 101) as f64 / 101.0 - 0.5) * 1e-12;
            let spike = if index == 79 { 1e-9 } else { 0.0 };
            [
                Tick::new(minute(index), SmolStr::new("BTCUSDT"), x, 1.0),
                Tick::new(
                    minute(index),
                    SmolStr::new("ETHUSDT"),
                    2.0 * x + 10.0 + noise + spike,
                    1.0,
                ),
            ]
        });

        let mut store = TickStore::new();
        store.update(ticks);

        let CycleReport::Ready(cycle) = evaluate(&store, &config(30)).unwrap() else {
            panic!("expected a ready cycle");
        };
        assert_eq!(cycle.observations, 80);
        assert_eq!(
            cycle.alert.is_some(),
            cycle.latest_zscore().abs() > 2.0
        );
    }
}
