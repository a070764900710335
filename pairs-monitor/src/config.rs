use crate::pipeline::PipelineConfig;
use pairs_analytics::AdfConfig;
use pairs_data::{DEFAULT_TICK_BUFFER_CAPACITY, FeedConfig, Granularity};
use smol_str::SmolStr;
use std::{ops::RangeInclusive, str::FromStr, time::Duration};
use thiserror::Error;

pub const DEFAULT_SYMBOLS: [&str; 2] = ["BTCUSDT", "ETHUSDT"];
pub const DEFAULT_GRANULARITY: Granularity = Granularity::Minute;
pub const DEFAULT_WINDOW: usize = 30;
pub const WINDOW_RANGE: RangeInclusive<usize> = 10..=100;
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;
pub const Z_THRESHOLD_RANGE: RangeInclusive<f64> = 1.0..=3.0;
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(1);

/// Invalid monitor configuration.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid {name}={value}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Runtime configuration of the monitor binary.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Independent leg of the pair, regressed on by `y`.
    pub x: SmolStr,
    pub y: SmolStr,
    pub granularity: Granularity,
    pub window: usize,
    pub z_threshold: f64,
    pub refresh: Duration,
    pub buffer_capacity: usize,
    pub feed: FeedConfig,
    pub adf: AdfConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            x: SmolStr::new(DEFAULT_SYMBOLS[0]),
            y: SmolStr::new(DEFAULT_SYMBOLS[1]),
            granularity: DEFAULT_GRANULARITY,
            window: DEFAULT_WINDOW,
            z_threshold: DEFAULT_Z_THRESHOLD,
            refresh: DEFAULT_REFRESH,
            buffer_capacity: DEFAULT_TICK_BUFFER_CAPACITY,
            feed: FeedConfig::default(),
            adf: AdfConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from environment variables, falling back to defaults for unset variables:
    ///
    /// | Variable                | Default               |
    /// |-------------------------|-----------------------|
    /// | `PAIRS_SYMBOLS`         | `BTCUSDT,ETHUSDT`     |
    /// | `PAIRS_TIMEFRAME`       | `1m`                  |
    /// | `PAIRS_WINDOW`          | `30` (10 to 100)      |
    /// | `PAIRS_Z_THRESHOLD`     | `2.0` (1.0 to 3.0)    |
    /// | `PAIRS_REFRESH_MS`      | `1000`                |
    /// | `PAIRS_BUFFER_CAPACITY` | `10000`               |
    /// | `PAIRS_FEED_URL`        | Binance USD-M futures |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve each variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let (x, y) = match lookup("PAIRS_SYMBOLS") {
            Some(value) => parse_symbols(&value)?,
            None => (defaults.x, defaults.y),
        };

        let granularity = parse_or("PAIRS_TIMEFRAME", &lookup, defaults.granularity)?;

        let window = parse_or("PAIRS_WINDOW", &lookup, defaults.window)?;
        if !WINDOW_RANGE.contains(&window) {
            return Err(ConfigError::invalid(
                "PAIRS_WINDOW",
                &window.to_string(),
                format!("must be within {WINDOW_RANGE:?}"),
            ));
        }

        let z_threshold = parse_or("PAIRS_Z_THRESHOLD", &lookup, defaults.z_threshold)?;
        if !Z_THRESHOLD_RANGE.contains(&z_threshold) {
            return Err(ConfigError::invalid(
                "PAIRS_Z_THRESHOLD",
                &z_threshold.to_string(),
                format!("must be within {Z_THRESHOLD_RANGE:?}"),
            ));
        }

        let refresh_ms = parse_or(
            "PAIRS_REFRESH_MS",
            &lookup,
            defaults.refresh.as_millis() as u64,
        )?;
        if refresh_ms == 0 {
            return Err(ConfigError::invalid("PAIRS_REFRESH_MS", "0", "must be positive"));
        }

        let buffer_capacity = parse_or("PAIRS_BUFFER_CAPACITY", &lookup, defaults.buffer_capacity)?;
        if buffer_capacity == 0 {
            return Err(ConfigError::invalid(
                "PAIRS_BUFFER_CAPACITY",
                "0",
                "must be positive",
            ));
        }

        let feed = match lookup("PAIRS_FEED_URL") {
            Some(url) => {
                let feed = FeedConfig::new(url.trim());
                feed.stream_url(&x)
                    .map_err(|error| ConfigError::invalid("PAIRS_FEED_URL", &url, error.to_string()))?;
                feed
            }
            None => defaults.feed,
        };

        Ok(Self {
            x,
            y,
            granularity,
            window,
            z_threshold,
            refresh: Duration::from_millis(refresh_ms),
            buffer_capacity,
            feed,
            adf: defaults.adf,
        })
    }

    /// Analytics parameters for [`evaluate`](crate::pipeline::evaluate).
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            x: self.x.clone(),
            y: self.y.clone(),
            granularity: self.granularity,
            window: self.window,
            z_threshold: self.z_threshold,
            adf: self.adf,
        }
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| ConfigError::invalid(name, &value, error.to_string())),
        None => Ok(default),
    }
}

fn parse_symbols(value: &str) -> Result<(SmolStr, SmolStr), ConfigError> {
    let symbols = value
        .split(',')
        .map(|symbol| SmolStr::new(symbol.trim().to_ascii_uppercase()))
        .collect::<Vec<_>>();

    match symbols.as_slice() {
        [x, y] if !x.is_empty() && !y.is_empty() && x != y => Ok((x.clone(), y.clone())),
        _ => Err(ConfigError::invalid(
            "PAIRS_SYMBOLS",
            value,
            "expected two distinct comma separated symbols",
        )),
    }
}
