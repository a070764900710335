use crate::error::DataError;
use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{num::NonZeroU64, str::FromStr};

/// Normalised public trade for a single instrument.
///
/// Produced by the [`FeedClient`](crate::feed::FeedClient) from one raw trade event and never
/// mutated afterwards.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, Constructor)]
pub struct Tick {
    pub time: DateTime<Utc>,
    pub instrument: SmolStr,
    pub price: f64,
    pub quantity: f64,
}

impl Tick {
    /// Price must be finite and strictly positive, quantity finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite()
            && self.price > 0.0
            && self.quantity.is_finite()
            && self.quantity >= 0.0
    }

    pub(crate) fn key(&self) -> TickKey {
        TickKey {
            instrument: self.instrument.clone(),
            secs: self.time.timestamp(),
            nanos: self.time.timestamp_subsec_nanos(),
            price: canonical_bits(self.price),
            quantity: canonical_bits(self.quantity),
        }
    }
}

/// Exact-equality identity of a [`Tick`].
///
/// `f64` is not `Eq`, so prices and quantities are compared on their bit patterns with
/// `-0.0` folded onto `0.0`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct TickKey {
    instrument: SmolStr,
    secs: i64,
    nanos: u32,
    price: u64,
    quantity: u64,
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Width of the fixed time buckets used when resampling ticks into bars.
///
/// Buckets are aligned to absolute clock boundaries (multiples of the width since the UNIX
/// epoch), so bars from different instruments at the same granularity share bucket
/// timestamps.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize, Display)]
pub enum Granularity {
    #[display("1s")]
    Second,
    #[display("1m")]
    Minute,
    #[display("5m")]
    FiveMinutes,
    #[display("{_0}ms")]
    Millis(NonZeroU64),
}

impl Granularity {
    /// Construct a custom bucket width, eg/ `Granularity::millis(250)` for sub-second bars.
    pub fn millis(width: u64) -> Result<Self, DataError> {
        NonZeroU64::new(width)
            .map(Self::Millis)
            .ok_or_else(|| DataError::UnsupportedGranularity(format!("{width}ms")))
    }

    /// Bucket width in milliseconds.
    pub fn width_millis(&self) -> i64 {
        match self {
            Self::Second => 1_000,
            Self::Minute => 60_000,
            Self::FiveMinutes => 300_000,
            Self::Millis(width) => i64::try_from(width.get()).unwrap_or(i64::MAX),
        }
    }

    /// Start of the bucket containing `time`, in epoch milliseconds.
    pub fn bucket_start(&self, time: DateTime<Utc>) -> i64 {
        let millis = time.timestamp_millis();
        millis - millis.rem_euclid(self.width_millis())
    }
}

impl FromStr for Granularity {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim();
        match normalised {
            "1s" | "1S" | "1sec" => Ok(Self::Second),
            "1m" | "1min" | "1T" => Ok(Self::Minute),
            "5m" | "5min" | "5T" => Ok(Self::FiveMinutes),
            other => other
                .strip_suffix("ms")
                .and_then(|width| width.parse::<u64>().ok())
                .ok_or_else(|| DataError::UnsupportedGranularity(value.to_string()))
                .and_then(Self::millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_tick_is_valid() {
        struct TestCase {
            input: Tick,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: positive price, positive quantity
                input: Tick::new(time(1), "BTCUSDT".into(), 100.0, 0.5),
                expected: true,
            },
            TestCase {
                // TC1: zero quantity is allowed
                input: Tick::new(time(1), "BTCUSDT".into(), 100.0, 0.0),
                expected: true,
            },
            TestCase {
                // TC2: zero price is rejected
                input: Tick::new(time(1), "BTCUSDT".into(), 0.0, 1.0),
                expected: false,
            },
            TestCase {
                // TC3: negative quantity is rejected
                input: Tick::new(time(1), "BTCUSDT".into(), 100.0, -1.0),
                expected: false,
            },
            TestCase {
                // TC4: NaN price is rejected
                input: Tick::new(time(1), "BTCUSDT".into(), f64::NAN, 1.0),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.is_valid(), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_tick_key_folds_negative_zero() {
        let a = Tick::new(time(5), "ETHUSDT".into(), 10.0, 0.0);
        let b = Tick::new(time(5), "ETHUSDT".into(), 10.0, -0.0);
        assert_eq!(a.key(), b.key());

        let c = Tick::new(time(6), "ETHUSDT".into(), 10.0, 0.0);
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_granularity_from_str() {
        struct TestCase {
            input: &'static str,
            expected: Option<Granularity>,
        }

        let tests = vec![
            TestCase {
                // TC0: one second
                input: "1s",
                expected: Some(Granularity::Second),
            },
            TestCase {
                // TC1: one minute, pandas offset alias
                input: "1T",
                expected: Some(Granularity::Minute),
            },
            TestCase {
                // TC2: five minutes with surrounding whitespace
                input: " 5m ",
                expected: Some(Granularity::FiveMinutes),
            },
            TestCase {
                // TC3: custom sub-second width
                input: "250ms",
                expected: Some(Granularity::millis(250).unwrap()),
            },
            TestCase {
                // TC4: zero width is unsupported
                input: "0ms",
                expected: None,
            },
            TestCase {
                // TC5: unknown alias
                input: "1h",
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.parse::<Granularity>().ok();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_granularity_display_round_trips_through_from_str() {
        for granularity in [
            Granularity::Second,
            Granularity::Minute,
            Granularity::FiveMinutes,
            Granularity::millis(500).unwrap(),
        ] {
            assert_eq!(granularity.to_string().parse::<Granularity>().unwrap(), granularity);
        }
    }

    #[test]
    fn test_bucket_start_aligns_to_clock_boundaries() {
        let minute = Granularity::Minute;
        assert_eq!(minute.bucket_start(time(0)), 0);
        assert_eq!(minute.bucket_start(time(59_999)), 0);
        assert_eq!(minute.bucket_start(time(60_000)), 60_000);
        assert_eq!(minute.bucket_start(time(1_700_000_123_456)), 1_700_000_100_000);

        // Pre-epoch instants still floor towards negative infinity
        assert_eq!(Granularity::Second.bucket_start(time(-1)), -1_000);
    }
}
