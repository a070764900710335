use chrono::{DateTime, Utc};
use derive_more::Constructor;
use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Resampled bar for one bucket of a [`Granularity`](crate::tick::Granularity).
///
/// `price` is the price of the last tick in the bucket and `quantity` the sum of every tick
/// quantity in the bucket. `time` is the bucket start.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize, Constructor)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub instrument: SmolStr,
    pub price: f64,
    pub quantity: f64,
}

/// Two price series joined on bar timestamp.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct AlignedSeries {
    pub time: Vec<DateTime<Utc>>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Inner-join two bar series on timestamp, keeping only buckets present in both with finite
/// prices.
///
/// Both inputs must be sorted ascending by `time`, as returned by
/// [`TickStore::resample`](crate::store::TickStore::resample).
pub fn align(x: &[Bar], y: &[Bar]) -> AlignedSeries {
    x.iter()
        .merge_join_by(y.iter(), |x, y| x.time.cmp(&y.time))
        .filter_map(|pair| match pair {
            EitherOrBoth::Both(x, y) if x.price.is_finite() && y.price.is_finite() => {
                Some((x.time, x.price, y.price))
            }
            _ => None,
        })
        .fold(AlignedSeries::default(), |mut series, (time, x, y)| {
            series.time.push(time);
            series.x.push(x);
            series.y.push(y);
            series
        })
}
