use crate::{
    bar::Bar,
    tick::{Granularity, Tick, TickKey},
};
use chrono::DateTime;
use fnv::FnvHashSet;
use itertools::Itertools;
use smol_str::SmolStr;
use tracing::debug;

/// Append-only history of [`Tick`]s for every instrument, free of exact duplicates.
///
/// Owned by the single consumer that drains the [`TickBuffer`](crate::buffer::TickBuffer);
/// it is not shared across tasks.
#[derive(Debug, Default, Clone)]
pub struct TickStore {
    ticks: Vec<Tick>,
    seen: FnvHashSet<TickKey>,
}

impl TickStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of [`Tick`]s, discarding any tick identical in every field to one
    /// already held (including duplicates within the batch itself).
    ///
    /// Returns the number of ticks accepted.
    pub fn update<I>(&mut self, ticks: I) -> usize
    where
        I: IntoIterator<Item = Tick>,
    {
        let before = self.ticks.len();

        for tick in ticks {
            if self.seen.insert(tick.key()) {
                self.ticks.push(tick);
            }
        }

        let accepted = self.ticks.len() - before;
        if accepted > 0 {
            debug!(accepted, total = self.ticks.len(), "TickStore updated");
        }
        accepted
    }

    /// Resample the ticks of one instrument into one [`Bar`] per non-empty bucket, sorted
    /// ascending by bucket start.
    ///
    /// Within a bucket, ticks are ordered by event time with arrival order breaking ties, so
    /// the bar price is the price of the latest tick and the bar quantity the bucket sum.
    pub fn resample(&self, instrument: &str, granularity: Granularity) -> Vec<Bar> {
        let mut ticks = self
            .ticks
            .iter()
            .filter(|tick| tick.instrument == instrument)
            .collect::<Vec<_>>();

        // Stable sort preserves arrival order for equal timestamps
        ticks.sort_by_key(|tick| tick.time);

        let chunks = ticks
            .into_iter()
            .chunk_by(|tick| granularity.bucket_start(tick.time));

        let bars = chunks
            .into_iter()
            .filter_map(|(bucket, group)| {
                let (price, quantity) = group.fold((None, 0.0), |(_, quantity), tick| {
                    (Some(tick.price), quantity + tick.quantity)
                });

                Some(Bar::new(
                    DateTime::from_timestamp_millis(bucket)?,
                    SmolStr::new(instrument),
                    price?,
                    quantity,
                ))
            })
            .collect::<Vec<_>>();

        bars
    }

    /// Number of ticks held across all instruments.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Number of ticks held for one instrument.
    pub fn count(&self, instrument: &str) -> usize {
        self.ticks
            .iter()
            .filter(|tick| tick.instrument == instrument)
            .count()
    }

    /// Distinct instruments with at least one tick, sorted.
    pub fn instruments(&self) -> Vec<SmolStr> {
        self.ticks
            .iter()
            .map(|tick| tick.instrument.clone())
            .sorted()
            .dedup()
            .collect()
    }

    /// Iterate every held tick in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter()
    }
}
