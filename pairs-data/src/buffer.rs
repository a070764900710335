use crate::tick::Tick;
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// Default number of [`Tick`]s held before the oldest is evicted.
pub const DEFAULT_TICK_BUFFER_CAPACITY: usize = 10_000;

/// Bounded FIFO of [`Tick`]s shared by every feed connection and a single consumer.
///
/// When full, pushing a new tick evicts the oldest one; producers are never blocked. Cloning
/// a `TickBuffer` yields another handle to the same underlying queue.
#[derive(Debug, Clone)]
pub struct TickBuffer {
    inner: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    ticks: Mutex<VecDeque<Tick>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl Default for TickBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_BUFFER_CAPACITY)
    }
}

impl TickBuffer {
    /// Construct a new [`TickBuffer`] holding at most `capacity` ticks (minimum of one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Shared {
                ticks: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                evicted: AtomicU64::new(0),
            }),
        }
    }

    /// Append a [`Tick`], returning the evicted oldest tick if the buffer was full.
    pub fn push(&self, tick: Tick) -> Option<Tick> {
        let evicted = {
            let mut ticks = self.inner.ticks.lock();
            let evicted = if ticks.len() >= self.inner.capacity {
                ticks.pop_front()
            } else {
                None
            };
            ticks.push_back(tick);
            evicted
        };

        if evicted.is_some() {
            self.inner.evicted.fetch_add(1, Ordering::Relaxed);
        }

        evicted
    }

    /// Atomically remove and return every buffered [`Tick`] in arrival order.
    ///
    /// A concurrent `push` lands either in the returned batch or in the next one, never both.
    /// The queue keeps its allocation for the next fill.
    pub fn drain(&self) -> Vec<Tick> {
        self.inner.ticks.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.ticks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.ticks.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Total number of ticks evicted since construction.
    pub fn evicted(&self) -> u64 {
        self.inner.evicted.load(Ordering::Relaxed)
    }
}
