#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cast_lossless,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Pairs-Data
//! Live trade ingestion for a pairs-trading monitor.
//!
//! * **FeedClient**: one supervised WebSocket connection per instrument, each with its own
//!   reconnect loop, idle-read timeout and backoff.
//! * **TickBuffer**: bounded, drop-oldest FIFO shared between every connection task and the
//!   single consumer that drains it.
//! * **TickStore**: append-only tick history that discards exact duplicates and resamples
//!   ticks into last-price [`Bar`](bar::Bar)s at a caller-selected [`Granularity`].
//!
//! ## Example
//! ```rust,no_run
//! use pairs_data::{
//!     buffer::TickBuffer,
//!     feed::{FeedClient, FeedConfig},
//!     store::TickStore,
//!     tick::Granularity,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let buffer = TickBuffer::default();
//!     let mut feed = FeedClient::new(FeedConfig::default(), buffer.clone());
//!     feed.start(["BTCUSDT", "ETHUSDT"]).expect("valid instruments");
//!
//!     let mut store = TickStore::new();
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     store.update(buffer.drain());
//!
//!     let bars = store.resample("BTCUSDT", Granularity::Second);
//!     println!("{} one-second bars", bars.len());
//!
//!     feed.stop().await;
//! }
//! ```

/// [`Bar`](bar::Bar) output of resampling and the timestamp join of two bar series.
pub mod bar;

/// Bounded drop-oldest [`TickBuffer`](buffer::TickBuffer).
pub mod buffer;

/// All errors generated in `pairs-data`.
pub mod error;

/// [`FeedClient`](feed::FeedClient) connections, wire message decoding and reconnect policy.
pub mod feed;

/// Deduplicating [`TickStore`](store::TickStore).
pub mod store;

/// Stream adapters used by the feed connections.
pub mod streams;

/// [`Tick`](tick::Tick) and [`Granularity`](tick::Granularity) definitions.
pub mod tick;

pub use bar::{AlignedSeries, Bar, align};
pub use buffer::{DEFAULT_TICK_BUFFER_CAPACITY, TickBuffer};
pub use error::DataError;
pub use feed::{ConnectionStatus, FeedClient, FeedConfig};
pub use store::TickStore;
pub use tick::{Granularity, Tick};
