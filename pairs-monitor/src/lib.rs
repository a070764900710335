#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cast_lossless,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Pairs-Monitor
//! Orchestration for a live two-instrument pairs monitor.
//!
//! A [`Session`](session::Session) owns the feed, its buffer and the tick store. On every
//! refresh the binary calls [`Session::ingest`](session::Session::ingest) followed by
//! [`evaluate`](pipeline::evaluate), which resamples both instruments, joins their bars and
//! either reports that more data is needed or returns the full analytics for the cycle.

/// Environment-driven [`MonitorConfig`](config::MonitorConfig).
pub mod config;

/// Per-cycle resample, align, analyse and alert pipeline.
pub mod pipeline;

/// [`Session`](session::Session) context with explicit start and stop.
pub mod session;
