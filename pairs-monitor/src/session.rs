use pairs_data::{DataError, FeedClient, FeedConfig, TickBuffer, TickStore};
use smol_str::SmolStr;
use tracing::info;

/// Live context of one monitor run: the [`FeedClient`], the [`TickBuffer`] it fills and the
/// [`TickStore`] the buffer is drained into.
///
/// The buffer is the only state shared with the connection tasks. The store belongs to the
/// caller of [`Session::ingest`].
#[derive(Debug)]
pub struct Session {
    instruments: Vec<SmolStr>,
    feed: FeedClient,
    store: TickStore,
}

impl Session {
    pub fn new<Instruments, S>(feed: FeedConfig, buffer_capacity: usize, instruments: Instruments) -> Self
    where
        Instruments: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            instruments: instruments
                .into_iter()
                .map(|instrument| SmolStr::new(instrument.as_ref()))
                .collect(),
            feed: FeedClient::new(feed, TickBuffer::new(buffer_capacity)),
            store: TickStore::new(),
        }
    }

    /// Start one trade stream per instrument. Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<(), DataError> {
        self.feed.start(&self.instruments)?;
        info!(instruments = ?self.instruments, "Session started");
        Ok(())
    }

    /// Drain every buffered [`Tick`](pairs_data::Tick) into the store, returning the number
    /// of ticks accepted after de-duplication.
    pub fn ingest(&mut self) -> usize {
        let drained = self.feed.buffer().drain();
        self.store.update(drained)
    }

    pub fn store(&self) -> &TickStore {
        &self.store
    }

    pub fn feed(&self) -> &FeedClient {
        &self.feed
    }

    pub fn buffer(&self) -> &TickBuffer {
        self.feed.buffer()
    }

    /// Stop every trade stream and move any ticks still buffered into the store.
    pub async fn stop(&mut self) {
        self.feed.stop().await;
        let accepted = self.ingest();
        info!(accepted, total = self.store.len(), "Session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use pairs_data::Tick;

    fn tick(secs: i64, instrument: &str, price: f64) -> Tick {
        Tick::new(
            DateTime::from_timestamp(secs, 0).unwrap(),
            SmolStr::new(instrument),
            price,
            1.0,
        )
    }

    #[test]
    fn test_ingest_drains_buffer_into_store() {
        let mut session = Session::new(FeedConfig::default(), 3, ["BTCUSDT", "ETHUSDT"]);

        for secs in 0..5 {
            session.buffer().push(tick(secs, "BTCUSDT", 100.0 + secs as f64));
        }
        assert_eq!(session.buffer().len(), 3);
        assert_eq!(session.buffer().evicted(), 2);

        assert_eq!(session.ingest(), 3);
        assert!(session.buffer().is_empty());
        assert_eq!(session.store().count("BTCUSDT"), 3);

        // Re-delivered ticks are de-duplicated by the store
        session.buffer().push(tick(4, "BTCUSDT", 104.0));
        session.buffer().push(tick(5, "ETHUSDT", 2_000.0));
        assert_eq!(session.ingest(), 1);
        assert_eq!(session.store().len(), 4);
        assert_eq!(session.ingest(), 0);
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_instrument() {
        let mut session = Session::new(FeedConfig::default(), 10, ["BTC-USDT"]);
        assert!(matches!(
            session.start(),
            Err(DataError::InvalidUrl { .. })
        ));
        assert!(!session.feed().is_running());
        session.stop().await;
    }
}
