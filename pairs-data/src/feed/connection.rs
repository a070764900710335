use super::{
    ConnectionStatus, FeedConfig, FeedStats,
    backoff::Backoff,
    message::{FeedMessage, parse_message},
};
use crate::{buffer::TickBuffer, error::DataError, streams::timeout::TimeoutStream};
use futures::{SinkExt, StreamExt};
use smol_str::SmolStr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Everything a connection task needs, owned by the task.
#[derive(Debug)]
pub(crate) struct ConnectionContext {
    pub instrument: SmolStr,
    pub url: Url,
    pub config: FeedConfig,
    pub buffer: TickBuffer,
    pub stats: Arc<FeedStats>,
    pub status_tx: watch::Sender<ConnectionStatus>,
}

/// Why a connected session ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Disconnected(String),
}

/// What happened to a single decoded text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ingest {
    Accepted { evicted: bool },
    Ignored,
    Rejected,
}

/// Connection loop with auto-reconnect for one instrument.
///
/// Runs until shutdown is signalled, the owning [`FeedClient`](super::FeedClient) is dropped,
/// or a non-recoverable [`DataError`] occurs.
pub(crate) async fn run_connection(
    context: ConnectionContext,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let instrument = context.instrument.clone();
    let mut backoff = Backoff::new(context.config.backoff.clone());

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        context.status_tx.send_replace(ConnectionStatus::Reconnecting);

        match run_session(&context, &mut backoff, &mut shutdown_rx).await {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Disconnected(reason)) => {
                warn!(%instrument, %reason, "trade stream disconnected");
            }
            Err(error) if error.is_recoverable() => {
                warn!(%instrument, %error, "trade stream connection failed");
            }
            Err(error) => {
                error!(%instrument, %error, "trade stream failed with unrecoverable error");
                break;
            }
        }

        context.status_tx.send_replace(ConnectionStatus::Disconnected);
        context.stats.record_reconnect();

        let delay = backoff.next_delay();
        debug!(
            %instrument,
            attempt = backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "waiting before reconnecting"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_requested(&mut shutdown_rx) => break,
        }
    }

    context.status_tx.send_replace(ConnectionStatus::Disconnected);
    info!(%instrument, "trade stream stopped");
}

/// Connect once and pump messages into the buffer until the session ends.
async fn run_session(
    context: &ConnectionContext,
    backoff: &mut Backoff,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<SessionEnd, DataError> {
    let connect = tokio::time::timeout(
        context.config.connect_timeout,
        connect_async(context.url.as_str()),
    );

    let (websocket, _) = tokio::select! {
        result = connect => match result {
            Ok(Ok(connected)) => connected,
            Ok(Err(error)) => return Err(DataError::from(error)),
            Err(_) => return Err(DataError::ConnectTimeout(context.config.connect_timeout)),
        },
        _ = shutdown_requested(shutdown_rx) => return Ok(SessionEnd::Shutdown),
    };

    info!(instrument = %context.instrument, url = %context.url, "connected to trade stream");
    context.status_tx.send_replace(ConnectionStatus::Connected);
    backoff.reset();

    let (mut write, read) = websocket.split();
    let mut read = TimeoutStream::new(read, context.config.read_timeout);

    loop {
        let message = tokio::select! {
            message = read.next() => message,
            _ = shutdown_requested(shutdown_rx) => {
                if let Err(error) = write.send(Message::Close(None)).await {
                    debug!(instrument = %context.instrument, %error, "failed to send close frame");
                }
                return Ok(SessionEnd::Shutdown);
            }
        };

        match message {
            Some(Ok(Message::Text(text))) => {
                ingest_text(&text, &context.buffer, &context.stats);
            }
            Some(Ok(Message::Close(frame))) => {
                let reason = frame
                    .map(|frame| format!("server closed connection: {} {}", frame.code, frame.reason.as_str()))
                    .unwrap_or_else(|| "server closed connection".to_string());
                return Ok(SessionEnd::Disconnected(reason));
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Heartbeat messages - tungstenite handles these automatically
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => return Err(DataError::from(error)),
            None if read.timed_out() => {
                return Ok(SessionEnd::Disconnected(format!(
                    "no data received for {:?}",
                    context.config.read_timeout
                )));
            }
            None => return Ok(SessionEnd::Disconnected("stream ended".to_string())),
        }
    }
}

/// Resolves once shutdown is signalled or the shutdown sender is dropped.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Decode one text frame and push any resulting trade into the buffer.
pub(crate) fn ingest_text(text: &str, buffer: &TickBuffer, stats: &FeedStats) -> Ingest {
    match parse_message(text) {
        Ok(FeedMessage::Trade(tick)) => {
            stats.record_trade();
            let evicted = buffer.push(tick).is_some();
            if evicted {
                trace!("TickBuffer full, evicted oldest tick");
            }
            Ingest::Accepted { evicted }
        }
        Ok(FeedMessage::Ignored { event }) => {
            stats.record_ignored();
            trace!(?event, "ignoring non-trade message");
            Ingest::Ignored
        }
        Err(error) => {
            stats.record_rejected();
            debug!(
                %error,
                payload = %text.chars().take(256).collect::<String>(),
                "dropping undecodable message"
            );
            Ingest::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedStatsSnapshot;

    #[test]
    fn test_ingest_text() {
        struct TestCase {
            input: &'static str,
            expected: Ingest,
        }

        let buffer = TickBuffer::new(1);
        let stats = FeedStats::default();

        let tests = vec![
            TestCase {
                // TC0: trade into empty buffer
                input: r#"{"e":"trade","T":1700000000000,"s":"BTCUSDT","p":"37000.0","q":"0.1"}"#,
                expected: Ingest::Accepted { evicted: false },
            },
            TestCase {
                // TC1: second trade evicts the first from a capacity one buffer
                input: r#"{"e":"trade","T":1700000000001,"s":"BTCUSDT","p":"37001.0","q":"0.2"}"#,
                expected: Ingest::Accepted { evicted: true },
            },
            TestCase {
                // TC2: non-trade event
                input: r#"{"e":"markPriceUpdate","s":"BTCUSDT"}"#,
                expected: Ingest::Ignored,
            },
            TestCase {
                // TC3: garbage
                input: "not json",
                expected: Ingest::Rejected,
            },
            TestCase {
                // TC4: negative quantity
                input: r#"{"e":"trade","T":1700000000002,"s":"BTCUSDT","p":"37001.0","q":"-1"}"#,
                expected: Ingest::Rejected,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = ingest_text(test.input, &buffer, &stats);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }

        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].price, 37001.0);

        assert_eq!(
            stats.snapshot(),
            FeedStatsSnapshot {
                trades: 2,
                ignored: 1,
                rejected: 2,
                reconnects: 0,
            }
        );
    }
}
