//! Live event feed.
//!
//! Turns a stream of raw change-notification payloads into [`Notification`] values pushed into
//! the dispatch queue. The loop is backend agnostic: Postgres feeds it from a `PgListener`,
//! the in-memory store from a broadcast channel carrying the same JSON the trigger emits.
//!
//! Rules:
//! - a payload that fails to deserialize is logged and dropped, the feed keeps going
//! - a source error or a lost connection ends the feed; there is no reconnect
//! - handing an item to the sink races against shutdown, so a stalled consumer never
//!   blocks the feed past cancellation

use async_trait::async_trait;
use tokio::sync::mpsc;

use courier_common::error::StoreError;
use courier_common::shutdown::Shutdown;
use courier_common::types::Notification;

/// Channel name the insert trigger notifies on.
pub const CHANNEL: &str = "pending_notifications";

/// Source of raw change-notification payloads.
#[async_trait]
pub trait PayloadSource: Send {
    /// Wait for the next payload.
    ///
    /// `Ok(None)` means the connection was closed.
    async fn next_payload(&mut self) -> Result<Option<String>, StoreError>;
}

/// Why a feed stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedExit {
    Shutdown,
    ConsumerGone,
    ConnectionLost,
    SourceFailed,
}

/// Decode one trigger payload.
pub fn decode_payload(payload: &str) -> Result<Notification, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Drive `source` until shutdown, consumer loss or a fatal source error.
pub async fn run_feed<S>(
    mut source: S,
    sink: mpsc::Sender<Notification>,
    mut shutdown: Shutdown,
) -> FeedExit
where
    S: PayloadSource,
{
    tracing::info!(channel = CHANNEL, "Live feed started");

    let exit = loop {
        if shutdown.is_triggered() {
            break FeedExit::Shutdown;
        }

        let payload = tokio::select! {
            _ = shutdown.triggered() => break FeedExit::Shutdown,
            next = source.next_payload() => match next {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    tracing::error!("Live feed connection lost");
                    break FeedExit::ConnectionLost;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Error while waiting for notifications");
                    break FeedExit::SourceFailed;
                }
            },
        };

        let notification = match decode_payload(&payload) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(error = %e, payload = %payload, "Dropping undecodable notification payload");
                continue;
            }
        };

        tracing::debug!(
            notification_id = notification.id,
            notification_type = %notification.notification_type,
            "Received notification from live feed"
        );

        tokio::select! {
            _ = shutdown.triggered() => break FeedExit::Shutdown,
            sent = sink.send(notification) => {
                if sent.is_err() {
                    break FeedExit::ConsumerGone;
                }
            }
        }
    };

    tracing::info!(reason = ?exit, "Live feed stopped");
    exit
}
