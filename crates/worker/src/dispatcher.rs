//! Dispatch loop.
//!
//! Single consumer of the handoff queue fed by the backlog scanner and the live feed. For each
//! notification: look up the sender by type, send, and on success mark the row sent. Every
//! failure is logged with the notification's id and type and only affects that item.

use std::sync::Arc;

use tokio::sync::mpsc;

use courier_common::shutdown::Shutdown;
use courier_common::types::Notification;
use courier_store::NotificationStore;

use crate::registry::SenderRegistry;

/// Result of processing one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent and transitioned to sent by this call.
    Delivered,
    /// Sent, but another dispatcher had already marked it (or the row is gone).
    AlreadyMarked,
    /// Already sent when received; the sender was not called.
    Skipped,
    NoSender,
    SendFailed,
    StoreFailed,
}

/// Counters accumulated over a dispatch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub already_marked: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered => self.delivered += 1,
            DispatchOutcome::AlreadyMarked => self.already_marked += 1,
            DispatchOutcome::Skipped => self.skipped += 1,
            DispatchOutcome::NoSender | DispatchOutcome::SendFailed | DispatchOutcome::StoreFailed => {
                self.failed += 1
            }
        }
    }

    pub fn processed(&self) -> u64 {
        self.delivered + self.already_marked + self.skipped + self.failed
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    registry: Arc<SenderRegistry>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, registry: Arc<SenderRegistry>) -> Self {
        Self { store, registry }
    }

    /// Process one notification to completion.
    pub async fn process(&self, notification: &Notification) -> DispatchOutcome {
        let id = notification.id;
        let notification_type = notification.notification_type;

        if notification.is_sent() {
            tracing::debug!(notification_id = id, notification_type = %notification_type, "Notification already sent, skipping");
            return DispatchOutcome::Skipped;
        }

        let Some(sender) = self.registry.get(notification_type) else {
            tracing::error!(
                notification_id = id,
                notification_type = %notification_type,
                "No sender registered for notification type"
            );
            return DispatchOutcome::NoSender;
        };

        if let Err(e) = sender.send(notification).await {
            tracing::error!(
                notification_id = id,
                notification_type = %notification_type,
                sender = sender.name(),
                error = %e,
                "Error sending notification"
            );
            return DispatchOutcome::SendFailed;
        }

        match self.store.mark_sent(id).await {
            Ok(true) => {
                tracing::info!(
                    notification_id = id,
                    notification_type = %notification_type,
                    "Notification processed successfully"
                );
                DispatchOutcome::Delivered
            }
            Ok(false) => {
                tracing::warn!(
                    notification_id = id,
                    notification_type = %notification_type,
                    "Notification sent but already marked or deleted"
                );
                DispatchOutcome::AlreadyMarked
            }
            Err(e) => {
                tracing::error!(
                    notification_id = id,
                    notification_type = %notification_type,
                    error = %e,
                    "Error marking notification as sent"
                );
                DispatchOutcome::StoreFailed
            }
        }
    }

    /// Consume `queue` until shutdown or until every producer is gone.
    ///
    /// Shutdown is observed between items; the item in flight always completes.
    pub async fn run(
        &self,
        mut queue: mpsc::Receiver<Notification>,
        mut shutdown: Shutdown,
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    tracing::info!("Stopping dispatch loop due to shutdown");
                    break;
                }
                next = queue.recv() => next,
            };

            let Some(notification) = next else {
                tracing::info!("Dispatch queue closed");
                break;
            };

            let outcome = self.process(&notification).await;
            stats.record(outcome);
        }

        stats
    }
}
