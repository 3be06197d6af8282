//! Backlog scanner: catch-up pass over notifications that are still pending at startup.
//!
//! Covers everything created while no worker was running, and everything whose send failed
//! on a previous run. Runs once per process.

use std::sync::Arc;

use tokio::sync::mpsc;

use courier_common::error::StoreError;
use courier_common::shutdown::Shutdown;
use courier_common::types::Notification;
use courier_store::NotificationStore;

pub struct BacklogScanner {
    store: Arc<dyn NotificationStore>,
}

impl BacklogScanner {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Push every pending notification into `queue`, oldest first.
    ///
    /// Shutdown is checked before each item. Returns how many items were handed off.
    pub async fn run(
        &self,
        queue: mpsc::Sender<Notification>,
        mut shutdown: Shutdown,
    ) -> Result<usize, StoreError> {
        let pending = self.store.list_pending().await?;
        let total = pending.len();
        tracing::info!(pending = total, "Processing pending notifications");

        let mut queued = 0;
        for notification in pending {
            if shutdown.is_triggered() {
                tracing::info!(queued, total, "Stopping pending notifications processing due to shutdown");
                return Ok(queued);
            }

            tokio::select! {
                _ = shutdown.triggered() => {
                    tracing::info!(queued, total, "Stopping pending notifications processing due to shutdown");
                    return Ok(queued);
                }
                sent = queue.send(notification) => {
                    if sent.is_err() {
                        tracing::warn!(queued, total, "Dispatch queue closed during backlog scan");
                        return Ok(queued);
                    }
                }
            }

            queued += 1;
        }

        tracing::info!(queued, "Backlog scan complete");
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_common::shutdown;
    use courier_common::types::{NewNotification, NotificationType};
    use courier_store::MemoryStore;

    async fn store_with(recipients: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for recipient in recipients {
            store
                .create(&NewNotification::new(NotificationType::Email, *recipient))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_backlog_is_fifo_and_skips_sent() {
        let store = store_with(&["t1@example.com", "t2@example.com", "t3@example.com", "t4@example.com"]).await;
        store.mark_sent(2).await.unwrap();

        let (_trigger, shutdown) = shutdown::channel();
        let (tx, mut rx) = mpsc::channel(8);
        let queued = BacklogScanner::new(store).run(tx, shutdown).await.unwrap();
        assert_eq!(queued, 3);

        let mut order = Vec::new();
        while let Some(n) = rx.recv().await {
            order.push(n.recipient);
        }
        assert_eq!(order, vec!["t1@example.com", "t3@example.com", "t4@example.com"]);
    }

    #[tokio::test]
    async fn test_backlog_stops_when_shutdown_already_triggered() {
        let store = store_with(&["a@example.com", "b@example.com"]).await;
        let (trigger, shutdown) = shutdown::channel();
        trigger.trigger();

        let (tx, mut rx) = mpsc::channel(8);
        let queued = BacklogScanner::new(store).run(tx, shutdown).await.unwrap();
        assert_eq!(queued, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_backlog_stops_on_shutdown_while_queue_full() {
        let store = store_with(&["a@example.com", "b@example.com", "c@example.com"]).await;
        let (trigger, shutdown) = shutdown::channel();
        let (tx, mut rx) = mpsc::channel(1);

        let scan = tokio::spawn(async move { BacklogScanner::new(store).run(tx, shutdown).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.trigger();

        let queued = scan.await.unwrap().unwrap();
        assert_eq!(queued, 1);
        assert_eq!(rx.recv().await.unwrap().recipient, "a@example.com");
    }

    #[tokio::test]
    async fn test_backlog_reports_store_errors() {
        let store = store_with(&["a@example.com"]).await;
        store.close();
        let (_trigger, shutdown) = shutdown::channel();
        let (tx, _rx) = mpsc::channel(8);

        let result = BacklogScanner::new(store).run(tx, shutdown).await;
        assert!(matches!(result, Err(StoreError::Closed)));
    }
}
