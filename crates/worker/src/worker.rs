//! Worker composition: live feed + backlog scanner feeding one dispatch loop.
//!
//! Both producers push into a single bounded queue. The live feed subscribes before the backlog
//! snapshot is taken, so a row created in between shows up on at least one of the two paths.
//! A row seen on both is sent twice and marked once.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use courier_common::error::StoreError;
use courier_common::shutdown::Shutdown;
use courier_store::NotificationStore;

use crate::backlog::BacklogScanner;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::registry::SenderRegistry;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to start live feed: {0}")]
    Store(#[from] StoreError),

    /// The live feed ended without shutdown being requested. The worker cannot see new
    /// notifications until restarted; the restart's backlog scan closes the gap.
    #[error("Live feed terminated unexpectedly")]
    FeedClosed,
}

pub struct Worker {
    store: Arc<dyn NotificationStore>,
    dispatcher: Dispatcher,
    queue_capacity: usize,
}

impl Worker {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        registry: SenderRegistry,
        queue_capacity: usize,
    ) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), Arc::new(registry));
        Self {
            store,
            dispatcher,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Run until `shutdown` fires or the live feed dies.
    pub async fn run(self, shutdown: Shutdown) -> Result<DispatchStats, WorkerError> {
        let (queue_tx, queue_rx) = mpsc::channel(self.queue_capacity);

        let feed = self
            .store
            .subscribe(queue_tx.clone(), shutdown.clone())
            .await?;

        let scanner = BacklogScanner::new(self.store.clone());
        let backlog_shutdown = shutdown.clone();
        let backlog = tokio::spawn(async move {
            if let Err(e) = scanner.run(queue_tx, backlog_shutdown).await {
                tracing::error!(error = %e, "Backlog scan failed; pending notifications wait for the next restart");
            }
        });

        tracing::info!("Waiting for notifications...");
        let stats = self.dispatcher.run(queue_rx, shutdown.clone()).await;

        if let Err(e) = backlog.await {
            tracing::error!(error = %e, "Backlog task panicked");
        }
        if let Err(e) = feed.await {
            tracing::error!(error = %e, "Live feed task panicked");
        }

        tracing::info!(
            delivered = stats.delivered,
            already_marked = stats.already_marked,
            skipped = stats.skipped,
            failed = stats.failed,
            "Dispatch loop stopped"
        );

        if shutdown.is_triggered() {
            Ok(stats)
        } else {
            Err(WorkerError::FeedClosed)
        }
    }
}
