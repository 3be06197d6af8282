//! In-memory notification store.
//!
//! Mirrors the Postgres semantics closely enough to drive the worker and the HTTP layer in
//! tests: ids are assigned sequentially, pending rows are listed in creation order, mark-sent
//! is conditional and delete is unconditional. Each create publishes the row as the same JSON
//! payload the database trigger emits, and subscribers decode it through [`feed::run_feed`].
//!
//! [`MemoryStore::close`] simulates losing the database: every operation then fails with
//! [`StoreError::Closed`] and running live feeds terminate.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use courier_common::error::StoreError;
use courier_common::shutdown::Shutdown;
use courier_common::types::{
    DeliveryState, NewNotification, Notification, NotificationId, NotificationStatus,
};

use crate::feed::{self, PayloadSource};
use crate::{NotificationStore, StoreResult};

const FEED_BUFFER: usize = 1024;

#[derive(Debug)]
struct State {
    next_id: NotificationId,
    rows: BTreeMap<NotificationId, Notification>,
    feed: Option<broadcast::Sender<String>>,
}

/// Thread-safe in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Feed("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_BUFFER);
        Self {
            state: Mutex::new(State {
                next_id: 1,
                rows: BTreeMap::new(),
                feed: Some(feed),
            }),
        }
    }

    /// Simulate connection loss.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.feed = None;
        }
    }

    /// Number of stored rows, sent or not.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn open(&self) -> StoreResult<MutexGuard<'_, State>> {
        let state = self.state.lock().map_err(poisoned)?;
        if state.feed.is_none() {
            return Err(StoreError::Closed);
        }
        Ok(state)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, new: &NewNotification) -> StoreResult<NotificationId> {
        let mut state = self.open()?;
        let id = state.next_id;
        state.next_id += 1;

        let notification = Notification {
            id,
            notification_type: new.notification_type,
            recipient: new.recipient.clone(),
            created_at: Utc::now(),
            state: DeliveryState::Pending,
        };

        let payload = serde_json::to_string(&notification)
            .map_err(|e| StoreError::Feed(e.to_string()))?;
        state.rows.insert(id, notification);

        if let Some(feed) = &state.feed {
            // No subscribers is fine.
            let _ = feed.send(payload);
        }

        Ok(id)
    }

    async fn find_by_id(&self, id: NotificationId) -> StoreResult<Option<Notification>> {
        Ok(self.open()?.rows.get(&id).cloned())
    }

    async fn find_status_by_id(
        &self,
        id: NotificationId,
    ) -> StoreResult<Option<NotificationStatus>> {
        Ok(self.open()?.rows.get(&id).map(Notification::status))
    }

    async fn delete_by_id(&self, id: NotificationId) -> StoreResult<bool> {
        Ok(self.open()?.rows.remove(&id).is_some())
    }

    async fn mark_sent(&self, id: NotificationId) -> StoreResult<bool> {
        let mut state = self.open()?;
        match state.rows.get_mut(&id) {
            Some(row) if !row.is_sent() => {
                row.state = DeliveryState::Sent { at: Utc::now() };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_pending(&self) -> StoreResult<Vec<Notification>> {
        // Ids are assigned in creation order, so key order is FIFO.
        Ok(self
            .open()?
            .rows
            .values()
            .filter(|n| !n.is_sent())
            .cloned()
            .collect())
    }

    async fn subscribe(
        &self,
        sink: mpsc::Sender<Notification>,
        shutdown: Shutdown,
    ) -> StoreResult<JoinHandle<()>> {
        let receiver = match &self.open()?.feed {
            Some(feed) => feed.subscribe(),
            None => return Err(StoreError::Closed),
        };

        Ok(tokio::spawn(async move {
            feed::run_feed(BroadcastSource { receiver }, sink, shutdown).await;
        }))
    }
}

struct BroadcastSource {
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl PayloadSource for BroadcastSource {
    async fn next_payload(&mut self) -> Result<Option<String>, StoreError> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Ok(Some(payload)),
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Live feed lagged; notifications left for the backlog");
                }
            }
        }
    }
}
