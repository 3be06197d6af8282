//! Durable notification store.
//!
//! [`NotificationStore`] is the single source of truth for notifications and their delivery
//! state. It is consumed by the HTTP adapter (create/find/delete) and by the worker
//! (pending scan, live feed, mark-sent).
//!
//! Two implementations are provided:
//! - [`postgres::PgNotificationStore`] backed by a `notifications` table and a
//!   `pending_notifications` LISTEN/NOTIFY channel fed by an insert trigger
//! - [`memory::MemoryStore`] with identical semantics, for tests and local runs

pub mod feed;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use courier_common::error::StoreError;
use courier_common::shutdown::Shutdown;
use courier_common::types::{
    NewNotification, Notification, NotificationId, NotificationStatus,
};

pub use memory::MemoryStore;
pub use postgres::PgNotificationStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Capability interface over the notification table.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new pending notification and return its assigned id.
    ///
    /// Input is expected to be validated by the caller; the backing store still enforces
    /// its own constraints and reports violations as [`StoreError::Database`].
    async fn create(&self, new: &NewNotification) -> StoreResult<NotificationId>;

    async fn find_by_id(&self, id: NotificationId) -> StoreResult<Option<Notification>>;

    async fn find_status_by_id(&self, id: NotificationId)
    -> StoreResult<Option<NotificationStatus>>;

    /// Remove a notification regardless of its delivery state. Returns whether it existed.
    async fn delete_by_id(&self, id: NotificationId) -> StoreResult<bool>;

    /// Transition a pending notification to sent.
    ///
    /// Returns `false` when the notification is already sent or does not exist. Concurrent
    /// callers racing on the same id see exactly one `true`.
    async fn mark_sent(&self, id: NotificationId) -> StoreResult<bool>;

    /// Snapshot of every pending notification, oldest first.
    async fn list_pending(&self) -> StoreResult<Vec<Notification>>;

    /// Start forwarding newly created notifications into `sink`.
    ///
    /// Fails if the subscription cannot be established. Once running, the returned task ends
    /// (dropping `sink`) when `shutdown` fires, when the sink's receiver is gone, or when the
    /// underlying connection is lost. It never reconnects.
    async fn subscribe(
        &self,
        sink: mpsc::Sender<Notification>,
        shutdown: Shutdown,
    ) -> StoreResult<JoinHandle<()>>;
}
