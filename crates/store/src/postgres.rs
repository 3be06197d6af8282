//! PostgreSQL-backed notification store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use courier_common::error::StoreError;
use courier_common::shutdown::Shutdown;
use courier_common::types::{
    DeliveryState, NewNotification, Notification, NotificationId, NotificationStatus,
    NotificationType,
};

use crate::feed::{self, PayloadSource};
use crate::{NotificationStore, StoreResult};

const SELECT_COLUMNS: &str = "SELECT id, type, recipient, created_at, sent_at FROM notifications";

/// Row shape of the `notifications` table.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    #[sqlx(rename = "type")]
    notification_type: NotificationType,
    recipient: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            notification_type: row.notification_type,
            recipient: row.recipient,
            created_at: row.created_at,
            state: DeliveryState::from(row.sent_at),
        }
    }
}

/// Notification store on a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, new: &NewNotification) -> StoreResult<NotificationId> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO notifications (type, recipient) VALUES ($1, $2) RETURNING id",
        )
        .bind(new.notification_type.to_string())
        .bind(&new.recipient)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            notification_id = id,
            notification_type = %new.notification_type,
            "Notification created"
        );

        Ok(id)
    }

    async fn find_by_id(&self, id: NotificationId) -> StoreResult<Option<Notification>> {
        let row: Option<NotificationRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Notification::from))
    }

    async fn find_status_by_id(
        &self,
        id: NotificationId,
    ) -> StoreResult<Option<NotificationStatus>> {
        let row: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as("SELECT sent_at FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(sent_at,)| DeliveryState::from(sent_at).into()))
    }

    async fn delete_by_id(&self, id: NotificationId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(notification_id = id, "Notification deleted");
        }

        Ok(deleted)
    }

    async fn mark_sent(&self, id: NotificationId) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET sent_at = NOW() WHERE id = $1 AND sent_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_pending(&self) -> StoreResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE sent_at IS NULL ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn subscribe(
        &self,
        sink: mpsc::Sender<Notification>,
        shutdown: Shutdown,
    ) -> StoreResult<JoinHandle<()>> {
        // Holds one pool connection for the lifetime of the feed.
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(feed::CHANNEL).await?;

        tracing::info!(channel = feed::CHANNEL, "Listening for new notifications");

        Ok(tokio::spawn(async move {
            feed::run_feed(PgFeedSource { listener }, sink, shutdown).await;
        }))
    }
}

/// `PgListener` adapter.
///
/// Uses `try_recv` rather than `recv`: the latter silently reconnects, which would hide the
/// gap during which notifications were lost.
struct PgFeedSource {
    listener: PgListener,
}

#[async_trait]
impl PayloadSource for PgFeedSource {
    async fn next_payload(&mut self) -> Result<Option<String>, StoreError> {
        let notification = self.listener.try_recv().await?;
        Ok(notification.map(|n| n.payload().to_owned()))
    }
}
