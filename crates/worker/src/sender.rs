//! Channel senders.
//!
//! A sender attempts delivery of one notification and reports success or failure. Success
//! means the message was accepted for delivery by the channel, not that it reached the
//! recipient. Failures are terminal for the attempt; nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use courier_common::types::{Notification, NotificationId, NotificationType};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Delivery capability for a single channel.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn send(&self, notification: &Notification) -> Result<(), SendError>;
}

/// Stand-in for a real provider: logs the delivery and waits a fixed latency.
#[derive(Debug, Clone)]
pub struct SimulatedSender {
    channel: NotificationType,
    latency: Duration,
}

impl SimulatedSender {
    pub fn new(channel: NotificationType, latency: Duration) -> Self {
        Self { channel, latency }
    }
}

#[async_trait]
impl Sender for SimulatedSender {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        tracing::info!(
            notification_id = notification.id,
            channel = %self.channel,
            recipient = %notification.recipient,
            "Sending notification"
        );

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        Ok(())
    }
}

/// Body POSTed to a channel webhook.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    id: NotificationId,
    #[serde(rename = "type")]
    notification_type: NotificationType,
    recipient: &'a str,
    created_at: DateTime<Utc>,
}

/// Delivers by POSTing the notification as JSON to a provider endpoint.
///
/// Any non-2xx response is a failed attempt.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    channel: NotificationType,
    url: String,
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(channel: NotificationType, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            channel,
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl Sender for WebhookSender {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        let payload = WebhookPayload {
            id: notification.id,
            notification_type: notification.notification_type,
            recipient: &notification.recipient,
            created_at: notification.created_at,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(
            notification_id = notification.id,
            channel = %self.channel,
            status = response.status().as_u16(),
            "Webhook accepted notification"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::TimeZone;
    use courier_common::types::DeliveryState;
    use tokio::sync::mpsc;

    fn notification() -> Notification {
        Notification {
            id: 42,
            notification_type: NotificationType::Sms,
            recipient: "1234567890".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            state: DeliveryState::Pending,
        }
    }

    async fn accept(
        State(tx): State<mpsc::Sender<serde_json::Value>>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        let _ = tx.send(body).await;
        StatusCode::ACCEPTED
    }

    async fn unavailable() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    /// Serve a provider stub on an ephemeral port and return its base URL.
    async fn provider_stub() -> (String, mpsc::Receiver<serde_json::Value>) {
        let (tx, rx) = mpsc::channel(4);
        let app = Router::new()
            .route("/accept", post(accept))
            .route("/unavailable", post(unavailable))
            .with_state(tx);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_simulated_sender_succeeds() {
        let sender = SimulatedSender::new(NotificationType::Sms, Duration::ZERO);
        assert!(sender.send(&notification()).await.is_ok());
        assert_eq!(sender.name(), "simulated");
    }

    #[tokio::test]
    async fn test_webhook_sender_posts_notification() {
        let (base, mut received) = provider_stub().await;
        let sender = WebhookSender::new(
            NotificationType::Sms,
            format!("{base}/accept"),
            reqwest::Client::new(),
        );

        sender.send(&notification()).await.unwrap();

        let body = received.recv().await.unwrap();
        assert_eq!(body["id"], 42);
        assert_eq!(body["type"], "sms");
        assert_eq!(body["recipient"], "1234567890");
        assert!(body.get("sent_at").is_none());
    }

    #[tokio::test]
    async fn test_webhook_sender_fails_on_error_status() {
        let (base, _received) = provider_stub().await;
        let sender = WebhookSender::new(
            NotificationType::Sms,
            format!("{base}/unavailable"),
            reqwest::Client::new(),
        );

        let err = sender.send(&notification()).await.unwrap_err();
        assert!(matches!(err, SendError::Transport(_)));
    }
}
