//! Sender registry: maps a notification type to the sender that delivers it.
//!
//! Built once at startup and shared read-only with the dispatch loop. Registering a type
//! twice replaces the earlier sender.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier_common::config::AppConfig;
use courier_common::types::NotificationType;

use crate::sender::{SendError, Sender, SimulatedSender, WebhookSender};

#[derive(Default, Clone)]
pub struct SenderRegistry {
    senders: HashMap<NotificationType, Arc<dyn Sender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notification_type: NotificationType, sender: Arc<dyn Sender>) {
        if let Some(previous) = self.senders.insert(notification_type, sender) {
            tracing::debug!(
                notification_type = %notification_type,
                replaced = previous.name(),
                "Sender replaced"
            );
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, notification_type: NotificationType, sender: Arc<dyn Sender>) -> Self {
        self.register(notification_type, sender);
        self
    }

    pub fn get(&self, notification_type: NotificationType) -> Option<&Arc<dyn Sender>> {
        self.senders.get(&notification_type)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl std::fmt::Debug for SenderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (notification_type, sender) in &self.senders {
            map.entry(&notification_type.as_str(), &sender.name());
        }
        map.finish()
    }
}

/// Register one sender per supported type: a webhook sender where the channel has a URL
/// configured, a simulated sender otherwise.
pub fn build_registry(config: &AppConfig) -> Result<SenderRegistry, SendError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.sender_timeout_ms))
        .build()?;
    let latency = Duration::from_millis(config.sender_latency_ms);

    let mut registry = SenderRegistry::new();
    for notification_type in NotificationType::ALL {
        let sender: Arc<dyn Sender> = match config.webhook_url(notification_type) {
            Some(url) => Arc::new(WebhookSender::new(notification_type, url, client.clone())),
            None => Arc::new(SimulatedSender::new(notification_type, latency)),
        };

        tracing::info!(
            notification_type = %notification_type,
            sender = sender.name(),
            "Sender registered"
        );
        registry.register(notification_type, sender);
    }

    Ok(registry)
}
