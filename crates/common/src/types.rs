use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned notification identifier.
pub type NotificationId = i64;

/// Delivery channel of a notification. Selects the sender at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum NotificationType {
    Sms,
    Email,
    Push,
    WhatsApp,
}

impl NotificationType {
    /// Every supported channel, in registration order.
    pub const ALL: [NotificationType; 4] = [
        NotificationType::Sms,
        NotificationType::Email,
        NotificationType::Push,
        NotificationType::WhatsApp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Sms => "sms",
            NotificationType::Email => "email",
            NotificationType::Push => "push",
            NotificationType::WhatsApp => "whatsapp",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the supported channels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification type '{0}'")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownNotificationType(s.to_string()))
    }
}

/// Delivery state of a notification.
///
/// Persisted as a single nullable `sent_at` column: `NULL` is `Pending`, anything else is
/// `Sent`. Serializes as the `{sent, sent_at}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NotificationStatus", into = "NotificationStatus")]
pub enum DeliveryState {
    Pending,
    Sent { at: DateTime<Utc> },
}

impl DeliveryState {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryState::Sent { .. })
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        match self {
            DeliveryState::Pending => None,
            DeliveryState::Sent { at } => Some(*at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for DeliveryState {
    fn from(sent_at: Option<DateTime<Utc>>) -> Self {
        match sent_at {
            Some(at) => DeliveryState::Sent { at },
            None => DeliveryState::Pending,
        }
    }
}

/// Read projection of a notification's delivery state, used for cheap status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStatus {
    #[serde(default)]
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<DeliveryState> for NotificationStatus {
    fn from(state: DeliveryState) -> Self {
        Self {
            sent: state.is_sent(),
            sent_at: state.sent_at(),
        }
    }
}

// `sent` is derived; only `sent_at` carries information.
impl From<NotificationStatus> for DeliveryState {
    fn from(status: NotificationStatus) -> Self {
        DeliveryState::from(status.sent_at)
    }
}

/// A notification and its delivery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: DeliveryState,
}

impl Notification {
    pub fn is_sent(&self) -> bool {
        self.state.is_sent()
    }

    pub fn status(&self) -> NotificationStatus {
        self.state.into()
    }
}

/// Input for creating a notification. Validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient: String,
}

impl NewNotification {
    pub fn new(notification_type: NotificationType, recipient: impl Into<String>) -> Self {
        Self {
            notification_type,
            recipient: recipient.into(),
        }
    }
}
