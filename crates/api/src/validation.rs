//! Request body validation for notification creation.

use serde::Deserialize;

use courier_common::types::{NewNotification, NotificationType};

pub const RECIPIENT_MIN_CHARS: usize = 3;
pub const RECIPIENT_MAX_CHARS: usize = 255;

/// Body of `POST /notifications`. Fields are optional so that missing ones surface as
/// validation messages instead of a decode failure.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub recipient: Option<String>,
}

fn field_message(field: &str, message: impl std::fmt::Display) -> String {
    format!("The field \"{field}\" {message}")
}

impl CreateNotificationRequest {
    /// Check every field and collect one message per invalid field.
    pub fn validate(&self) -> Result<NewNotification, Vec<String>> {
        let mut errors = Vec::new();

        let notification_type = match self.notification_type.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(field_message("type", "is required"));
                None
            }
            Some(raw) => match raw.parse::<NotificationType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    let allowed: Vec<&str> =
                        NotificationType::ALL.iter().map(|t| t.as_str()).collect();
                    errors.push(field_message(
                        "type",
                        format!("must be one of: {}", allowed.join(", ")),
                    ));
                    None
                }
            },
        };

        let recipient = match self.recipient.as_deref() {
            None | Some("") => {
                errors.push(field_message("recipient", "is required"));
                None
            }
            Some(r) => {
                let chars = r.chars().count();
                if chars < RECIPIENT_MIN_CHARS {
                    errors.push(field_message(
                        "recipient",
                        format!("must be at least {RECIPIENT_MIN_CHARS} characters long"),
                    ));
                    None
                } else if chars > RECIPIENT_MAX_CHARS {
                    errors.push(field_message(
                        "recipient",
                        format!("must be at most {RECIPIENT_MAX_CHARS} characters long"),
                    ));
                    None
                } else {
                    Some(r)
                }
            }
        };

        match (notification_type, recipient) {
            (Some(t), Some(r)) if errors.is_empty() => Ok(NewNotification::new(t, r)),
            _ => Err(errors),
        }
    }
}
