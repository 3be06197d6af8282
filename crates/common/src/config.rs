use std::str::FromStr;

use serde::Deserialize;

use crate::types::NotificationType;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Minimum number of PostgreSQL connections kept open (default: 1)
    pub db_min_connections: u32,

    /// Maximum number of PostgreSQL connections in the pool (default: 10)
    pub db_max_connections: u32,

    /// Address the API server binds to (default: 0.0.0.0:8080)
    pub api_bind_addr: String,

    /// Capacity of the handoff queue in front of the dispatch loop (default: 64)
    pub worker_queue_capacity: usize,

    /// Simulated delivery latency for senders without a webhook (default: 0)
    pub sender_latency_ms: u64,

    /// HTTP timeout for webhook senders (default: 10000)
    pub sender_timeout_ms: u64,

    pub sms_webhook_url: Option<String>,
    pub email_webhook_url: Option<String>,
    pub push_webhook_url: Option<String>,
    pub whatsapp_webhook_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => compose_database_url(&var).ok_or_else(|| {
                anyhow::anyhow!(
                    "DATABASE_URL (or DB_USER, DB_PASSWORD, DB_HOST and DB_NAME) environment variable is required"
                )
            })?,
        };

        let config = Self {
            database_url,
            db_min_connections: parse_or(&var, "DB_MIN_CONNECTIONS", 1)?,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            api_bind_addr: var("API_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            worker_queue_capacity: parse_or(&var, "WORKER_QUEUE_CAPACITY", 64)?,
            sender_latency_ms: parse_or(&var, "SENDER_LATENCY_MS", 0)?,
            sender_timeout_ms: parse_or(&var, "SENDER_TIMEOUT_MS", 10_000)?,
            sms_webhook_url: var("SMS_WEBHOOK_URL"),
            email_webhook_url: var("EMAIL_WEBHOOK_URL"),
            push_webhook_url: var("PUSH_WEBHOOK_URL"),
            whatsapp_webhook_url: var("WHATSAPP_WEBHOOK_URL"),
        };

        if config.db_min_connections > config.db_max_connections {
            anyhow::bail!("DB_MIN_CONNECTIONS must not exceed DB_MAX_CONNECTIONS");
        }
        if config.worker_queue_capacity == 0 {
            anyhow::bail!("WORKER_QUEUE_CAPACITY must be greater than zero");
        }

        Ok(config)
    }

    /// Webhook endpoint configured for a channel, if any.
    pub fn webhook_url(&self, notification_type: NotificationType) -> Option<&str> {
        match notification_type {
            NotificationType::Sms => self.sms_webhook_url.as_deref(),
            NotificationType::Email => self.email_webhook_url.as_deref(),
            NotificationType::Push => self.push_webhook_url.as_deref(),
            NotificationType::WhatsApp => self.whatsapp_webhook_url.as_deref(),
        }
    }
}

fn compose_database_url<F>(var: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let user = var("DB_USER")?;
    let password = var("DB_PASSWORD")?;
    let host = var("DB_HOST")?;
    let name = var("DB_NAME")?;
    let port = var("DB_PORT").unwrap_or_else(|| "5432".to_string());

    Some(format!(
        "postgres://{user}:{password}@{host}:{port}/{name}?sslmode=disable"
    ))
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} must be a valid {}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}
