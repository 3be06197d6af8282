//! Shared application state for the Axum API server.

use std::sync::Arc;

use courier_store::NotificationStore;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }
}
