//! HTTP adapter over the notification store.
//!
//! Endpoints:
//! - POST   /notifications: Create a notification
//! - GET    /notifications/{id}/status: Poll delivery status
//! - DELETE /notifications/{id}: Remove a notification
//! - GET    /health: Liveness probe

pub mod routes;
pub mod state;
pub mod validation;
