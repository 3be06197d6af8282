//! Notification routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use courier_common::error::AppError;
use courier_common::types::{Notification, NotificationId, NotificationStatus};

use crate::state::AppState;
use crate::validation::CreateNotificationRequest;

const INVALID_BODY: &str = "invalid request body";
const INVALID_ID: &str = "invalid or missing notification id";
const NOT_FOUND: &str = "notification not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", post(create_notification))
        .route("/notifications/{id}/status", get(notification_status))
        .route("/notifications/{id}", delete(delete_notification))
}

fn parse_id(raw: &str) -> Result<NotificationId, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(INVALID_ID.to_string()))
}

/// POST /notifications: Persist a notification for delivery.
async fn create_notification(
    State(state): State<AppState>,
    body: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected notification body");
        AppError::BadRequest(INVALID_BODY.to_string())
    })?;

    let new = request.validate().map_err(AppError::Validation)?;
    let id = state.store.create(&new).await?;

    let notification = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("notification {id} vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// GET /notifications/{id}/status: Whether the notification has been sent, and when.
async fn notification_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NotificationStatus>, AppError> {
    let id = parse_id(&id)?;
    state
        .store
        .find_status_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

/// DELETE /notifications/{id}: Remove a notification regardless of its delivery state.
async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.store.delete_by_id(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(NOT_FOUND.to_string()))
    }
}
