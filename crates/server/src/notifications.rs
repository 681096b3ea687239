//! In-app notification endpoints.
//!
//! - `GET    /api/v1/clients/{id}/notifications`          — inbox (`?unread=true`)
//! - `POST   /api/v1/clients/{id}/notifications/read-all` — mark the inbox read
//! - `POST   /api/v1/notifications/{id}/read`             — mark one read
//! - `DELETE /api/v1/notifications/{id}`                  — recipient or operator
//! - `POST   /api/v1/notifications/broadcast`             — operator announcement

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use leadline_core::{ClientId, Notification, NotificationId};

use crate::api::{actor_from_headers, ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/clients/{id}/notifications", get(list_notifications))
        .route("/api/v1/clients/{id}/notifications/read-all", post(mark_all_read))
        .route("/api/v1/notifications/{id}/read", post(mark_read))
        .route("/api/v1/notifications/{id}", delete(delete_notification))
        .route("/api/v1/notifications/broadcast", post(broadcast))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListQuery {
    pub unread: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ReadAllResponse {
    pub marked: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub recipients: u64,
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state
        .service
        .notifications_for_client(&ClientId(id), query.unread.unwrap_or(false))
        .await?;
    Ok(Json(notifications))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.service.mark_notification_read(&NotificationId(id)).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReadAllResponse>, ApiError> {
    let marked = state.service.mark_all_notifications_read(&ClientId(id)).await?;
    Ok(Json(ReadAllResponse { marked }))
}

async fn delete_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state.service.delete_notification(&NotificationId(id), &actor).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn broadcast(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let recipients =
        state.service.broadcast_notification(&body.title, &body.message, &actor).await?;
    Ok(Json(BroadcastResponse { recipients }))
}
