//! Client account endpoints.
//!
//! - `GET /api/v1/clients`        — list accounts (`?active=true` to filter)
//! - `GET /api/v1/clients/{id}`   — fetch one account
//! - `PUT /api/v1/clients/{id}`   — create or update (operator)
//!
//! The quota fields accept `null` for unlimited; a large number is not a
//! substitute.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use leadline_core::chrono::Utc;
use leadline_core::{CategoryId, Client, ClientId, PackageType, Quota, Role};

use crate::api::{actor_from_headers, ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/clients", get(list_clients))
        .route("/api/v1/clients/{id}", get(get_client).put(upsert_client))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListQuery {
    pub active: Option<bool>,
}

/// Upsert payload. Timestamps are managed server-side; `monthly_lead_limit`
/// and `category_access` use `null` for unlimited.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientPayload {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub package: PackageType,
    pub role: Role,
    pub monthly_lead_limit: Quota,
    pub category_access: Quota,
    #[serde(default)]
    pub allowed_categories: Vec<String>,
    pub is_active: bool,
    #[serde(default)]
    pub is_vip: bool,
}

async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.service.list_clients(query.active.unwrap_or(false)).await?))
}

async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.service.get_client(&ClientId(id)).await?))
}

async fn upsert_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ClientPayload>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let client_id = ClientId(id);

    // preserve the creation timestamp and counter on updates
    let existing = state.service.get_client(&client_id).await.ok();
    let created = existing.is_none();
    let now = Utc::now();

    let client = Client {
        id: client_id.clone(),
        name: body.name,
        email: body.email,
        phone: body.phone,
        package: body.package,
        role: body.role,
        monthly_lead_limit: body.monthly_lead_limit,
        leads_received_this_month: existing
            .as_ref()
            .map(|client| client.leads_received_this_month)
            .unwrap_or(0),
        category_access: body.category_access,
        allowed_categories: body.allowed_categories.into_iter().map(CategoryId).collect(),
        is_active: body.is_active,
        is_vip: body.is_vip,
        created_at: existing.as_ref().map(|client| client.created_at).unwrap_or(now),
        updated_at: now,
    };

    state.service.upsert_client(client, &actor).await?;
    let stored = state.service.get_client(&client_id).await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(stored)))
}
