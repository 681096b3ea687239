//! Lead endpoints: CRUD, the allocation operations, history, and CSV export.
//!
//! - `GET    /api/v1/leads`                — list with conjunctive filters
//! - `POST   /api/v1/leads`                — create (operator)
//! - `GET    /api/v1/leads/export`         — BOM-prefixed CSV download
//! - `POST   /api/v1/leads/bulk-assign`    — batch assignment (operator)
//! - `GET    /api/v1/leads/{id}`           — fetch one lead
//! - `DELETE /api/v1/leads/{id}`           — delete before outcome (operator)
//! - `POST   /api/v1/leads/{id}/assign`    — single assignment (operator)
//! - `POST   /api/v1/leads/{id}/return`    — return to pool
//! - `POST   /api/v1/leads/{id}/convert`   — mark converted
//! - `GET    /api/v1/leads/{id}/history`   — audit trail, newest first

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use leadline_core::{
    CategoryId, Channel, ClientId, Lead, LeadHistoryEntry, LeadId, LeadStatus, Priority,
};
use leadline_db::repositories::LeadFilter;

use crate::allocation::{BulkAssignReport, NewLead};
use crate::api::{actor_from_headers, ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/leads", get(list_leads).post(create_lead))
        .route("/api/v1/leads/export", get(export_leads))
        .route("/api/v1/leads/bulk-assign", post(bulk_assign))
        .route("/api/v1/leads/{id}", get(get_lead).delete(delete_lead))
        .route("/api/v1/leads/{id}/assign", post(assign_lead))
        .route("/api/v1/leads/{id}/return", post(return_lead))
        .route("/api/v1/leads/{id}/convert", post(convert_lead))
        .route("/api/v1/leads/{id}/history", get(lead_history))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeadListQuery {
    pub status: Option<String>,
    pub category_id: Option<String>,
    pub assigned_to: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl LeadListQuery {
    fn into_filter(self) -> Result<LeadFilter, ApiError> {
        let status = self
            .status
            .map(|raw| {
                LeadStatus::parse(&raw)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown status `{raw}`")))
            })
            .transpose()?;
        let priority = self
            .priority
            .map(|raw| {
                Priority::parse(&raw)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown priority `{raw}`")))
            })
            .transpose()?;

        Ok(LeadFilter {
            status,
            category_id: self.category_id.map(CategoryId),
            assigned_to: self.assigned_to.map(ClientId),
            priority,
            search: self.search.filter(|needle| !needle.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignRequest {
    pub client_id: String,
    pub channel: Channel,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkAssignRequest {
    pub lead_ids: Vec<String>,
    pub client_id: String,
    pub channel: Channel,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnRequest {
    pub reason: Option<String>,
}

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let filter = query.into_filter()?;
    Ok(Json(state.service.list_leads(&filter).await?))
}

async fn create_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewLead>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let lead = state.service.create_lead(body, &actor).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.service.get_lead(&LeadId(id)).await?))
}

async fn delete_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state.service.delete_lead(&LeadId(id), &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Lead>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let lead = state
        .service
        .assign_lead(&LeadId(id), &ClientId(body.client_id), body.channel, &actor)
        .await?;
    Ok(Json(lead))
}

async fn bulk_assign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BulkAssignRequest>,
) -> Result<Json<BulkAssignReport>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let lead_ids: Vec<LeadId> = body.lead_ids.into_iter().map(LeadId).collect();
    let report = state
        .service
        .bulk_assign(&lead_ids, &ClientId(body.client_id), body.channel, &actor)
        .await?;
    Ok(Json(report))
}

async fn return_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReturnRequest>,
) -> Result<Json<Lead>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let lead = state.service.return_lead(&LeadId(id), body.reason, &actor).await?;
    Ok(Json(lead))
}

async fn convert_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(state.service.convert_lead(&LeadId(id), &actor).await?))
}

async fn lead_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<LeadHistoryEntry>>, ApiError> {
    Ok(Json(state.service.lead_history(&LeadId(id)).await?))
}

async fn export_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    let bytes = state.service.export_leads(&filter).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"leads.csv\""),
        ],
        bytes,
    ))
}
