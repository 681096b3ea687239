//! Category endpoints. Names are bilingual; either language may be blank but
//! not both.
//!
//! - `GET /api/v1/categories`        — list (`?active=true` to filter)
//! - `PUT /api/v1/categories/{id}`   — create or update (operator)

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use leadline_core::chrono::Utc;
use leadline_core::{Category, CategoryId};

use crate::api::{actor_from_headers, ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/categories/{id}", axum::routing::put(upsert_category))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryPayload {
    #[serde(default)]
    pub name_he: String,
    #[serde(default)]
    pub name_en: String,
    pub description_he: Option<String>,
    pub description_en: Option<String>,
    pub is_active: bool,
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.service.list_categories(query.active.unwrap_or(false)).await?))
}

async fn upsert_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CategoryPayload>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let category = Category {
        id: CategoryId(id),
        name_he: body.name_he,
        name_en: body.name_en,
        description_he: body.description_he,
        description_en: body.description_en,
        is_active: body.is_active,
        created_at: Utc::now(),
    };

    state.service.upsert_category(category, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
