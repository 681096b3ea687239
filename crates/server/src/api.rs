//! Shared HTTP plumbing for the back-office API: application state, the
//! error-to-status mapping, and caller identification.
//!
//! Callers identify themselves with `x-actor-id` and `x-actor-role` headers;
//! upstream authentication is expected to sit in front of this service.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use leadline_core::{AllocationError, Role, ServiceError};

use crate::allocation::{Actor, AllocationService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AllocationService>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        let status = match &error {
            ServiceError::Allocation(inner) => match inner {
                AllocationError::NotFound { .. } => StatusCode::NOT_FOUND,
                AllocationError::Forbidden { .. } => StatusCode::FORBIDDEN,
                AllocationError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                AllocationError::QuotaExceeded { .. }
                | AllocationError::CategoryNotAllowed { .. }
                | AllocationError::InsufficientCapacity { .. } => StatusCode::CONFLICT,
            },
            ServiceError::Persistence(detail) => {
                tracing::error!(error = %detail, "storage failure surfaced to the api");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self { status, message: error.user_message() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Resolve the acting account from request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing `x-actor-id` header"))?;

    let role = headers
        .get("x-actor-role")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            Role::parse(value).ok_or_else(|| ApiError::bad_request("invalid `x-actor-role` header"))
        })
        .transpose()?
        .unwrap_or(Role::Client);

    Ok(Actor { id: id.to_string(), role })
}

/// The full `/api/v1` surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(crate::leads::router())
        .merge(crate::clients::router())
        .merge(crate::categories::router())
        .merge(crate::notifications::router())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use leadline_core::chrono::Utc;
    use leadline_core::{
        Category, CategoryId, Client, ClientId, DeliveryChannel, PackageType, Quota, Role,
    };
    use leadline_db::repositories::{
        CategoryRepository, ClientRepository, InMemoryCategoryRepository,
        InMemoryClientRepository, InMemoryDeliveryLogRepository, InMemoryHistoryRepository,
        InMemoryLeadRepository, InMemoryNotificationRepository,
    };
    use leadline_notify::{Dispatcher, NoopSink};

    use crate::allocation::AllocationService;

    use super::AppState;

    pub(crate) struct TestApp {
        pub state: AppState,
        pub clients: Arc<InMemoryClientRepository>,
        pub leads: Arc<InMemoryLeadRepository>,
        pub notifications: Arc<InMemoryNotificationRepository>,
    }

    pub(crate) async fn app() -> TestApp {
        let clients = Arc::new(InMemoryClientRepository::default());
        let categories = Arc::new(InMemoryCategoryRepository::default());
        let leads = Arc::new(InMemoryLeadRepository::default());
        let history = Arc::new(InMemoryHistoryRepository::default());
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let delivery_log = Arc::new(InMemoryDeliveryLogRepository::default());

        let dispatcher = Dispatcher::new(
            vec![
                Arc::new(NoopSink::new(DeliveryChannel::Email)),
                Arc::new(NoopSink::new(DeliveryChannel::Sms)),
            ],
            delivery_log,
        );

        let service = Arc::new(AllocationService::new(
            clients.clone(),
            categories.clone(),
            leads.clone(),
            history,
            notifications.clone(),
            dispatcher,
        ));

        categories
            .save(Category {
                id: CategoryId("cat-plumbing".to_string()),
                name_he: "אינסטלציה".to_string(),
                name_en: "Plumbing".to_string(),
                description_he: None,
                description_en: None,
                is_active: true,
                created_at: Utc::now(),
            })
            .await
            .expect("seed category");

        clients
            .save(Client {
                id: ClientId("C-1".to_string()),
                name: "Mizrahi Plumbing".to_string(),
                email: "office@mizrahi.example".to_string(),
                phone: Some("03-5551234".to_string()),
                package: PackageType::Professional,
                role: Role::Client,
                monthly_lead_limit: Quota::Limited(10),
                leads_received_this_month: 0,
                category_access: Quota::Limited(1),
                allowed_categories: vec![CategoryId("cat-plumbing".to_string())],
                is_active: true,
                is_vip: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("seed client");

        TestApp { state: AppState { service }, clients, leads, notifications }
    }

    pub(crate) fn operator_headers() -> axum::http::HeaderMap {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-actor-id", "op-1".parse().expect("header value"));
        headers.insert("x-actor-role", "operator".parse().expect("header value"));
        headers
    }

    pub(crate) fn client_headers(id: &str) -> axum::http::HeaderMap {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-actor-id", id.parse().expect("header value"));
        headers.insert("x-actor-role", "client".parse().expect("header value"));
        headers
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use leadline_core::{AllocationError, EntityKind, Role, ServiceError};

    use super::{actor_from_headers, ApiError};

    #[test]
    fn actor_defaults_to_the_client_role() {
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", "C-9".parse().expect("header value"));

        let actor = actor_from_headers(&headers).expect("id alone is enough");
        assert_eq!(actor.id, "C-9");
        assert_eq!(actor.role, Role::Client);
    }

    #[test]
    fn missing_actor_id_is_a_bad_request() {
        let error = actor_from_headers(&HeaderMap::new()).expect_err("no identity");
        assert_eq!(error.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn service_errors_map_onto_http_statuses() {
        use axum::http::StatusCode;

        let cases = [
            (
                ServiceError::from(AllocationError::NotFound { entity: EntityKind::Lead }),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::from(AllocationError::QuotaExceeded { limit: 5, received: 5 }),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::from(AllocationError::InvalidInput { field: "phone" }),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::Persistence("disk full".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let api_error = ApiError::from(error);
            assert_eq!(api_error.status, expected);
        }
    }

    #[test]
    fn persistence_detail_never_reaches_the_response() {
        let api_error = ApiError::from(ServiceError::Persistence("sqlite path leak".to_string()));
        assert!(!api_error.message.contains("sqlite"));
    }
}
