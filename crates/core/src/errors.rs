use thiserror::Error;

use crate::domain::category::CategoryId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Lead,
    Client,
    Category,
    Notification,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Lead => "lead",
            Self::Client => "client",
            Self::Category => "category",
            Self::Notification => "notification",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForbiddenReason {
    InactiveClient,
    InactiveCategory,
    NotAClient,
    WrongOwner,
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::InactiveClient => "client account is inactive",
            Self::InactiveCategory => "category is inactive",
            Self::NotAClient => "account cannot receive leads",
            Self::WrongOwner => "caller is neither an operator nor the assigned client",
        })
    }
}

/// Typed allocation failures. All are recoverable at the caller's discretion;
/// none represent a corrupted system state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("{entity} not found")]
    NotFound { entity: EntityKind },
    #[error("forbidden: {reason}")]
    Forbidden { reason: ForbiddenReason },
    #[error("monthly quota exceeded: {received} of {limit} leads already received")]
    QuotaExceeded { limit: u32, received: u32 },
    #[error("category `{category_id}` is not in the client's allowed set")]
    CategoryNotAllowed { category_id: CategoryId },
    #[error("invalid input: `{field}`")]
    InvalidInput { field: &'static str },
    #[error("insufficient remaining capacity: requested {requested}, remaining {remaining}")]
    InsufficientCapacity { requested: u32, remaining: u32 },
}

/// Application-layer wrapper: typed allocation failures plus opaque store
/// failures. The HTTP layer maps these onto status codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ServiceError {
    /// User-safe message with no internal detail for the opaque case.
    pub fn user_message(&self) -> String {
        match self {
            Self::Allocation(error) => error.to_string(),
            Self::Persistence(_) => "an internal storage error occurred".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::category::CategoryId;

    use super::{AllocationError, EntityKind, ServiceError};

    #[test]
    fn allocation_errors_render_operator_readable_messages() {
        let error = AllocationError::QuotaExceeded { limit: 10, received: 10 };
        assert_eq!(error.to_string(), "monthly quota exceeded: 10 of 10 leads already received");

        let error = AllocationError::CategoryNotAllowed {
            category_id: CategoryId("plumbing".to_string()),
        };
        assert!(error.to_string().contains("plumbing"));

        let error = AllocationError::NotFound { entity: EntityKind::Lead };
        assert_eq!(error.to_string(), "lead not found");
    }

    #[test]
    fn persistence_failures_stay_opaque_to_users() {
        let error = ServiceError::Persistence("sqlite lock timeout on lead".to_string());
        assert_eq!(error.user_message(), "an internal storage error occurred");
        assert!(error.to_string().contains("lock timeout"));
    }

    #[test]
    fn allocation_failures_surface_their_own_message() {
        let error = ServiceError::from(AllocationError::InvalidInput { field: "phone" });
        assert_eq!(error.user_message(), "invalid input: `phone`");
    }
}
