pub mod allocation;
pub mod config;
pub mod domain;
pub mod errors;
pub mod export;

pub use allocation::quota::{has_remaining_quota, is_category_allowed, remaining_capacity};
pub use allocation::{check_assignment, may_resolve_lead, precheck_bulk_capacity, BulkOutcome};
pub use domain::category::{Category, CategoryId};
pub use domain::client::{Client, ClientId, PackageType, Quota, Role};
pub use domain::history::{HistoryAction, HistoryId, LeadHistoryEntry};
pub use domain::lead::{Channel, DeliveryChannel, Lead, LeadId, LeadStatus, Priority};
pub use domain::notification::{
    DeliveryRecord, DeliveryRecordId, DeliveryStatus, Notification, NotificationId,
    NotificationKind,
};
pub use errors::{AllocationError, EntityKind, ForbiddenReason, ServiceError};

pub use chrono;
