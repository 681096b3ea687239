use async_trait::async_trait;
use thiserror::Error;

use leadline_core::chrono::{DateTime, Utc};
use leadline_core::domain::category::{Category, CategoryId};
use leadline_core::domain::client::{Client, ClientId};
use leadline_core::domain::history::LeadHistoryEntry;
use leadline_core::domain::lead::{Lead, LeadId, LeadStatus, Priority};
use leadline_core::domain::notification::{DeliveryRecord, Notification, NotificationId};

pub mod category;
pub mod client;
pub mod delivery_log;
pub mod history;
pub mod lead;
pub mod memory;
pub mod notification;

pub use category::SqlCategoryRepository;
pub use client::SqlClientRepository;
pub use delivery_log::SqlDeliveryLogRepository;
pub use history::SqlHistoryRepository;
pub use lead::SqlLeadRepository;
pub use memory::{
    InMemoryCategoryRepository, InMemoryClientRepository, InMemoryDeliveryLogRepository,
    InMemoryHistoryRepository, InMemoryLeadRepository, InMemoryNotificationRepository,
};
pub use notification::SqlNotificationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Filters for lead listing and export. All fields are conjunctive.
#[derive(Clone, Debug, Default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub category_id: Option<CategoryId>,
    pub assigned_to: Option<ClientId>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring match against customer name or phone.
    pub search: Option<String>,
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError>;
    async fn list(&self, active_only: bool) -> Result<Vec<Client>, RepositoryError>;
    async fn save(&self, client: Client) -> Result<(), RepositoryError>;

    /// Atomically bumps the monthly counter if quota remains. Returns false
    /// when the client is at its limit (or does not exist).
    async fn try_consume_quota(&self, id: &ClientId) -> Result<bool, RepositoryError>;

    /// Adjusts the monthly counter by `delta`, clamping at zero. Used for
    /// quota refunds on return and for external counter resets.
    async fn adjust_received(&self, id: &ClientId, delta: i64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError>;
    async fn list(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError>;
    async fn save(&self, category: Category) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError>;
    async fn save(&self, lead: Lead) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(&self, entry: LeadHistoryEntry) -> Result<(), RepositoryError>;

    /// Entries for one lead, newest first.
    async fn list_for_lead(&self, lead_id: &LeadId)
        -> Result<Vec<LeadHistoryEntry>, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn save(&self, notification: Notification) -> Result<(), RepositoryError>;
    async fn list_for_client(
        &self,
        client_id: &ClientId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError>;
    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError>;
    async fn mark_all_read(&self, client_id: &ClientId) -> Result<u64, RepositoryError>;
    async fn find_by_id(&self, id: &NotificationId)
        -> Result<Option<Notification>, RepositoryError>;
    async fn delete(&self, id: &NotificationId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait DeliveryLogRepository: Send + Sync {
    async fn append(&self, record: DeliveryRecord) -> Result<(), RepositoryError>;
    async fn list_for_lead(&self, lead_id: &LeadId)
        -> Result<Vec<DeliveryRecord>, RepositoryError>;
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}
