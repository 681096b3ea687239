use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;
use crate::domain::lead::{DeliveryChannel, LeadId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LeadAssigned,
    LeadReturned,
    Broadcast,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadAssigned => "lead_assigned",
            Self::LeadReturned => "lead_returned",
            Self::Broadcast => "broadcast",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lead_assigned" => Some(Self::LeadAssigned),
            "lead_returned" => Some(Self::LeadReturned),
            "broadcast" => Some(Self::Broadcast),
            _ => None,
        }
    }
}

/// In-app notification created by the allocation engine and broadcast
/// operations. Only the read flag is ever mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub client_id: ClientId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn unread(
        client_id: ClientId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId(Uuid::new_v4().to_string()),
            client_id,
            title: title.into(),
            message: message.into(),
            kind,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryRecordId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Outcome of one sink delivery leg. Queryable audit data; a failed row
/// never affects the lead's own status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: DeliveryRecordId,
    pub lead_id: LeadId,
    pub client_id: ClientId,
    pub channel: DeliveryChannel,
    pub status: DeliveryStatus,
    pub error_detail: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(
        lead_id: LeadId,
        client_id: ClientId,
        channel: DeliveryChannel,
        status: DeliveryStatus,
        error_detail: Option<String>,
    ) -> Self {
        Self {
            id: DeliveryRecordId(Uuid::new_v4().to_string()),
            lead_id,
            client_id,
            channel,
            status,
            error_detail,
            attempted_at: Utc::now(),
        }
    }
}
