use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{LeadId, LeadStatus};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Assigned,
    StatusChanged,
    Returned,
    Converted,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::StatusChanged => "status_changed",
            Self::Returned => "returned",
            Self::Converted => "converted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => Some(Self::Created),
            "assigned" => Some(Self::Assigned),
            "status_changed" => Some(Self::StatusChanged),
            "returned" => Some(Self::Returned),
            "converted" => Some(Self::Converted),
            _ => None,
        }
    }
}

/// Append-only audit record for a lead. Never mutated; removed only by
/// cascade when the parent lead is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadHistoryEntry {
    pub id: HistoryId,
    pub lead_id: LeadId,
    pub action: HistoryAction,
    pub old_status: Option<LeadStatus>,
    pub new_status: Option<LeadStatus>,
    pub actor_id: String,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl LeadHistoryEntry {
    pub fn new(
        lead_id: LeadId,
        action: HistoryAction,
        old_status: Option<LeadStatus>,
        new_status: Option<LeadStatus>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            id: HistoryId(Uuid::new_v4().to_string()),
            lead_id,
            action,
            old_status,
            new_status,
            actor_id: actor_id.into(),
            note: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
