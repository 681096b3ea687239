use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::category::CategoryId;
use crate::domain::client::ClientId;
use crate::errors::AllocationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Hot,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Hot => "hot",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "hot" | "urgent" => Some(Self::Hot),
            _ => None,
        }
    }
}

/// Channel requested by the operator for a delivery. `Both` fans out into the
/// two concrete legs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Both,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Both => "both",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn legs(&self) -> &'static [DeliveryChannel] {
        match self {
            Self::Email => &[DeliveryChannel::Email],
            Self::Sms => &[DeliveryChannel::Sms],
            Self::Both => &[DeliveryChannel::Email, DeliveryChannel::Sms],
        }
    }
}

/// A single concrete delivery leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    Sms,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Sent,
    Converted,
    Returned,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Sent => "sent",
            Self::Converted => "converted",
            Self::Returned => "returned",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" => Some(Self::New),
            "sent" => Some(Self::Sent),
            "converted" => Some(Self::Converted),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }
}

/// A prospective customer routed to at most one paying client at a time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub category_id: CategoryId,
    pub priority: Priority,
    pub status: LeadStatus,
    pub assigned_to: Option<ClientId>,
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_via: Option<Channel>,
    pub return_reason: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub service_area: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Lifecycle: `new -> sent -> {converted | returned}`; a returned lead
    /// can be sent again. `converted` is terminal.
    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        matches!(
            (self.status, next),
            (LeadStatus::New, LeadStatus::Sent)
                | (LeadStatus::Returned, LeadStatus::Sent)
                | (LeadStatus::Sent, LeadStatus::Converted)
                | (LeadStatus::Sent, LeadStatus::Returned)
        )
    }

    pub fn transition_to(&mut self, next: LeadStatus) -> Result<(), AllocationError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }
        Err(AllocationError::InvalidInput { field: "status" })
    }

    /// Assignment accepts only unrouted leads; re-assigning a `sent` lead is
    /// a hard error (return it first).
    pub fn is_assignable(&self) -> bool {
        matches!(self.status, LeadStatus::New | LeadStatus::Returned)
    }

    /// Operator deletion is allowed only before the lead reaches an outcome.
    pub fn is_deletable(&self) -> bool {
        matches!(self.status, LeadStatus::New | LeadStatus::Sent)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::category::CategoryId;
    use crate::errors::AllocationError;

    use super::{Channel, DeliveryChannel, Lead, LeadId, LeadStatus, Priority};

    pub(crate) fn lead(status: LeadStatus) -> Lead {
        Lead {
            id: LeadId("L-1".to_string()),
            customer_name: "Dana Levi".to_string(),
            phone: "050-1234567".to_string(),
            email: None,
            category_id: CategoryId("plumbing".to_string()),
            priority: Priority::Normal,
            status,
            assigned_to: None,
            sent_at: None,
            sent_via: None,
            return_reason: None,
            converted_at: None,
            service_area: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn allows_valid_lifecycle_transitions() {
        let mut lead = lead(LeadStatus::New);
        lead.transition_to(LeadStatus::Sent).expect("new -> sent");
        lead.transition_to(LeadStatus::Returned).expect("sent -> returned");
        lead.transition_to(LeadStatus::Sent).expect("returned -> sent");
        lead.transition_to(LeadStatus::Converted).expect("sent -> converted");
        assert_eq!(lead.status, LeadStatus::Converted);
    }

    #[test]
    fn blocks_transitions_out_of_converted() {
        let mut lead = lead(LeadStatus::Converted);
        for next in [LeadStatus::New, LeadStatus::Sent, LeadStatus::Returned] {
            let error = lead.transition_to(next).expect_err("converted is terminal");
            assert_eq!(error, AllocationError::InvalidInput { field: "status" });
        }
    }

    #[test]
    fn blocks_skipping_the_sent_state() {
        let mut lead = lead(LeadStatus::New);
        assert!(lead.transition_to(LeadStatus::Converted).is_err());
        assert!(lead.transition_to(LeadStatus::Returned).is_err());
    }

    #[test]
    fn assignable_and_deletable_states() {
        assert!(lead(LeadStatus::New).is_assignable());
        assert!(lead(LeadStatus::Returned).is_assignable());
        assert!(!lead(LeadStatus::Sent).is_assignable());
        assert!(!lead(LeadStatus::Converted).is_assignable());

        assert!(lead(LeadStatus::New).is_deletable());
        assert!(lead(LeadStatus::Sent).is_deletable());
        assert!(!lead(LeadStatus::Returned).is_deletable());
        assert!(!lead(LeadStatus::Converted).is_deletable());
    }

    #[test]
    fn both_channel_fans_out_into_two_legs() {
        assert_eq!(Channel::Email.legs(), &[DeliveryChannel::Email]);
        assert_eq!(Channel::Sms.legs(), &[DeliveryChannel::Sms]);
        assert_eq!(Channel::Both.legs(), &[DeliveryChannel::Email, DeliveryChannel::Sms]);
    }

    #[test]
    fn urgent_is_accepted_as_an_alias_for_hot() {
        assert_eq!(Priority::parse("urgent"), Some(Priority::Hot));
        assert_eq!(Priority::parse("hot"), Some(Priority::Hot));
    }
}
