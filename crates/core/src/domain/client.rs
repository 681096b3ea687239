use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::category::CategoryId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Starter,
    Professional,
    Enterprise,
    PayPerLead,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
            Self::PayPerLead => "pay_per_lead",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starter" => Some(Self::Starter),
            "professional" => Some(Self::Professional),
            "enterprise" => Some(Self::Enterprise),
            "pay_per_lead" => Some(Self::PayPerLead),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Operator => "operator",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Self::Client),
            "operator" => Some(Self::Operator),
            _ => None,
        }
    }
}

/// A monthly cap. `Unlimited` is a distinguished sentinel, not a large
/// number; it maps to `null` in JSON and `NULL` in the database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    pub fn from_db(value: Option<i64>) -> Self {
        match value {
            Some(limit) => Self::Limited(limit.max(0) as u32),
            None => Self::Unlimited,
        }
    }

    pub fn to_db(self) -> Option<i64> {
        match self {
            Self::Limited(limit) => Some(i64::from(limit)),
            Self::Unlimited => None,
        }
    }
}

impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limited(limit) => serializer.serialize_some(limit),
            Self::Unlimited => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Quota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<u32>::deserialize(deserializer)? {
            Some(limit) => Self::Limited(limit),
            None => Self::Unlimited,
        })
    }
}

/// A paying recipient of leads (or an operator account in the same store,
/// distinguished by `role`). Quota state lives on the client record; the
/// counter is reset on a monthly boundary by an external job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub package: PackageType,
    pub role: Role,
    pub monthly_lead_limit: Quota,
    pub leads_received_this_month: u32,
    /// Count of categories the package grants, or unlimited. The concrete
    /// grants live in `allowed_categories`.
    pub category_access: Quota,
    pub allowed_categories: Vec<CategoryId>,
    pub is_active: bool,
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
