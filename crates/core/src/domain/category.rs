use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A service vertical (plumbing, electrical, ...) used to match leads to
/// clients. Display names and descriptions are bilingual; the Hebrew name is
/// the primary operator-facing label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name_he: String,
    pub name_en: String,
    pub description_he: Option<String>,
    pub description_en: Option<String>,
    /// Inactive categories are excluded from new-lead creation but remain
    /// valid references on existing leads.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
