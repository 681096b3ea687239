use sqlx::{sqlite::SqliteRow, Row};

use leadline_core::domain::history::{HistoryAction, HistoryId, LeadHistoryEntry};
use leadline_core::domain::lead::{LeadId, LeadStatus};

use super::{parse_timestamp, HistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHistoryRepository {
    pool: DbPool,
}

impl SqlHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryRepository for SqlHistoryRepository {
    async fn append(&self, entry: LeadHistoryEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lead_history (
                id,
                lead_id,
                action,
                old_status,
                new_status,
                actor_id,
                note,
                occurred_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id.0)
        .bind(&entry.lead_id.0)
        .bind(entry.action.as_str())
        .bind(entry.old_status.map(|status| status.as_str()))
        .bind(entry.new_status.map(|status| status.as_str()))
        .bind(&entry.actor_id)
        .bind(entry.note.as_deref())
        .bind(entry.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<LeadHistoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                lead_id,
                action,
                old_status,
                new_status,
                actor_id,
                note,
                occurred_at
             FROM lead_history
             WHERE lead_id = ?
             ORDER BY occurred_at DESC, id DESC",
        )
        .bind(&lead_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: SqliteRow) -> Result<LeadHistoryEntry, RepositoryError> {
    let action_raw = row.try_get::<String, _>("action")?;
    let action = HistoryAction::parse(&action_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown history action `{action_raw}`")))?;

    Ok(LeadHistoryEntry {
        id: HistoryId(row.try_get("id")?),
        lead_id: LeadId(row.try_get("lead_id")?),
        action,
        old_status: parse_optional_status("old_status", row.try_get("old_status")?)?,
        new_status: parse_optional_status("new_status", row.try_get("new_status")?)?,
        actor_id: row.try_get("actor_id")?,
        note: row.try_get("note")?,
        occurred_at: parse_timestamp("occurred_at", row.try_get("occurred_at")?)?,
    })
}

fn parse_optional_status(
    column: &str,
    value: Option<String>,
) -> Result<Option<LeadStatus>, RepositoryError> {
    value
        .map(|raw| {
            LeadStatus::parse(&raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown lead status in `{column}`: `{raw}`"))
            })
        })
        .transpose()
}
