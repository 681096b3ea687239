use sqlx::{sqlite::SqliteRow, QueryBuilder, Row};

use leadline_core::domain::category::CategoryId;
use leadline_core::domain::client::ClientId;
use leadline_core::domain::lead::{Channel, Lead, LeadId, LeadStatus, Priority};

use super::{parse_optional_timestamp, parse_timestamp, LeadFilter, LeadRepository, RepositoryError};
use crate::DbPool;

const LEAD_COLUMNS: &str = "id,
    customer_name,
    phone,
    email,
    category_id,
    priority,
    status,
    assigned_to,
    sent_at,
    sent_via,
    return_reason,
    converted_at,
    service_area,
    notes,
    created_at,
    updated_at";

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM lead WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(lead_from_row).transpose()
    }

    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {LEAD_COLUMNS} FROM lead WHERE 1 = 1"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(category_id) = &filter.category_id {
            builder.push(" AND category_id = ").push_bind(category_id.0.as_str());
        }
        if let Some(assigned_to) = &filter.assigned_to {
            builder.push(" AND assigned_to = ").push_bind(assigned_to.0.as_str());
        }
        if let Some(priority) = filter.priority {
            builder.push(" AND priority = ").push_bind(priority.as_str());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.replace('%', "\\%").replace('_', "\\_"));
            builder
                .push(" AND (customer_name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR phone LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(lead_from_row).collect()
    }

    async fn save(&self, lead: Lead) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lead (
                id,
                customer_name,
                phone,
                email,
                category_id,
                priority,
                status,
                assigned_to,
                sent_at,
                sent_via,
                return_reason,
                converted_at,
                service_area,
                notes,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                customer_name = excluded.customer_name,
                phone = excluded.phone,
                email = excluded.email,
                category_id = excluded.category_id,
                priority = excluded.priority,
                status = excluded.status,
                assigned_to = excluded.assigned_to,
                sent_at = excluded.sent_at,
                sent_via = excluded.sent_via,
                return_reason = excluded.return_reason,
                converted_at = excluded.converted_at,
                service_area = excluded.service_area,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
        )
        .bind(&lead.id.0)
        .bind(&lead.customer_name)
        .bind(&lead.phone)
        .bind(lead.email.as_deref())
        .bind(&lead.category_id.0)
        .bind(lead.priority.as_str())
        .bind(lead.status.as_str())
        .bind(lead.assigned_to.as_ref().map(|id| id.0.as_str()))
        .bind(lead.sent_at.map(|value| value.to_rfc3339()))
        .bind(lead.sent_via.map(|via| via.as_str()))
        .bind(lead.return_reason.as_deref())
        .bind(lead.converted_at.map(|value| value.to_rfc3339()))
        .bind(lead.service_area.as_deref())
        .bind(lead.notes.as_deref())
        .bind(lead.created_at.to_rfc3339())
        .bind(lead.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &LeadId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM lead WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }
}

fn lead_from_row(row: SqliteRow) -> Result<Lead, RepositoryError> {
    let priority_raw = row.try_get::<String, _>("priority")?;
    let priority = Priority::parse(&priority_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown priority `{priority_raw}`")))?;

    let status_raw = row.try_get::<String, _>("status")?;
    let status = LeadStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown lead status `{status_raw}`")))?;

    let sent_via = row
        .try_get::<Option<String>, _>("sent_via")?
        .map(|value| {
            Channel::parse(&value)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown channel `{value}`")))
        })
        .transpose()?;

    Ok(Lead {
        id: LeadId(row.try_get("id")?),
        customer_name: row.try_get("customer_name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        category_id: CategoryId(row.try_get("category_id")?),
        priority,
        status,
        assigned_to: row.try_get::<Option<String>, _>("assigned_to")?.map(ClientId),
        sent_at: parse_optional_timestamp("sent_at", row.try_get("sent_at")?)?,
        sent_via,
        return_reason: row.try_get("return_reason")?,
        converted_at: parse_optional_timestamp("converted_at", row.try_get("converted_at")?)?,
        service_area: row.try_get("service_area")?,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
