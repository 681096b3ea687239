use sqlx::{sqlite::SqliteRow, Row};

use leadline_core::domain::client::ClientId;
use leadline_core::domain::lead::{DeliveryChannel, LeadId};
use leadline_core::domain::notification::{DeliveryRecord, DeliveryRecordId, DeliveryStatus};

use super::{parse_timestamp, DeliveryLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDeliveryLogRepository {
    pool: DbPool,
}

impl SqlDeliveryLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DeliveryLogRepository for SqlDeliveryLogRepository {
    async fn append(&self, record: DeliveryRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO delivery_log (
                id,
                lead_id,
                client_id,
                channel,
                status,
                error_detail,
                attempted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.lead_id.0)
        .bind(&record.client_id.0)
        .bind(record.channel.as_str())
        .bind(record.status.as_str())
        .bind(record.error_detail.as_deref())
        .bind(record.attempted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<DeliveryRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                lead_id,
                client_id,
                channel,
                status,
                error_detail,
                attempted_at
             FROM delivery_log
             WHERE lead_id = ?
             ORDER BY attempted_at ASC, id ASC",
        )
        .bind(&lead_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: SqliteRow) -> Result<DeliveryRecord, RepositoryError> {
    let channel_raw = row.try_get::<String, _>("channel")?;
    let channel = DeliveryChannel::parse(&channel_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown delivery channel `{channel_raw}`"))
    })?;

    let status_raw = row.try_get::<String, _>("status")?;
    let status = DeliveryStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown delivery status `{status_raw}`"))
    })?;

    Ok(DeliveryRecord {
        id: DeliveryRecordId(row.try_get("id")?),
        lead_id: LeadId(row.try_get("lead_id")?),
        client_id: ClientId(row.try_get("client_id")?),
        channel,
        status,
        error_detail: row.try_get("error_detail")?,
        attempted_at: parse_timestamp("attempted_at", row.try_get("attempted_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use leadline_core::chrono::{DateTime, Utc};
    use leadline_core::domain::client::ClientId;
    use leadline_core::domain::lead::{DeliveryChannel, LeadId};
    use leadline_core::domain::notification::{DeliveryRecord, DeliveryRecordId, DeliveryStatus};

    use super::SqlDeliveryLogRepository;
    use crate::migrations;
    use crate::repositories::DeliveryLogRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn record(id: &str, channel: DeliveryChannel, status: DeliveryStatus) -> DeliveryRecord {
        DeliveryRecord {
            id: DeliveryRecordId(id.to_string()),
            lead_id: LeadId("lead-001".to_string()),
            client_id: ClientId("client-001".to_string()),
            channel,
            status,
            error_detail: matches!(status, DeliveryStatus::Failed)
                .then(|| "gateway timeout".to_string()),
            attempted_at: parse_ts("2026-02-01T10:00:00Z"),
        }
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[tokio::test]
    async fn sql_delivery_log_keeps_both_legs_of_a_fan_out() {
        let pool = setup_pool().await;
        let repo = SqlDeliveryLogRepository::new(pool.clone());

        let email = record("d-1", DeliveryChannel::Email, DeliveryStatus::Delivered);
        let sms = record("d-2", DeliveryChannel::Sms, DeliveryStatus::Failed);
        repo.append(email.clone()).await.expect("append email leg");
        repo.append(sms.clone()).await.expect("append sms leg");

        let records = repo.list_for_lead(&LeadId("lead-001".to_string())).await.expect("list");
        assert_eq!(records, vec![email, sms]);
        assert_eq!(records[1].error_detail.as_deref(), Some("gateway timeout"));

        pool.close().await;
    }
}
