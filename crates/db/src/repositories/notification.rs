use sqlx::{sqlite::SqliteRow, Row};

use leadline_core::domain::client::ClientId;
use leadline_core::domain::notification::{Notification, NotificationId, NotificationKind};

use super::{parse_timestamp, NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn save(&self, notification: Notification) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notification (
                id,
                client_id,
                title,
                message,
                kind,
                is_read,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                is_read = excluded.is_read",
        )
        .bind(&notification.id.0)
        .bind(&notification.client_id.0)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.is_read)
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_client(
        &self,
        client_id: &ClientId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let query = if unread_only {
            "SELECT id, client_id, title, message, kind, is_read, created_at
             FROM notification
             WHERE client_id = ? AND is_read = 0
             ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT id, client_id, title, message, kind, is_read, created_at
             FROM notification
             WHERE client_id = ?
             ORDER BY created_at DESC, id DESC"
        };

        let rows = sqlx::query(query).bind(&client_id.0).fetch_all(&self.pool).await?;
        rows.into_iter().map(notification_from_row).collect()
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE notification SET is_read = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_all_read(&self, client_id: &ClientId) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE notification SET is_read = 1 WHERE client_id = ? AND is_read = 0")
                .bind(&client_id.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn find_by_id(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, client_id, title, message, kind, is_read, created_at
             FROM notification
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(notification_from_row).transpose()
    }

    async fn delete(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM notification WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn notification_from_row(row: SqliteRow) -> Result<Notification, RepositoryError> {
    let kind_raw = row.try_get::<String, _>("kind")?;
    let kind = NotificationKind::parse(&kind_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown notification kind `{kind_raw}`"))
    })?;

    Ok(Notification {
        id: NotificationId(row.try_get("id")?),
        client_id: ClientId(row.try_get("client_id")?),
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        kind,
        is_read: row.try_get("is_read")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
