use sqlx::{sqlite::SqliteRow, Row};

use leadline_core::domain::category::CategoryId;
use leadline_core::domain::client::{Client, ClientId, PackageType, Quota, Role};

use super::{parse_timestamp, parse_u32, ClientRepository, RepositoryError};
use crate::DbPool;

pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn allowed_categories(&self, id: &ClientId) -> Result<Vec<CategoryId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT category_id FROM client_category WHERE client_id = ? ORDER BY category_id",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| CategoryId(row.get("category_id"))).collect())
    }
}

#[async_trait::async_trait]
impl ClientRepository for SqlClientRepository {
    async fn find_by_id(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                name,
                email,
                phone,
                package_type,
                role,
                monthly_lead_limit,
                leads_received_this_month,
                categories_allowed,
                is_active,
                is_vip,
                created_at,
                updated_at
             FROM client
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let allowed_categories = self.allowed_categories(id).await?;
        client_from_row(row, allowed_categories).map(Some)
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Client>, RepositoryError> {
        let query = if active_only {
            "SELECT
                id,
                name,
                email,
                phone,
                package_type,
                role,
                monthly_lead_limit,
                leads_received_this_month,
                categories_allowed,
                is_active,
                is_vip,
                created_at,
                updated_at
             FROM client
             WHERE is_active = 1
             ORDER BY name ASC"
        } else {
            "SELECT
                id,
                name,
                email,
                phone,
                package_type,
                role,
                monthly_lead_limit,
                leads_received_this_month,
                categories_allowed,
                is_active,
                is_vip,
                created_at,
                updated_at
             FROM client
             ORDER BY name ASC"
        };

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut clients = Vec::with_capacity(rows.len());
        for row in rows {
            let id = ClientId(row.get::<String, _>("id"));
            let allowed_categories = self.allowed_categories(&id).await?;
            clients.push(client_from_row(row, allowed_categories)?);
        }
        Ok(clients)
    }

    async fn save(&self, client: Client) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO client (
                id,
                name,
                email,
                phone,
                package_type,
                role,
                monthly_lead_limit,
                leads_received_this_month,
                categories_allowed,
                is_active,
                is_vip,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                package_type = excluded.package_type,
                role = excluded.role,
                monthly_lead_limit = excluded.monthly_lead_limit,
                leads_received_this_month = excluded.leads_received_this_month,
                categories_allowed = excluded.categories_allowed,
                is_active = excluded.is_active,
                is_vip = excluded.is_vip,
                updated_at = excluded.updated_at",
        )
        .bind(&client.id.0)
        .bind(&client.name)
        .bind(&client.email)
        .bind(client.phone.as_deref())
        .bind(client.package.as_str())
        .bind(client.role.as_str())
        .bind(client.monthly_lead_limit.to_db())
        .bind(i64::from(client.leads_received_this_month))
        .bind(client.category_access.to_db())
        .bind(client.is_active)
        .bind(client.is_vip)
        .bind(client.created_at.to_rfc3339())
        .bind(client.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM client_category WHERE client_id = ?")
            .bind(&client.id.0)
            .execute(&mut *tx)
            .await?;

        for category_id in &client.allowed_categories {
            sqlx::query("INSERT INTO client_category (client_id, category_id) VALUES (?, ?)")
                .bind(&client.id.0)
                .bind(&category_id.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn try_consume_quota(&self, id: &ClientId) -> Result<bool, RepositoryError> {
        // Conditional update: the quota check and the increment are one
        // statement, so concurrent consumers cannot both take the last slot.
        let result = sqlx::query(
            "UPDATE client
             SET leads_received_this_month = leads_received_this_month + 1,
                 updated_at = ?
             WHERE id = ?
               AND (monthly_lead_limit IS NULL
                    OR leads_received_this_month < monthly_lead_limit)",
        )
        .bind(leadline_core::chrono::Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn adjust_received(&self, id: &ClientId, delta: i64) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE client
             SET leads_received_this_month = MAX(0, leads_received_this_month + ?),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(delta)
        .bind(leadline_core::chrono::Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn client_from_row(
    row: SqliteRow,
    allowed_categories: Vec<CategoryId>,
) -> Result<Client, RepositoryError> {
    let package_raw = row.try_get::<String, _>("package_type")?;
    let package = PackageType::parse(&package_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown package type `{package_raw}`")))?;

    let role_raw = row.try_get::<String, _>("role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown role `{role_raw}`")))?;

    Ok(Client {
        id: ClientId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        package,
        role,
        monthly_lead_limit: Quota::from_db(row.try_get("monthly_lead_limit")?),
        leads_received_this_month: parse_u32(
            "leads_received_this_month",
            row.try_get("leads_received_this_month")?,
        )?,
        category_access: Quota::from_db(row.try_get("categories_allowed")?),
        allowed_categories,
        is_active: row.try_get("is_active")?,
        is_vip: row.try_get("is_vip")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
