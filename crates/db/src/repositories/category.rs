use sqlx::{sqlite::SqliteRow, Row};

use leadline_core::domain::category::{Category, CategoryId};

use super::{parse_timestamp, CategoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCategoryRepository {
    pool: DbPool,
}

impl SqlCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CategoryRepository for SqlCategoryRepository {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                name_he,
                name_en,
                description_he,
                description_en,
                is_active,
                created_at
             FROM category
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(category_from_row).transpose()
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let query = if active_only {
            "SELECT
                id,
                name_he,
                name_en,
                description_he,
                description_en,
                is_active,
                created_at
             FROM category
             WHERE is_active = 1
             ORDER BY name_en ASC"
        } else {
            "SELECT
                id,
                name_he,
                name_en,
                description_he,
                description_en,
                is_active,
                created_at
             FROM category
             ORDER BY name_en ASC"
        };

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        rows.into_iter().map(category_from_row).collect()
    }

    async fn save(&self, category: Category) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO category (
                id,
                name_he,
                name_en,
                description_he,
                description_en,
                is_active,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name_he = excluded.name_he,
                name_en = excluded.name_en,
                description_he = excluded.description_he,
                description_en = excluded.description_en,
                is_active = excluded.is_active",
        )
        .bind(&category.id.0)
        .bind(&category.name_he)
        .bind(&category.name_en)
        .bind(category.description_he.as_deref())
        .bind(category.description_en.as_deref())
        .bind(category.is_active)
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn category_from_row(row: SqliteRow) -> Result<Category, RepositoryError> {
    Ok(Category {
        id: CategoryId(row.try_get("id")?),
        name_he: row.try_get("name_he")?,
        name_en: row.try_get("name_en")?,
        description_he: row.try_get("description_he")?,
        description_en: row.try_get("description_en")?,
        is_active: row.try_get("is_active")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use leadline_core::chrono::{DateTime, Utc};
    use leadline_core::domain::category::{Category, CategoryId};

    use super::SqlCategoryRepository;
    use crate::migrations;
    use crate::repositories::CategoryRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn sample_category(id: &str, name_en: &str, active: bool) -> Category {
        Category {
            id: CategoryId(id.to_string()),
            name_he: "קטגוריה".to_string(),
            name_en: name_en.to_string(),
            description_he: Some("תיאור".to_string()),
            description_en: None,
            is_active: active,
            created_at: parse_ts("2026-01-01T08:00:00Z"),
        }
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[tokio::test]
    async fn sql_category_repo_round_trips_bilingual_fields() {
        let pool = setup_pool().await;
        let repo = SqlCategoryRepository::new(pool.clone());

        let category = sample_category("plumbing", "Plumbing", true);
        repo.save(category.clone()).await.expect("save category");

        let found = repo.find_by_id(&category.id).await.expect("find category");
        assert_eq!(found, Some(category));

        pool.close().await;
    }

    #[tokio::test]
    async fn list_active_only_hides_retired_categories() {
        let pool = setup_pool().await;
        let repo = SqlCategoryRepository::new(pool.clone());

        repo.save(sample_category("plumbing", "Plumbing", true)).await.expect("save");
        repo.save(sample_category("roofing", "Roofing", false)).await.expect("save");

        let all = repo.list(false).await.expect("list all");
        assert_eq!(all.len(), 2);

        let active = repo.list(true).await.expect("list active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, CategoryId("plumbing".to_string()));

        pool.close().await;
    }
}
