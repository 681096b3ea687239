use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_CLIENT_IDS: &[&str] =
    &["client-starter-001", "client-vip-001", "client-paused-001", "operator-001"];

const SEED_CATEGORY_IDS: &[&str] = &["cat-plumbing", "cat-electrical"];

const SEED_LEADS: &[SeedLeadContract] = &[
    SeedLeadContract { lead_id: "lead-new-001", status: "new", history_entries: 0 },
    SeedLeadContract { lead_id: "lead-new-002", status: "new", history_entries: 0 },
    SeedLeadContract { lead_id: "lead-sent-001", status: "sent", history_entries: 2 },
    SeedLeadContract { lead_id: "lead-returned-001", status: "returned", history_entries: 3 },
    SeedLeadContract { lead_id: "lead-converted-001", status: "converted", history_entries: 3 },
];

#[derive(Debug, Clone, Copy)]
struct SeedLeadContract {
    lead_id: &'static str,
    status: &'static str,
    history_entries: i64,
}

/// Deterministic demo dataset covering every lead lifecycle state, a
/// limited client, an unlimited VIP client, and a deactivated account.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the seed dataset. Idempotent: reloading leaves the same rows.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            clients_seeded: SEED_CLIENT_IDS.len(),
            categories_seeded: SEED_CATEGORY_IDS.len(),
            leads_seeded: SEED_LEADS.len(),
        })
    }

    /// Verify that seeded rows exist and match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for client_id in SEED_CLIENT_IDS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM client WHERE id = ?1)")
                    .bind(client_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((*client_id, exists == 1));
        }

        for category_id in SEED_CATEGORY_IDS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1)")
                    .bind(category_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((*category_id, exists == 1));
        }

        for lead in SEED_LEADS {
            let status_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM lead WHERE id = ?1 AND status = ?2)",
            )
            .bind(lead.lead_id)
            .bind(lead.status)
            .fetch_one(pool)
            .await?;
            checks.push((lead.lead_id, status_ok == 1));

            let history_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM lead_history WHERE lead_id = ?1")
                    .bind(lead.lead_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((lead.lead_id, history_count == lead.history_entries));
        }

        // the unlimited VIP must carry a NULL limit, not a large number
        let vip_unlimited: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM client
             WHERE id = 'client-vip-001' AND monthly_lead_limit IS NULL AND is_vip = 1)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("vip-unlimited-null-limit", vip_unlimited == 1));

        let paused_inactive: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM client
             WHERE id = 'client-paused-001' AND is_active = 0)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("paused-client-inactive", paused_inactive == 1));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_leads = sql_array_from_ids(
            &SEED_LEADS.iter().map(|lead| lead.lead_id).collect::<Vec<_>>(),
        );
        let quoted_clients = sql_array_from_ids(SEED_CLIENT_IDS);
        let quoted_categories = sql_array_from_ids(SEED_CATEGORY_IDS);

        sqlx::query(&format!("DELETE FROM lead WHERE id IN {quoted_leads}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM notification WHERE client_id IN {quoted_clients}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM client WHERE id IN {quoted_clients}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM category WHERE id IN {quoted_categories}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub clients_seeded: usize,
    pub categories_seeded: usize,
    pub leads_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::SeedDataset;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!SeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        let first = SeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = SeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.leads_seeded, 5);

        let second = SeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification = SeedDataset::verify(&pool).await.expect("re-verify");
        assert!(second_verification.all_present);
        assert_eq!(second.leads_seeded, 5);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn clean_removes_seeded_rows_and_cascades_history() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");
        SeedDataset::load(&pool).await.expect("load seed fixtures");
        SeedDataset::clean(&pool).await.expect("clean seed fixtures");

        let lead_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM lead")
            .fetch_one(&pool)
            .await
            .expect("count leads");
        assert_eq!(lead_count, 0);

        let history_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM lead_history")
            .fetch_one(&pool)
            .await
            .expect("count history");
        assert_eq!(history_count, 0, "history rows should cascade with their leads");
    }
}
