use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use leadline_core::config::{AppConfig, ConfigError, LoadOptions};
use leadline_db::repositories::{
    SqlCategoryRepository, SqlClientRepository, SqlDeliveryLogRepository, SqlHistoryRepository,
    SqlLeadRepository, SqlNotificationRepository,
};
use leadline_db::{connect, migrations, DbPool};
use leadline_notify::Dispatcher;

use crate::allocation::AllocationService;
use crate::api::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool =
        connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let delivery_log = Arc::new(SqlDeliveryLogRepository::new(db_pool.clone()));
    let dispatcher = Dispatcher::from_config(&config.notifier, delivery_log);
    info!(
        event_name = "system.bootstrap.notifier_mode",
        enabled = config.notifier.enabled,
        "outbound notifier configured"
    );

    let service = Arc::new(AllocationService::new(
        Arc::new(SqlClientRepository::new(db_pool.clone())),
        Arc::new(SqlCategoryRepository::new(db_pool.clone())),
        Arc::new(SqlLeadRepository::new(db_pool.clone())),
        Arc::new(SqlHistoryRepository::new(db_pool.clone())),
        Arc::new(SqlNotificationRepository::new(db_pool.clone())),
        dispatcher,
    ));

    Ok(Application { config, db_pool, state: AppState { service } })
}

#[cfg(test)]
mod tests {
    use leadline_core::config::{ConfigOverrides, LoadOptions};
    use leadline_core::{Channel, ClientId, LeadId, LeadStatus};
    use leadline_db::SeedDataset;

    use crate::allocation::Actor;
    use crate::bootstrap::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_exposes_the_baseline_tables() {
        let app = bootstrap(memory_options()).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN \
             ('client', 'category', 'lead', 'lead_history', 'notification', 'delivery_log')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables after bootstrap");
        assert_eq!(table_count, 6);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn integration_smoke_covers_seed_assign_and_return() {
        let app = bootstrap(memory_options()).await.expect("bootstrap should succeed");
        SeedDataset::load(&app.db_pool).await.expect("load seed fixtures");

        let operator = Actor::operator("operator-001");
        let assigned = app
            .state
            .service
            .assign_lead(
                &LeadId("lead-new-001".to_string()),
                &ClientId("client-starter-001".to_string()),
                Channel::Email,
                &operator,
            )
            .await
            .expect("seeded lead should be assignable");
        assert_eq!(assigned.status, LeadStatus::Sent);

        let client = app
            .state
            .service
            .get_client(&ClientId("client-starter-001".to_string()))
            .await
            .expect("seeded client exists");
        assert_eq!(client.leads_received_this_month, 4, "seeded at 3, one slot consumed");

        let returned = app
            .state
            .service
            .return_lead(
                &LeadId("lead-new-001".to_string()),
                Some("customer unreachable".to_string()),
                &Actor::client("client-starter-001"),
            )
            .await
            .expect("assigned client may return");
        assert_eq!(returned.status, LeadStatus::Returned);

        let client = app
            .state
            .service
            .get_client(&ClientId("client-starter-001".to_string()))
            .await
            .expect("seeded client exists");
        assert_eq!(client.leads_received_this_month, 3, "refund restores the counter");

        app.db_pool.close().await;
    }
}
