use std::{env, sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::{
    access::Level, config::ConsoleSettings, diagnostics::DiagnosticsClient, system::HostInspector,
};

const SEED_OWNER_NICKNAME: &str = "admin";
const SEED_OWNER_PASSWORD: &str = "change-me";

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    settings: Arc<ConsoleSettings>,
    diagnostics: DiagnosticsClient,
    http: reqwest::Client,
    inspector: HostInspector,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL env var is missing")?;
        let settings = ConsoleSettings::from_env().context("failed to read console settings")?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        Self::from_parts(pool, settings)
    }

    pub fn from_parts(pool: PgPool, settings: ConsoleSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.diagnostics.timeout.max(Duration::from_secs(1)))
            .build()
            .context("failed to build HTTP client")?;
        let diagnostics = DiagnosticsClient::new(settings.diagnostics.clone());

        Ok(Self {
            pool,
            settings: Arc::new(settings),
            diagnostics,
            http,
            inspector: HostInspector,
        })
    }

    pub async fn ensure_seed_owner(&self) -> Result<()> {
        let has_owner: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM users JOIN user_levels ON user_levels.id_user_level = users.id_user_level
                WHERE user_levels.level = $1)",
        )
        .bind(Level::Owner.rank())
        .fetch_one(&self.pool)
        .await
        .context("failed to verify owner presence")?;

        if !has_owner {
            let password_hash = crate::web::auth::hash_password(SEED_OWNER_PASSWORD)
                .map_err(|err| anyhow!("failed to hash seed owner password: {err}"))?;

            sqlx::query(
                "INSERT INTO users (nickname, password, username, id_user_level)
                 SELECT $1, $2, $1, id_user_level FROM user_levels WHERE level = $3",
            )
            .bind(SEED_OWNER_NICKNAME)
            .bind(password_hash)
            .bind(Level::Owner.rank())
            .execute(&self.pool)
            .await
            .context("failed to insert seed owner")?;

            info!(
                nickname = SEED_OWNER_NICKNAME,
                "seeded default owner account with password 'change-me'; update it promptly"
            );
        }

        Ok(())
    }

    pub fn pool_ref(&self) -> &PgPool {
        &self.pool
    }

    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    pub fn diagnostics(&self) -> &DiagnosticsClient {
        &self.diagnostics
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn inspector(&self) -> &HostInspector {
        &self.inspector
    }
}
