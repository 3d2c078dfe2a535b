use airops_core::CoreError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(config.password.expose());

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await?;

        info!(
            "Connected to database {} on {}:{} as {}",
            config.name, config.host, config.port, config.user
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Translate driver errors into the domain taxonomy by SQLSTATE.
pub(crate) fn map_db_error(err: sqlx::Error) -> CoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.code().as_deref() {
            // lock_not_available, raised once `lock_timeout` expires
            Some("55P03") => return CoreError::Timeout(db_err.message().to_string()),
            Some("23505") | Some("23514") => return CoreError::Conflict(db_err.message().to_string()),
            Some("23503") => return CoreError::NotFound(db_err.message().to_string()),
            _ => {}
        }
    }

    match err {
        sqlx::Error::PoolTimedOut => {
            CoreError::StorageError("timed out waiting for a database connection".to_string())
        }
        other => CoreError::StorageError(other.to_string()),
    }
}
