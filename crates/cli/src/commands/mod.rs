//! CLI command implementations.

pub mod ledger;
pub mod migrate;
pub mod wallet;

use sqlx::PgPool;
use thiserror::Error;

use monance_core::IdentityIdError;
use monance_web::config::{ConfigError, database_url_from_env};
use monance_web::db::{self, RepositoryError};
use monance_web::services::LedgerError;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityIdError),

    #[error("{0}")]
    Invalid(String),
}

/// Connect to the database named by `MONANCE_DATABASE_URL` / `DATABASE_URL`.
async fn connect() -> Result<PgPool, CliError> {
    let database_url = database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
