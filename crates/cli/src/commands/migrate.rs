//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! monance-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MONANCE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Applies `crates/web/migrations/` (ledger schema and deposit wallets),
//! then creates the session table used by `tower-sessions`.

use monance_web::middleware::postgres_session_store;

use super::{CliError, connect};

/// Run all database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running ledger migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Running session store migrations...");
    postgres_session_store(&pool).migrate().await?;

    tracing::info!("Migrations complete");
    Ok(())
}
