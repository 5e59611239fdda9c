//! Deposit wallet repository.

use sqlx::PgPool;

use monance_core::{DepositWallet, NewWallet, WalletId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct WalletRow {
    id: i64,
    address: String,
    network: String,
}

impl From<WalletRow> for DepositWallet {
    fn from(row: WalletRow) -> Self {
        Self {
            id: WalletId::new(row.id),
            address: row.address,
            network: row.network,
        }
    }
}

/// Repository for the `ledger.deposit_wallet` table.
pub struct WalletRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WalletRepository<'a> {
    /// Create a new wallet repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all wallets in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<DepositWallet>, RepositoryError> {
        let rows: Vec<WalletRow> =
            sqlx::query_as("SELECT id, address, network FROM ledger.deposit_wallet ORDER BY id")
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(DepositWallet::from).collect())
    }

    /// Insert a wallet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the address already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(&self, wallet: &NewWallet) -> Result<DepositWallet, RepositoryError> {
        let row: WalletRow = sqlx::query_as(
            "INSERT INTO ledger.deposit_wallet (address, network) \
             VALUES ($1, $2) \
             RETURNING id, address, network",
        )
        .bind(wallet.address())
        .bind(wallet.network())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("wallet address already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}
