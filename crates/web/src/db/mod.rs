//! Persistence for the Monance ledger.
//!
//! # Database: `monance`
//!
//! ## Tables
//!
//! - `ledger.user_account` - One row per external identity (balance, deposit
//!   total, verification state, version)
//! - `ledger.ledger_entry` - Append-only deposit/withdrawal history
//! - `ledger.deposit_wallet` - Deposit addresses shown to users
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Stores
//!
//! The ledger service talks to storage only through [`UserStore`]:
//!
//! - [`PgUserStore`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryUserStore`] - in-process map (tests, local development)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p monance-cli -- migrate
//! ```

pub mod memory;
pub mod users;
pub mod wallets;

use std::future::Future;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use monance_core::{
    BalanceField, DepositWallet, EntryId, IdentityId, LedgerEntry, NewEntry, NewWallet, User,
    VerificationState,
};

pub use memory::MemoryUserStore;
pub use users::PgUserStore;
pub use wallets::WalletRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate identity).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage operations the ledger service relies on.
///
/// The store also holds the deposit wallet catalogue, which is global
/// rather than per-user.
///
/// Every mutation bumps the user's `version`. Conditional operations return
/// `Ok(None)` when their guard does not hold rather than an error, so callers
/// can tell "someone else got there first" apart from a broken store.
pub trait UserStore: Clone + Send + Sync + 'static {
    /// Point lookup by identity.
    fn find(
        &self,
        identity: &IdentityId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Create a user with default fields.
    ///
    /// Returns `RepositoryError::Conflict` if the identity already exists.
    fn create(
        &self,
        identity: &IdentityId,
        display_name: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// The user's history in insertion order.
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    fn history(
        &self,
        identity: &IdentityId,
    ) -> impl Future<Output = Result<Vec<LedgerEntry>, RepositoryError>> + Send;

    /// Append an entry to the user's history.
    ///
    /// With `expected_version = Some(v)` the append only happens if the user
    /// is still at version `v`; otherwise it always happens. Returns
    /// `Ok(None)` on a version mismatch and `RepositoryError::NotFound` if the
    /// user does not exist.
    fn append_entry(
        &self,
        identity: &IdentityId,
        entry: NewEntry,
        expected_version: Option<i64>,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, RepositoryError>> + Send;

    /// Compare-and-set on the verification state.
    ///
    /// Returns the updated user, or `Ok(None)` if `from -> to` is not a legal
    /// forward step, the user is missing, or the user is not currently in
    /// state `from`.
    fn transition_verification(
        &self,
        identity: &IdentityId,
        from: VerificationState,
        to: VerificationState,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Add `delta` to a balance field if the user is at `expected_version`
    /// and the field stays non-negative.
    fn atomic_increment(
        &self,
        identity: &IdentityId,
        field: BalanceField,
        delta: Decimal,
        expected_version: i64,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Mark an entry confirmed and apply it to the balances in one step.
    ///
    /// Credits add to `balance` and `deposit_total`; debits subtract from
    /// `balance`. Returns `Ok(None)` if the user is not at
    /// `expected_version`, the entry is missing or already confirmed, or the
    /// balance would go negative.
    fn confirm_entry(
        &self,
        identity: &IdentityId,
        entry_id: EntryId,
        expected_version: i64,
    ) -> impl Future<Output = Result<Option<(User, LedgerEntry)>, RepositoryError>> + Send;

    /// All deposit wallets, oldest first.
    fn list_wallets(
        &self,
    ) -> impl Future<Output = Result<Vec<DepositWallet>, RepositoryError>> + Send;

    /// Register a deposit wallet.
    ///
    /// Returns `RepositoryError::Conflict` if the address is already listed.
    fn add_wallet(
        &self,
        wallet: NewWallet,
    ) -> impl Future<Output = Result<DepositWallet, RepositoryError>> + Send;
}

/// Balance and deposit-total deltas produced by confirming `entry`.
#[must_use]
pub fn confirmation_deltas(entry: &LedgerEntry) -> (Decimal, Decimal) {
    let amount = entry.amount().value();
    match entry {
        LedgerEntry::Credit(_) => (amount, amount),
        LedgerEntry::Debit(_) => (-amount, Decimal::ZERO),
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use monance_core::ReceiptRef;

    use super::*;

    #[test]
    fn test_confirmation_deltas() {
        let credit = NewEntry::Credit {
            amount: "100".parse().unwrap(),
            receipt: ReceiptRef::parse("https://x/y.png").unwrap(),
        }
        .into_entry(EntryId::new(1), Utc::now());
        assert_eq!(
            confirmation_deltas(&credit),
            (Decimal::new(100, 0), Decimal::new(100, 0))
        );

        let debit = NewEntry::Debit {
            amount: "40".parse().unwrap(),
            payout: None,
        }
        .into_entry(EntryId::new(2), Utc::now());
        assert_eq!(
            confirmation_deltas(&debit),
            (Decimal::new(-40, 0), Decimal::ZERO)
        );
    }
}
