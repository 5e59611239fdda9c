//! Operator ledger commands.
//!
//! # Usage
//!
//! ```bash
//! # Show a user's version and unconfirmed entries
//! monance-cli entry list --identity user_2abc --pending
//!
//! # Move a user from pending to verified
//! monance-cli verification complete --identity user_2abc
//!
//! # Confirm a pending deposit or withdrawal
//! monance-cli entry confirm --identity user_2abc --entry 17 --version 4
//!
//! # Credit investment returns
//! monance-cli earnings credit --identity user_2abc --amount 125.50 --version 5
//! ```
//!
//! `--version` is the user's current version as printed by `entry list`
//! (and by every command that changes the user); a stale version is rejected.

use rust_decimal::Decimal;

use monance_core::{EntryId, IdentityId, LedgerEntry};
use monance_web::db::{PgUserStore, RepositoryError, UserStore};
use monance_web::services::LedgerService;

use super::{CliError, connect};

/// Entries to show, oldest first.
fn visible_entries(history: &[LedgerEntry], pending_only: bool) -> Vec<&LedgerEntry> {
    history
        .iter()
        .filter(|entry| !pending_only || !entry.confirmed())
        .collect()
}

/// Show a user's balances, current version and ledger entries.
///
/// # Errors
///
/// Returns a repository `NotFound` if the user has no record.
pub async fn list_entries(identity: &str, pending_only: bool) -> Result<(), CliError> {
    let identity = IdentityId::parse(identity)?;
    let store = PgUserStore::new(connect().await?);

    let user = store
        .find(&identity)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let history = store.history(&identity).await?;

    tracing::info!(
        identity = %user.identity_id,
        verification = %user.verification,
        balance = %user.balance,
        deposit_total = %user.deposit_total,
        version = user.version,
        "User"
    );

    let entries = visible_entries(&history, pending_only);
    if entries.is_empty() {
        tracing::info!("No matching entries");
    }
    for entry in entries {
        tracing::info!(
            entry_id = %entry.id(),
            kind = %entry.kind(),
            amount = %entry.amount(),
            confirmed = entry.confirmed(),
            created_at = %entry.created_at(),
            "Entry"
        );
    }
    Ok(())
}

async fn service() -> Result<LedgerService<PgUserStore>, CliError> {
    let pool = connect().await?;
    Ok(LedgerService::new(PgUserStore::new(pool)))
}

/// Complete verification for a pending user.
///
/// # Errors
///
/// Returns `CliError::Invalid` if the user is missing or not pending.
pub async fn complete_verification(identity: &str) -> Result<(), CliError> {
    let identity = IdentityId::parse(identity)?;
    let service = service().await?;

    let user = service
        .complete_verification(&identity)
        .await?
        .ok_or_else(|| CliError::Invalid(format!("{identity} is missing or not pending")))?;

    tracing::info!(
        identity = %user.identity_id,
        version = user.version,
        "Verification completed"
    );
    Ok(())
}

/// Confirm a pending ledger entry, applying it to the user's balance.
///
/// # Errors
///
/// Returns an error if the user is missing, the version is stale, or the
/// entry cannot be confirmed.
pub async fn confirm_entry(identity: &str, entry: i64, version: i64) -> Result<(), CliError> {
    let identity = IdentityId::parse(identity)?;
    let service = service().await?;

    let (user, entry) = service
        .confirm_entry(&identity, EntryId::new(entry), version)
        .await?;

    tracing::info!(
        identity = %user.identity_id,
        entry_id = %entry.id(),
        kind = %entry.kind(),
        balance = %user.balance,
        deposit_total = %user.deposit_total,
        version = user.version,
        "Entry confirmed"
    );
    Ok(())
}

/// Credit investment returns to a user's balance.
///
/// # Errors
///
/// Returns an error if the amount is not positive, the user is missing, or
/// the version is stale.
pub async fn credit_earnings(identity: &str, amount: Decimal, version: i64) -> Result<(), CliError> {
    let identity = IdentityId::parse(identity)?;
    let service = service().await?;

    let user = service.credit_earnings(&identity, amount, version).await?;

    tracing::info!(
        identity = %user.identity_id,
        balance = %user.balance,
        profit = %user.profit(),
        version = user.version,
        "Earnings credited"
    );
    Ok(())
}
