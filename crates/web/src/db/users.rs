//! `PostgreSQL` user record store.
//!
//! Queries are built at runtime with `sqlx::query_as` and decoded into
//! private row types, then validated into core types. Rows that fail
//! validation surface as `RepositoryError::DataCorruption`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use monance_core::{
    Amount, BalanceField, CreditEntry, DebitEntry, DepositWallet, EntryId, IdentityId,
    LedgerEntry, NewEntry, NewWallet, PayoutAsset, PayoutTarget, ReceiptRef, User,
    VerificationState,
};

use super::{RepositoryError, UserStore, WalletRepository, confirmation_deltas};

const USER_COLUMNS: &str = "identity_id, display_name, balance, deposit_total, \
     verification_state, plan, version, created_at, updated_at";

const ENTRY_COLUMNS: &str =
    "id, kind, amount, confirmed, receipt_url, payout_asset, payout_address, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    identity_id: String,
    display_name: String,
    balance: Decimal,
    deposit_total: Decimal,
    verification_state: i16,
    plan: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let identity_id = IdentityId::parse(&row.identity_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid identity id in database: {e}"))
        })?;
        let verification = VerificationState::from_code(row.verification_state)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            identity_id,
            display_name: row.display_name,
            balance: row.balance,
            deposit_total: row.deposit_total,
            verification,
            plan: row.plan,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    kind: String,
    amount: Decimal,
    confirmed: bool,
    receipt_url: Option<String>,
    payout_asset: Option<String>,
    payout_address: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = RepositoryError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, detail: String| {
            RepositoryError::DataCorruption(format!("entry {}: {what}: {detail}", row.id))
        };

        let id = EntryId::new(row.id);
        let amount = Amount::new(row.amount).map_err(|e| corrupt("amount", e.to_string()))?;

        match row.kind.as_str() {
            "credit" => {
                let url = row
                    .receipt_url
                    .as_deref()
                    .ok_or_else(|| corrupt("receipt", "missing".to_owned()))?;
                let receipt = ReceiptRef::parse(url).map_err(|e| corrupt("receipt", e.to_string()))?;
                Ok(Self::Credit(CreditEntry {
                    id,
                    amount,
                    confirmed: row.confirmed,
                    receipt,
                    created_at: row.created_at,
                }))
            }
            "debit" => {
                let payout = match (row.payout_asset.as_deref(), row.payout_address.as_deref()) {
                    (Some(asset), Some(address)) => {
                        let asset: PayoutAsset =
                            asset.parse().map_err(|e: monance_core::InvalidStatus| {
                                corrupt("payout asset", e.to_string())
                            })?;
                        Some(
                            PayoutTarget::new(asset, address)
                                .map_err(|e| corrupt("payout address", e.to_string()))?,
                        )
                    }
                    (None, None) => None,
                    _ => return Err(corrupt("payout", "incomplete".to_owned())),
                };
                Ok(Self::Debit(DebitEntry {
                    id,
                    amount,
                    confirmed: row.confirmed,
                    payout,
                    created_at: row.created_at,
                }))
            }
            other => Err(corrupt("kind", other.to_owned())),
        }
    }
}

/// Column values for inserting a [`NewEntry`].
struct EntryValues {
    kind: &'static str,
    amount: Decimal,
    receipt_url: Option<String>,
    payout_asset: Option<&'static str>,
    payout_address: Option<String>,
}

impl From<NewEntry> for EntryValues {
    fn from(entry: NewEntry) -> Self {
        let kind = entry.kind().as_str();
        let amount = entry.amount().value();
        match entry {
            NewEntry::Credit { receipt, .. } => Self {
                kind,
                amount,
                receipt_url: Some(receipt.into()),
                payout_asset: None,
                payout_address: None,
            },
            NewEntry::Debit { payout, .. } => {
                let (asset, address) = payout
                    .map(|p| (p.asset.as_str(), p.address))
                    .unzip();
                Self {
                    kind,
                    amount,
                    receipt_url: None,
                    payout_asset: asset,
                    payout_address: address,
                }
            }
        }
    }
}

/// `PostgreSQL`-backed [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for readiness checks.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn exists(&self, identity: &IdentityId) -> Result<bool, RepositoryError> {
        let found: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM ledger.user_account WHERE identity_id = $1")
                .bind(identity)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

impl UserStore for PgUserStore {
    async fn find(&self, identity: &IdentityId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM ledger.user_account WHERE identity_id = $1"
        ))
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn create(
        &self,
        identity: &IdentityId,
        display_name: &str,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO ledger.user_account (identity_id, display_name) \
             VALUES ($1, $2) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(identity)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("identity already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        User::try_from(row)
    }

    async fn history(&self, identity: &IdentityId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        if !self.exists(identity).await? {
            return Err(RepositoryError::NotFound);
        }

        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger.ledger_entry \
             WHERE identity_id = $1 \
             ORDER BY id"
        ))
        .bind(identity)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn append_entry(
        &self,
        identity: &IdentityId,
        entry: NewEntry,
        expected_version: Option<i64>,
    ) -> Result<Option<LedgerEntry>, RepositoryError> {
        let values = EntryValues::from(entry);

        // The version bump and the insert share one statement, so a guarded
        // append cannot interleave with another mutation of the same user.
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "WITH bumped AS ( \
                 UPDATE ledger.user_account \
                 SET version = version + 1, updated_at = NOW() \
                 WHERE identity_id = $1 AND ($2::BIGINT IS NULL OR version = $2) \
                 RETURNING identity_id \
             ) \
             INSERT INTO ledger.ledger_entry \
                 (identity_id, kind, amount, receipt_url, payout_asset, payout_address) \
             SELECT identity_id, $3, $4, $5, $6, $7 FROM bumped \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(identity)
        .bind(expected_version)
        .bind(values.kind)
        .bind(values.amount)
        .bind(values.receipt_url)
        .bind(values.payout_asset)
        .bind(values.payout_address)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => LedgerEntry::try_from(row).map(Some),
            None if self.exists(identity).await? => Ok(None),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn transition_verification(
        &self,
        identity: &IdentityId,
        from: VerificationState,
        to: VerificationState,
    ) -> Result<Option<User>, RepositoryError> {
        if !from.can_advance_to(to) {
            return Ok(None);
        }
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE ledger.user_account \
             SET verification_state = $3, version = version + 1, updated_at = NOW() \
             WHERE identity_id = $1 AND verification_state = $2 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(identity)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn atomic_increment(
        &self,
        identity: &IdentityId,
        field: BalanceField,
        delta: Decimal,
        expected_version: i64,
    ) -> Result<Option<User>, RepositoryError> {
        let column = field.column();
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE ledger.user_account \
             SET {column} = {column} + $2, version = version + 1, updated_at = NOW() \
             WHERE identity_id = $1 AND version = $3 AND {column} + $2 >= 0 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(identity)
        .bind(delta)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn confirm_entry(
        &self,
        identity: &IdentityId,
        entry_id: EntryId,
        expected_version: i64,
    ) -> Result<Option<(User, LedgerEntry)>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let entry_row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger.ledger_entry \
             WHERE id = $1 AND identity_id = $2 AND NOT confirmed \
             FOR UPDATE"
        ))
        .bind(entry_id)
        .bind(identity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entry_row) = entry_row else {
            return Ok(None);
        };
        let entry = LedgerEntry::try_from(entry_row)?;
        let (balance_delta, deposit_delta) = confirmation_deltas(&entry);

        let user_row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE ledger.user_account \
             SET balance = balance + $2, \
                 deposit_total = deposit_total + $3, \
                 version = version + 1, \
                 updated_at = NOW() \
             WHERE identity_id = $1 AND version = $4 AND balance + $2 >= 0 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(identity)
        .bind(balance_delta)
        .bind(deposit_delta)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping `tx` without commit rolls back the row lock.
        let Some(user_row) = user_row else {
            return Ok(None);
        };

        sqlx::query("UPDATE ledger.ledger_entry SET confirmed = TRUE WHERE id = $1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some((User::try_from(user_row)?, entry.into_confirmed())))
    }

    async fn list_wallets(&self) -> Result<Vec<DepositWallet>, RepositoryError> {
        WalletRepository::new(&self.pool).list().await
    }

    async fn add_wallet(&self, wallet: NewWallet) -> Result<DepositWallet, RepositoryError> {
        WalletRepository::new(&self.pool).add(&wallet).await
    }
}
