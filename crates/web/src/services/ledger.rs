//! Ledger service: balance, deposit and history mutation rules plus
//! verification-state transitions.
//!
//! Every user-facing operation takes an explicit [`IdentityContext`]; nothing
//! here reads the session. Operator operations (confirmation, earnings,
//! completing verification) take a bare [`IdentityId`] and never create users.
//!
//! Balances move only when an operator confirms an entry. Recording a
//! deposit or withdrawal appends an unconfirmed entry and leaves `balance`
//! and `deposit_total` untouched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use monance_core::{
    Amount, AmountError, BalanceField, EntryError, EntryId, IdentityId, LedgerEntry, NewEntry,
    PayoutAsset, PayoutTarget, ReceiptRef, User, VerificationState,
};

use crate::db::{RepositoryError, UserStore};

/// Number of entries shown on the dashboard.
pub const RECENT_ENTRIES: usize = 10;

/// Who is calling: the resolved external identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub identity_id: IdentityId,
    pub display_name: String,
}

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input rejected before touching the store.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Withdrawal attempted before verification completed.
    #[error("account is not verified")]
    NotVerified,

    /// Withdrawal exceeds the balance not already claimed.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    /// A conditional update's guard did not hold.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The user record does not exist.
    #[error("user not found")]
    NotFound,

    /// The store failed.
    #[error("persistence failure: {0}")]
    Persistence(RepositoryError),
}

impl From<RepositoryError> for LedgerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Persistence(other),
        }
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EntryError> for LedgerError {
    fn from(err: EntryError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl LedgerError {
    /// Message safe to show the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotVerified => {
                "Your account must be verified before you can withdraw.".to_owned()
            }
            Self::InsufficientFunds { available, .. } => {
                format!("Insufficient balance. Available: ${available:.2}")
            }
            Self::PreconditionFailed(_) => {
                "Your account changed while this request was processed. Please try again."
                    .to_owned()
            }
            Self::NotFound => "Account not found.".to_owned(),
            Self::Persistence(_) => "Something went wrong. Please try again later.".to_owned(),
        }
    }
}

/// Destination requested for a withdrawal, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub asset: PayoutAsset,
    pub address: String,
}

/// Identity document kinds accepted by the KYC form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    NationalId,
    DrivingLicense,
    ResidencePermit,
}

impl DocumentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::NationalId => "national_id",
            Self::DrivingLicense => "driving_license",
            Self::ResidencePermit => "residence_permit",
        }
    }
}

/// Summary shown on the user's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub display_name: String,
    pub balance: Decimal,
    pub deposit_total: Decimal,
    pub profit: Decimal,
    pub available: Decimal,
    pub verification: VerificationState,
    pub plan: String,
    /// Newest first.
    pub recent: Vec<LedgerEntry>,
}

/// Ledger operations over a [`UserStore`].
#[derive(Clone)]
pub struct LedgerService<S> {
    store: S,
}

impl<S: UserStore> LedgerService<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Look up the caller's record, creating it with defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the record is still absent after a
    /// lost creation race, or `LedgerError::Persistence` if the store fails.
    pub async fn get_or_create_user(&self, ctx: &IdentityContext) -> Result<User, LedgerError> {
        if let Some(user) = self.store.find(&ctx.identity_id).await? {
            return Ok(user);
        }

        match self.store.create(&ctx.identity_id, &ctx.display_name).await {
            Ok(user) => {
                tracing::info!(identity = %ctx.identity_id, "User created");
                Ok(user)
            }
            Err(RepositoryError::Conflict(_)) => self
                .store
                .find(&ctx.identity_id)
                .await?
                .ok_or(LedgerError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a deposit awaiting confirmation.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for a non-positive amount or a bad
    /// receipt URL; the store is not touched in that case.
    pub async fn record_deposit(
        &self,
        ctx: &IdentityContext,
        amount: Decimal,
        receipt_url: &str,
    ) -> Result<LedgerEntry, LedgerError> {
        let amount = Amount::new(amount)?;
        let receipt = ReceiptRef::parse(receipt_url)?;

        self.get_or_create_user(ctx).await?;
        let entry = self
            .store
            .append_entry(&ctx.identity_id, NewEntry::Credit { amount, receipt }, None)
            .await?
            .ok_or_else(|| LedgerError::PreconditionFailed("deposit append rejected".to_owned()))?;

        tracing::info!(
            identity = %ctx.identity_id,
            entry_id = %entry.id(),
            amount = %amount,
            "Deposit recorded"
        );
        Ok(entry)
    }

    /// Record a withdrawal request awaiting confirmation.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Validation` for a non-positive amount or a malformed
    ///   payout address, before the store is touched
    /// - `LedgerError::NotVerified` unless the user is `Verified`
    /// - `LedgerError::InsufficientFunds` if the amount exceeds the balance
    ///   not already claimed by pending withdrawals
    /// - `LedgerError::PreconditionFailed` if the record changed concurrently
    pub async fn record_withdrawal(
        &self,
        ctx: &IdentityContext,
        amount: Decimal,
        payout: Option<PayoutRequest>,
    ) -> Result<LedgerEntry, LedgerError> {
        let amount = Amount::new(amount)?;
        let payout = payout
            .map(|p| PayoutTarget::new(p.asset, &p.address))
            .transpose()?;

        let user = self.get_or_create_user(ctx).await?;
        if !user.verification.allows_withdrawal() {
            return Err(LedgerError::NotVerified);
        }

        let history = self.store.history(&ctx.identity_id).await?;
        let available = user.available(&history);
        if amount.value() > available {
            return Err(LedgerError::InsufficientFunds {
                requested: amount.value(),
                available,
            });
        }

        // Guarded by the version read above so two concurrent withdrawals
        // cannot both pass the balance check.
        let entry = self
            .store
            .append_entry(
                &ctx.identity_id,
                NewEntry::Debit { amount, payout },
                Some(user.version),
            )
            .await?
            .ok_or_else(|| {
                LedgerError::PreconditionFailed(format!(
                    "user changed since version {}",
                    user.version
                ))
            })?;

        tracing::info!(
            identity = %ctx.identity_id,
            entry_id = %entry.id(),
            amount = %amount,
            "Withdrawal recorded"
        );
        Ok(entry)
    }

    /// Move the caller from `Unverified` to `Pending`.
    ///
    /// Returns `Ok(None)` without changing anything when the caller is not
    /// `Unverified`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Persistence` if the store fails.
    pub async fn approve_verification(
        &self,
        ctx: &IdentityContext,
    ) -> Result<Option<User>, LedgerError> {
        self.get_or_create_user(ctx).await?;
        let updated = self
            .store
            .transition_verification(
                &ctx.identity_id,
                VerificationState::Unverified,
                VerificationState::Pending,
            )
            .await?;

        if updated.is_some() {
            tracing::info!(identity = %ctx.identity_id, "Verification submitted");
        }
        Ok(updated)
    }

    /// KYC submission: record the uploaded document in the log and request
    /// verification.
    ///
    /// The document reference itself is not stored.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the document URL is not an
    /// http(s) URL.
    pub async fn submit_verification(
        &self,
        ctx: &IdentityContext,
        document_url: &str,
        document_type: DocumentType,
    ) -> Result<Option<User>, LedgerError> {
        let document = ReceiptRef::parse(document_url)?;
        tracing::info!(
            identity = %ctx.identity_id,
            document_type = document_type.as_str(),
            document = %document,
            "KYC document submitted"
        );
        self.approve_verification(ctx).await
    }

    /// Move a user from `Pending` to `Verified`.
    ///
    /// Returns `Ok(None)` when the user is missing or not `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Persistence` if the store fails.
    pub async fn complete_verification(
        &self,
        identity: &IdentityId,
    ) -> Result<Option<User>, LedgerError> {
        let updated = self
            .store
            .transition_verification(
                identity,
                VerificationState::Pending,
                VerificationState::Verified,
            )
            .await?;

        if updated.is_some() {
            tracing::info!(identity = %identity, "Verification completed");
        }
        Ok(updated)
    }

    /// The caller's history in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Persistence` if the store fails.
    pub async fn get_history(
        &self,
        ctx: &IdentityContext,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.get_or_create_user(ctx).await?;
        Ok(self.store.history(&ctx.identity_id).await?)
    }

    /// Operator confirmation of a pending entry.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotFound` if the user does not exist
    /// - `LedgerError::PreconditionFailed` if the version is stale, the entry
    ///   is missing or already confirmed, or a debit would overdraw the balance
    pub async fn confirm_entry(
        &self,
        identity: &IdentityId,
        entry_id: EntryId,
        expected_version: i64,
    ) -> Result<(User, LedgerEntry), LedgerError> {
        if self.store.find(identity).await?.is_none() {
            return Err(LedgerError::NotFound);
        }

        let (user, entry) = self
            .store
            .confirm_entry(identity, entry_id, expected_version)
            .await?
            .ok_or_else(|| {
                LedgerError::PreconditionFailed(format!(
                    "entry {entry_id} cannot be confirmed at version {expected_version}"
                ))
            })?;

        tracing::info!(
            identity = %identity,
            entry_id = %entry_id,
            kind = %entry.kind(),
            amount = %entry.amount(),
            balance = %user.balance,
            "Entry confirmed"
        );
        Ok((user, entry))
    }

    /// Operator credit of investment returns to the balance.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Validation` for a non-positive amount
    /// - `LedgerError::NotFound` if the user does not exist
    /// - `LedgerError::PreconditionFailed` if the version is stale
    pub async fn credit_earnings(
        &self,
        identity: &IdentityId,
        amount: Decimal,
        expected_version: i64,
    ) -> Result<User, LedgerError> {
        let amount = Amount::new(amount)?;
        if self.store.find(identity).await?.is_none() {
            return Err(LedgerError::NotFound);
        }

        let user = self
            .store
            .atomic_increment(
                identity,
                BalanceField::Balance,
                amount.value(),
                expected_version,
            )
            .await?
            .ok_or_else(|| {
                LedgerError::PreconditionFailed(format!(
                    "user changed since version {expected_version}"
                ))
            })?;

        tracing::info!(
            identity = %identity,
            amount = %amount,
            balance = %user.balance,
            "Earnings credited"
        );
        Ok(user)
    }

    /// Balances, verification state and recent history for the caller.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Persistence` if the store fails.
    pub async fn dashboard(&self, ctx: &IdentityContext) -> Result<Dashboard, LedgerError> {
        let user = self.get_or_create_user(ctx).await?;
        let history = self.store.history(&ctx.identity_id).await?;

        Ok(Dashboard {
            available: user.available(&history),
            profit: user.profit(),
            recent: history.into_iter().rev().take(RECENT_ENTRIES).collect(),
            display_name: user.display_name,
            balance: user.balance,
            deposit_total: user.deposit_total,
            verification: user.verification,
            plan: user.plan,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryUserStore;

    const RECEIPT: &str = "https://ucarecdn.com/0f8e2a1c-4b5d-4e6f-8a7b-9c0d1e2f3a4b/";

    fn service() -> LedgerService<MemoryUserStore> {
        LedgerService::new(MemoryUserStore::new())
    }

    fn ctx() -> IdentityContext {
        IdentityContext {
            identity_id: IdentityId::parse("user_ledger").unwrap(),
            display_name: "Ada".to_owned(),
        }
    }

    async fn verified_with_balance(service: &LedgerService<MemoryUserStore>, balance: i64) {
        let ctx = ctx();
        service.approve_verification(&ctx).await.unwrap();
        service
            .complete_verification(&ctx.identity_id)
            .await
            .unwrap();
        let entry = service
            .record_deposit(&ctx, Decimal::new(balance, 0), RECEIPT)
            .await
            .unwrap();
        let user = service.get_or_create_user(&ctx).await.unwrap();
        service
            .confirm_entry(&ctx.identity_id, entry.id(), user.version)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deposit_does_not_move_balance() {
        let service = service();
        let entry = service
            .record_deposit(&ctx(), Decimal::new(250, 0), RECEIPT)
            .await
            .unwrap();

        assert!(!entry.confirmed());
        let user = service.get_or_create_user(&ctx()).await.unwrap();
        assert_eq!(user.balance, Decimal::ZERO);
        assert_eq!(user.deposit_total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_deposit_rejects_bad_receipt() {
        let service = service();
        let err = service
            .record_deposit(&ctx(), Decimal::new(10, 0), "not-a-url")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(service.store().find(&ctx().identity_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_withdrawal_requires_verified() {
        let service = service();
        let err = service
            .record_withdrawal(&ctx(), Decimal::new(10, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotVerified));

        service.approve_verification(&ctx()).await.unwrap();
        let err = service
            .record_withdrawal(&ctx(), Decimal::new(10, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotVerified));
    }

    #[tokio::test]
    async fn test_withdrawal_counts_pending_debits() {
        let service = service();
        verified_with_balance(&service, 100).await;

        service
            .record_withdrawal(&ctx(), Decimal::new(60, 0), None)
            .await
            .unwrap();
        let err = service
            .record_withdrawal(&ctx(), Decimal::new(50, 0), None)
            .await
            .unwrap_err();

        match err {
            LedgerError::InsufficientFunds { available, .. } => {
                assert_eq!(available, Decimal::new(40, 0));
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_withdrawal_validates_payout_address() {
        let service = service();
        verified_with_balance(&service, 100).await;

        let err = service
            .record_withdrawal(
                &ctx(),
                Decimal::new(10, 0),
                Some(PayoutRequest {
                    asset: PayoutAsset::Ethereum,
                    address: "0xnope".to_owned(),
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_confirmed_withdrawal_reduces_balance() {
        let service = service();
        verified_with_balance(&service, 100).await;

        let entry = service
            .record_withdrawal(&ctx(), Decimal::new(30, 0), None)
            .await
            .unwrap();
        let user = service.get_or_create_user(&ctx()).await.unwrap();
        let (user, _) = service
            .confirm_entry(&ctx().identity_id, entry.id(), user.version)
            .await
            .unwrap();

        assert_eq!(user.balance, Decimal::new(70, 0));
        assert_eq!(user.deposit_total, Decimal::new(100, 0));
        assert_eq!(user.profit(), Decimal::new(-30, 0));
    }

    #[tokio::test]
    async fn test_confirm_unknown_user_is_not_found() {
        let err = service()
            .confirm_entry(&ctx().identity_id, EntryId::new(1), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound));
    }

    #[tokio::test]
    async fn test_credit_earnings() {
        let service = service();
        let user = service.get_or_create_user(&ctx()).await.unwrap();

        let user = service
            .credit_earnings(&ctx().identity_id, Decimal::new(50, 0), user.version)
            .await
            .unwrap();
        assert_eq!(user.balance, Decimal::new(50, 0));
        assert_eq!(user.profit(), Decimal::new(50, 0));

        let err = service
            .credit_earnings(&ctx().identity_id, Decimal::new(50, 0), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_submit_verification_validates_document_url() {
        let service = service();
        let err = service
            .submit_verification(&ctx(), "", DocumentType::Passport)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let user = service
            .submit_verification(&ctx(), RECEIPT, DocumentType::NationalId)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.verification, VerificationState::Pending);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let service = service();
        verified_with_balance(&service, 100).await;
        service
            .record_withdrawal(&ctx(), Decimal::new(25, 0), None)
            .await
            .unwrap();

        let dashboard = service.dashboard(&ctx()).await.unwrap();
        assert_eq!(dashboard.balance, Decimal::new(100, 0));
        assert_eq!(dashboard.available, Decimal::new(75, 0));
        assert_eq!(dashboard.verification, VerificationState::Verified);
        assert_eq!(dashboard.recent.len(), 2);
        assert_eq!(dashboard.recent[0].kind(), monance_core::EntryKind::Debit);
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = LedgerError::Persistence(RepositoryError::DataCorruption("row 7".to_owned()));
        assert!(!err.user_message().contains("row 7"));
    }
}
