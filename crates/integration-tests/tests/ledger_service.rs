//! Integration tests for the ledger service over the in-memory store.
//!
//! These cover lazy user creation, append-only history, the verification
//! state machine, and confirmation-time balance updates.

#![allow(clippy::unwrap_used)]

use monance_core::{EntryKind, PayoutAsset, VerificationState};
use monance_integration_tests::{BTC_ADDRESS, RECEIPT_URL, ctx, dollars};
use monance_web::db::{MemoryUserStore, UserStore};
use monance_web::services::LedgerService;
use monance_web::services::ledger::{LedgerError, PayoutRequest};
use rust_decimal::Decimal;

fn service() -> LedgerService<MemoryUserStore> {
    LedgerService::new(MemoryUserStore::new())
}

/// Deposit and confirm `amount` for a verified user.
async fn fund(service: &LedgerService<MemoryUserStore>, identity: &str, amount: i64) {
    let ctx = ctx(identity);
    let entry = service
        .record_deposit(&ctx, dollars(amount), RECEIPT_URL)
        .await
        .unwrap();
    let user = service.get_or_create_user(&ctx).await.unwrap();
    service
        .confirm_entry(&ctx.identity_id, entry.id(), user.version)
        .await
        .unwrap();
}

async fn verify(service: &LedgerService<MemoryUserStore>, identity: &str) {
    let ctx = ctx(identity);
    service.approve_verification(&ctx).await.unwrap().unwrap();
    service
        .complete_verification(&ctx.identity_id)
        .await
        .unwrap()
        .unwrap();
}

// =============================================================================
// Lazy Creation
// =============================================================================

#[tokio::test]
async fn test_first_access_creates_default_user() {
    let service = service();
    let user = service.get_or_create_user(&ctx("user_new")).await.unwrap();

    assert_eq!(user.balance, Decimal::ZERO);
    assert_eq!(user.deposit_total, Decimal::ZERO);
    assert_eq!(user.verification, VerificationState::Unverified);
    assert_eq!(user.plan, "basic");
    assert!(service.get_history(&ctx("user_new")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_access_returns_same_user() {
    let service = service();
    let first = service.get_or_create_user(&ctx("user_same")).await.unwrap();
    let second = service.get_or_create_user(&ctx("user_same")).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_history_read_creates_user() {
    let service = service();
    let history = service.get_history(&ctx("user_reader")).await.unwrap();
    assert!(history.is_empty());

    let stored = service
        .store()
        .find(&ctx("user_reader").identity_id)
        .await
        .unwrap();
    assert!(stored.is_some());
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_counts_successful_calls_in_order() {
    let service = service();
    verify(&service, "user_hist").await;
    fund(&service, "user_hist", 500).await;
    let ctx = ctx("user_hist");

    service
        .record_deposit(&ctx, dollars(10), RECEIPT_URL)
        .await
        .unwrap();
    service
        .record_withdrawal(&ctx, dollars(20), None)
        .await
        .unwrap();
    // Rejected calls add nothing
    assert!(service.record_withdrawal(&ctx, Decimal::ZERO, None).await.is_err());
    assert!(service.record_deposit(&ctx, dollars(5), "not a url").await.is_err());
    service
        .record_deposit(&ctx, dollars(30), RECEIPT_URL)
        .await
        .unwrap();

    let history = service.get_history(&ctx).await.unwrap();
    let amounts: Vec<Decimal> = history.iter().map(|e| e.amount().value()).collect();
    assert_eq!(amounts, vec![dollars(500), dollars(10), dollars(20), dollars(30)]);

    let kinds: Vec<EntryKind> = history.iter().map(monance_core::LedgerEntry::kind).collect();
    assert_eq!(
        kinds,
        vec![EntryKind::Credit, EntryKind::Credit, EntryKind::Debit, EntryKind::Credit]
    );
}

#[tokio::test]
async fn test_deposit_round_trip() {
    let service = service();
    let ctx = ctx("user_round");
    service
        .record_deposit(&ctx, dollars(100), "https://x/y.png")
        .await
        .unwrap();

    let history = service.get_history(&ctx).await.unwrap();
    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry.amount().value(), dollars(100));
    assert_eq!(entry.kind(), EntryKind::Credit);
    assert!(!entry.confirmed());
    assert_eq!(entry.receipt().unwrap().as_str(), "https://x/y.png");
    assert!(entry.created_at().timestamp() > 0);
}

#[tokio::test]
async fn test_concurrent_deposits_both_append() {
    let service = service();
    let ctx = ctx("user_concurrent");
    service.get_or_create_user(&ctx).await.unwrap();

    let (a, b) = tokio::join!(
        service.record_deposit(&ctx, dollars(50), "https://ucarecdn.com/r1/"),
        service.record_deposit(&ctx, dollars(75), "https://ucarecdn.com/r2/"),
    );
    a.unwrap();
    b.unwrap();

    let history = service.get_history(&ctx).await.unwrap();
    assert_eq!(history.len(), 2);
    let mut amounts: Vec<Decimal> = history.iter().map(|e| e.amount().value()).collect();
    amounts.sort();
    assert_eq!(amounts, vec![dollars(50), dollars(75)]);
}

#[tokio::test]
async fn test_concurrent_deposits_on_missing_user() {
    let service = service();
    let ctx = ctx("user_race");

    let (a, b) = tokio::join!(
        service.record_deposit(&ctx, dollars(50), "https://ucarecdn.com/r1/"),
        service.record_deposit(&ctx, dollars(75), "https://ucarecdn.com/r2/"),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(service.get_history(&ctx).await.unwrap().len(), 2);
}

// =============================================================================
// Withdrawals
// =============================================================================

#[tokio::test]
async fn test_non_positive_withdrawal_never_reaches_store() {
    let service = service();
    let ctx = ctx("user_zero");

    for amount in [Decimal::ZERO, dollars(-10)] {
        let err = service.record_withdrawal(&ctx, amount, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
    // Validation happens before lazy creation
    let stored = service.store().find(&ctx.identity_id).await.unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_withdrawal_requires_verified() {
    let service = service();
    let ctx = ctx("user_unverified");

    let err = service
        .record_withdrawal(&ctx, dollars(10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotVerified));

    service.approve_verification(&ctx).await.unwrap();
    let err = service
        .record_withdrawal(&ctx, dollars(10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotVerified));
    assert!(service.get_history(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_withdrawal_limited_to_available_balance() {
    let service = service();
    verify(&service, "user_limit").await;
    fund(&service, "user_limit", 100).await;
    let ctx = ctx("user_limit");

    service
        .record_withdrawal(&ctx, dollars(60), None)
        .await
        .unwrap();

    // The pending 60 is already claimed
    let err = service
        .record_withdrawal(&ctx, dollars(50), None)
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientFunds { available, .. } => assert_eq!(available, dollars(40)),
        other => panic!("expected insufficient funds, got {other:?}"),
    }

    service
        .record_withdrawal(&ctx, dollars(40), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_withdrawal_payout_address_validated() {
    let service = service();
    verify(&service, "user_payout").await;
    fund(&service, "user_payout", 100).await;
    let ctx = ctx("user_payout");

    let bad = PayoutRequest {
        asset: PayoutAsset::Ethereum,
        address: BTC_ADDRESS.to_owned(),
    };
    let err = service
        .record_withdrawal(&ctx, dollars(10), Some(bad))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let good = PayoutRequest {
        asset: PayoutAsset::Bitcoin,
        address: BTC_ADDRESS.to_owned(),
    };
    let entry = service
        .record_withdrawal(&ctx, dollars(10), Some(good))
        .await
        .unwrap();
    assert_eq!(entry.kind(), EntryKind::Debit);
}

// =============================================================================
// Verification State Machine
// =============================================================================

#[tokio::test]
async fn test_approve_verification_is_idempotent() {
    let service = service();
    let ctx = ctx("user_approve");

    let first = service.approve_verification(&ctx).await.unwrap();
    assert_eq!(first.unwrap().verification, VerificationState::Pending);

    let second = service.approve_verification(&ctx).await.unwrap();
    assert!(second.is_none());

    let user = service.get_or_create_user(&ctx).await.unwrap();
    assert_eq!(user.verification, VerificationState::Pending);
}

#[tokio::test]
async fn test_approve_on_verified_is_noop() {
    let service = service();
    verify(&service, "user_done").await;
    let ctx = ctx("user_done");

    assert!(service.approve_verification(&ctx).await.unwrap().is_none());
    let user = service.get_or_create_user(&ctx).await.unwrap();
    assert_eq!(user.verification, VerificationState::Verified);
}

#[tokio::test]
async fn test_complete_verification_only_from_pending() {
    let service = service();
    let ctx = ctx("user_complete");
    service.get_or_create_user(&ctx).await.unwrap();

    assert!(service
        .complete_verification(&ctx.identity_id)
        .await
        .unwrap()
        .is_none());

    service.approve_verification(&ctx).await.unwrap();
    let user = service
        .complete_verification(&ctx.identity_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.verification, VerificationState::Verified);

    assert!(service
        .complete_verification(&ctx.identity_id)
        .await
        .unwrap()
        .is_none());
}

// =============================================================================
// Confirmation and Earnings
// =============================================================================

#[tokio::test]
async fn test_balances_move_only_on_confirmation() {
    let service = service();
    let ctx = ctx("user_confirm");
    let entry = service
        .record_deposit(&ctx, dollars(250), RECEIPT_URL)
        .await
        .unwrap();

    let user = service.get_or_create_user(&ctx).await.unwrap();
    assert_eq!(user.balance, Decimal::ZERO);
    assert_eq!(user.deposit_total, Decimal::ZERO);

    let (user, confirmed) = service
        .confirm_entry(&ctx.identity_id, entry.id(), user.version)
        .await
        .unwrap();
    assert!(confirmed.confirmed());
    assert_eq!(user.balance, dollars(250));
    assert_eq!(user.deposit_total, dollars(250));

    // A second confirmation is rejected and changes nothing
    let err = service
        .confirm_entry(&ctx.identity_id, entry.id(), user.version)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PreconditionFailed(_)));
    let after = service.get_or_create_user(&ctx).await.unwrap();
    assert_eq!(after.balance, dollars(250));
}

#[tokio::test]
async fn test_confirmed_withdrawal_reduces_balance_only() {
    let service = service();
    verify(&service, "user_debit").await;
    fund(&service, "user_debit", 300).await;
    let ctx = ctx("user_debit");

    let entry = service
        .record_withdrawal(&ctx, dollars(120), None)
        .await
        .unwrap();
    let user = service.get_or_create_user(&ctx).await.unwrap();
    let (user, _) = service
        .confirm_entry(&ctx.identity_id, entry.id(), user.version)
        .await
        .unwrap();

    assert_eq!(user.balance, dollars(180));
    assert_eq!(user.deposit_total, dollars(300));
}

#[tokio::test]
async fn test_stale_version_rejected() {
    let service = service();
    let ctx = ctx("user_stale");
    let entry = service
        .record_deposit(&ctx, dollars(40), RECEIPT_URL)
        .await
        .unwrap();
    let stale = service.get_or_create_user(&ctx).await.unwrap().version;

    service
        .record_deposit(&ctx, dollars(1), RECEIPT_URL)
        .await
        .unwrap();

    let err = service
        .confirm_entry(&ctx.identity_id, entry.id(), stale)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PreconditionFailed(_)));

    let err = service
        .credit_earnings(&ctx.identity_id, dollars(5), stale)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PreconditionFailed(_)));
}

#[tokio::test]
async fn test_operator_actions_on_missing_user() {
    let service = service();
    let ctx = ctx("user_ghost");

    let err = service
        .credit_earnings(&ctx.identity_id, dollars(5), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound));

    assert!(service
        .complete_verification(&ctx.identity_id)
        .await
        .unwrap()
        .is_none());
    // Operator actions never create users
    assert!(service.store().find(&ctx.identity_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_earnings_raise_profit() {
    let service = service();
    fund(&service, "user_profit", 1000).await;
    let ctx = ctx("user_profit");
    let version = service.get_or_create_user(&ctx).await.unwrap().version;

    let user = service
        .credit_earnings(&ctx.identity_id, dollars(650), version)
        .await
        .unwrap();
    assert_eq!(user.balance, dollars(1650));
    assert_eq!(user.profit(), dollars(650));

    let dashboard = service.dashboard(&ctx).await.unwrap();
    assert_eq!(dashboard.profit, dollars(650));
    assert_eq!(dashboard.available, dollars(1650));
}
