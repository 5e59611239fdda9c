//! In-process [`UserStore`] for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use monance_core::{
    BalanceField, DepositWallet, EntryId, IdentityId, LedgerEntry, NewEntry, NewWallet, User,
    VerificationState, WalletId,
};

use super::{RepositoryError, UserStore, confirmation_deltas};

#[derive(Default)]
struct Record {
    user: Option<User>,
    history: Vec<LedgerEntry>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<IdentityId, Record>,
    next_entry_id: i64,
    wallets: Vec<DepositWallet>,
}

impl Inner {
    fn user_mut(&mut self, identity: &IdentityId) -> Option<(&mut User, &mut Vec<LedgerEntry>)> {
        self.records.get_mut(identity).and_then(|record| {
            let Record { user, history } = record;
            user.as_mut().map(|user| (user, history))
        })
    }
}

/// A [`UserStore`] holding everything in a mutex-guarded map.
///
/// Each operation takes the lock for its whole duration, which gives the
/// same atomicity the `PostgreSQL` store gets from single statements.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn bump(user: &mut User) {
    user.version += 1;
    user.updated_at = Utc::now();
}

impl UserStore for MemoryUserStore {
    async fn find(&self, identity: &IdentityId) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .records
            .get(identity)
            .and_then(|record| record.user.clone()))
    }

    async fn create(
        &self,
        identity: &IdentityId,
        display_name: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.entry(identity.clone()).or_default();
        if record.user.is_some() {
            return Err(RepositoryError::Conflict(
                "identity already exists".to_owned(),
            ));
        }
        let user = User::new(identity.clone(), display_name.to_owned(), Utc::now());
        record.user = Some(user.clone());
        Ok(user)
    }

    async fn history(&self, identity: &IdentityId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let (_, history) = inner
            .user_mut(identity)
            .ok_or(RepositoryError::NotFound)?;
        Ok(history.clone())
    }

    async fn append_entry(
        &self,
        identity: &IdentityId,
        entry: NewEntry,
        expected_version: Option<i64>,
    ) -> Result<Option<LedgerEntry>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let id = EntryId::new(inner.next_entry_id + 1);

        let (user, history) = inner
            .user_mut(identity)
            .ok_or(RepositoryError::NotFound)?;
        if expected_version.is_some_and(|v| v != user.version) {
            return Ok(None);
        }

        bump(user);
        let entry = entry.into_entry(id, Utc::now());
        history.push(entry.clone());
        inner.next_entry_id += 1;
        Ok(Some(entry))
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
        let mut inner = self.inner.lock().await;
        let Some((user, _)) = inner.user_mut(identity) else {
            return Ok(None);
        };
        if user.verification != from {
            return Ok(None);
        }
        user.verification = to;
        bump(user);
        Ok(Some(user.clone()))
    }

    async fn atomic_increment(
        &self,
        identity: &IdentityId,
        field: BalanceField,
        delta: Decimal,
        expected_version: i64,
    ) -> Result<Option<User>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some((user, _)) = inner.user_mut(identity) else {
            return Ok(None);
        };
        if user.version != expected_version {
            return Ok(None);
        }

        let target = match field {
            BalanceField::Balance => &mut user.balance,
            BalanceField::DepositTotal => &mut user.deposit_total,
        };
        let next = *target + delta;
        if next < Decimal::ZERO {
            return Ok(None);
        }
        *target = next;
        bump(user);
        Ok(Some(user.clone()))
    }

    async fn confirm_entry(
        &self,
        identity: &IdentityId,
        entry_id: EntryId,
        expected_version: i64,
    ) -> Result<Option<(User, LedgerEntry)>, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some((user, history)) = inner.user_mut(identity) else {
            return Ok(None);
        };
        if user.version != expected_version {
            return Ok(None);
        }
        let Some(slot) = history
            .iter_mut()
            .find(|e| e.id() == entry_id && !e.confirmed())
        else {
            return Ok(None);
        };

        let (balance_delta, deposit_delta) = confirmation_deltas(slot);
        let balance = user.balance + balance_delta;
        if balance < Decimal::ZERO {
            return Ok(None);
        }

        user.balance = balance;
        user.deposit_total += deposit_delta;
        bump(user);
        *slot = slot.clone().into_confirmed();
        Ok(Some((user.clone(), slot.clone())))
    }

    async fn list_wallets(&self) -> Result<Vec<DepositWallet>, RepositoryError> {
        Ok(self.inner.lock().await.wallets.clone())
    }

    async fn add_wallet(&self, wallet: NewWallet) -> Result<DepositWallet, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.wallets.iter().any(|w| w.address == wallet.address()) {
            return Err(RepositoryError::Conflict(
                "wallet address already exists".to_owned(),
            ));
        }
        let id = WalletId::new(i64::try_from(inner.wallets.len()).unwrap_or(i64::MAX) + 1);
        let wallet = wallet.into_wallet(id);
        inner.wallets.push(wallet.clone());
        Ok(wallet)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use monance_core::ReceiptRef;

    use super::*;

    fn identity() -> IdentityId {
        IdentityId::parse("user_mem").unwrap()
    }

    fn deposit(amount: &str) -> NewEntry {
        NewEntry::Credit {
            amount: amount.parse().unwrap(),
            receipt: ReceiptRef::parse("https://ucarecdn.com/r/").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_conflicts_on_existing_identity() {
        let store = MemoryUserStore::new();
        store.create(&identity(), "Ada").await.unwrap();
        let err = store.create(&identity(), "Ada").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_transition_rejects_backward_and_skipping_steps() {
        use VerificationState::{Pending, Unverified, Verified};

        let store = MemoryUserStore::new();
        store.create(&identity(), "Ada").await.unwrap();

        assert!(store
            .transition_verification(&identity(), Unverified, Verified)
            .await
            .unwrap()
            .is_none());
        store
            .transition_verification(&identity(), Unverified, Pending)
            .await
            .unwrap()
            .unwrap();
        let verified = store
            .transition_verification(&identity(), Pending, Verified)
            .await
            .unwrap()
            .unwrap();

        for (from, to) in [(Verified, Unverified), (Verified, Pending), (Verified, Verified)] {
            assert!(store
                .transition_verification(&identity(), from, to)
                .await
                .unwrap()
                .is_none());
        }
        let user = store.find(&identity()).await.unwrap().unwrap();
        assert_eq!(user.verification, Verified);
        assert_eq!(user.version, verified.version);
    }

    #[tokio::test]
    async fn test_history_of_missing_user_is_not_found() {
        let store = MemoryUserStore::new();
        let err = store.history(&identity()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids_and_bumps_version() {
        let store = MemoryUserStore::new();
        store.create(&identity(), "Ada").await.unwrap();

        let first = store
            .append_entry(&identity(), deposit("10"), None)
            .await
            .unwrap()
            .unwrap();
        let second = store
            .append_entry(&identity(), deposit("20"), None)
            .await
            .unwrap()
            .unwrap();

        assert!(first.id() < second.id());
        let user = store.find(&identity()).await.unwrap().unwrap();
        assert_eq!(user.version, 2);
    }

    #[tokio::test]
    async fn test_guarded_append_rejects_stale_version() {
        let store = MemoryUserStore::new();
        store.create(&identity(), "Ada").await.unwrap();
        store
            .append_entry(&identity(), deposit("10"), None)
            .await
            .unwrap();

        let stale = store
            .append_entry(&identity(), deposit("10"), Some(0))
            .await
            .unwrap();
        assert!(stale.is_none());
        assert_eq!(store.history(&identity()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_atomic_increment_never_goes_negative() {
        let store = MemoryUserStore::new();
        store.create(&identity(), "Ada").await.unwrap();

        let result = store
            .atomic_increment(&identity(), BalanceField::Balance, Decimal::new(-1, 0), 0)
            .await
            .unwrap();
        assert!(result.is_none());

        let user = store
            .atomic_increment(&identity(), BalanceField::Balance, Decimal::new(5, 0), 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.balance, Decimal::new(5, 0));
        assert_eq!(user.version, 1);
    }

    #[tokio::test]
    async fn test_confirm_entry_only_once() {
        let store = MemoryUserStore::new();
        store.create(&identity(), "Ada").await.unwrap();
        let entry = store
            .append_entry(&identity(), deposit("100"), None)
            .await
            .unwrap()
            .unwrap();

        let (user, confirmed) = store
            .confirm_entry(&identity(), entry.id(), 1)
            .await
            .unwrap()
            .unwrap();
        assert!(confirmed.confirmed());
        assert_eq!(user.balance, Decimal::new(100, 0));
        assert_eq!(user.deposit_total, Decimal::new(100, 0));

        let again = store
            .confirm_entry(&identity(), entry.id(), user.version)
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_wallet_addresses_are_unique() {
        let store = MemoryUserStore::new();
        let wallet = NewWallet::new("bc1qexample", "BTC").unwrap();
        let added = store.add_wallet(wallet.clone()).await.unwrap();
        assert_eq!(added.id, WalletId::new(1));

        let err = store.add_wallet(wallet).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.list_wallets().await.unwrap().len(), 1);
    }
}
