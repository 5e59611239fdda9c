//! The per-identity user record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntryKind, IdentityId, LedgerEntry, VerificationState};

/// Plan label assigned to every new user.
pub const DEFAULT_PLAN: &str = "basic";

/// A user's account record (without history).
///
/// `version` is bumped by every mutation and is the token for optimistic
/// conditional updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub identity_id: IdentityId,
    pub display_name: String,
    /// Withdrawable total. Never negative.
    pub balance: Decimal,
    /// Confirmed principal deposited. Never decreases.
    pub deposit_total: Decimal,
    pub verification: VerificationState,
    pub plan: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A freshly created user with default fields.
    #[must_use]
    pub fn new(identity_id: IdentityId, display_name: String, now: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            display_name,
            balance: Decimal::ZERO,
            deposit_total: Decimal::ZERO,
            verification: VerificationState::Unverified,
            plan: DEFAULT_PLAN.to_owned(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Earnings on top of principal (`balance - deposit_total`).
    ///
    /// Negative once withdrawals exceed earnings.
    #[must_use]
    pub fn profit(&self) -> Decimal {
        self.balance - self.deposit_total
    }

    /// Balance not already claimed by unconfirmed withdrawals.
    #[must_use]
    pub fn available(&self, history: &[LedgerEntry]) -> Decimal {
        let pending_debits: Decimal = history
            .iter()
            .filter(|e| e.kind() == EntryKind::Debit && !e.confirmed())
            .map(|e| e.amount().value())
            .sum();
        (self.balance - pending_debits).max(Decimal::ZERO)
    }
}

/// Fields of the user record that support atomic increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceField {
    Balance,
    DepositTotal,
}

impl BalanceField {
    /// Column name in storage.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::DepositTotal => "deposit_total",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{EntryId, NewEntry, ReceiptRef};

    fn user() -> User {
        User::new(IdentityId::parse("user_1").unwrap(), "Ada".into(), Utc::now())
    }

    #[test]
    fn test_new_user_defaults() {
        let user = user();
        assert_eq!(user.balance, Decimal::ZERO);
        assert_eq!(user.deposit_total, Decimal::ZERO);
        assert_eq!(user.verification, VerificationState::Unverified);
        assert_eq!(user.plan, "basic");
        assert_eq!(user.version, 0);
    }

    #[test]
    fn test_profit() {
        let mut user = user();
        user.balance = Decimal::new(1500, 0);
        user.deposit_total = Decimal::new(1000, 0);
        assert_eq!(user.profit(), Decimal::new(500, 0));
    }

    #[test]
    fn test_available_subtracts_pending_debits_only() {
        let mut user = user();
        user.balance = Decimal::new(100, 0);

        let pending = NewEntry::Debit {
            amount: "30".parse().unwrap(),
            payout: None,
        }
        .into_entry(EntryId::new(1), Utc::now());
        let confirmed = NewEntry::Debit {
            amount: "20".parse().unwrap(),
            payout: None,
        }
        .into_entry(EntryId::new(2), Utc::now())
        .into_confirmed();
        let credit = NewEntry::Credit {
            amount: "500".parse().unwrap(),
            receipt: ReceiptRef::parse("https://x/y.png").unwrap(),
        }
        .into_entry(EntryId::new(3), Utc::now());

        let available = user.available(&[pending, confirmed, credit]);
        assert_eq!(available, Decimal::new(70, 0));
    }
}
