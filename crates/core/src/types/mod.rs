//! Core types for Monance.
//!
//! This module provides type-safe wrappers for the ledger's domain concepts.

pub mod amount;
pub mod entry;
pub mod id;
pub mod identity;
pub mod status;
pub mod user;
pub mod wallet;

pub use amount::{Amount, AmountError};
pub use entry::{
    CreditEntry, DebitEntry, EntryError, LedgerEntry, NewEntry, PayoutAsset, PayoutTarget,
    ReceiptRef,
};
pub use id::*;
pub use identity::{IdentityId, IdentityIdError};
pub use status::*;
pub use user::{BalanceField, DEFAULT_PLAN, User};
pub use wallet::{DepositWallet, NewWallet, WalletError};
