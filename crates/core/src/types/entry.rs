//! Ledger entries: the append-only history of a user's deposits and withdrawals.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Amount, EntryId, EntryKind};

static BITCOIN_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(1|3|bc1)[a-zA-Z0-9]{25,59}$").expect("bitcoin address pattern is valid")
});

static ETHEREUM_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("ethereum address pattern is valid")
});

/// Errors for receipt references and payout targets.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// Receipt reference is not an absolute http(s) URL.
    #[error("receipt must be an http(s) URL: {0}")]
    InvalidReceipt(String),
    /// Wallet address does not match the asset's format.
    #[error("invalid {asset} wallet address")]
    InvalidAddress {
        /// Asset the address was checked against.
        asset: PayoutAsset,
    },
}

/// Reference (URL) to uploaded evidence for a deposit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReceiptRef(String);

impl ReceiptRef {
    /// Parse a receipt reference.
    ///
    /// # Errors
    ///
    /// Returns `EntryError::InvalidReceipt` unless the input is an absolute
    /// `http` or `https` URL with a host.
    pub fn parse(s: &str) -> Result<Self, EntryError> {
        let url = url::Url::parse(s.trim()).map_err(|_| EntryError::InvalidReceipt(s.to_owned()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(EntryError::InvalidReceipt(s.to_owned()));
        }
        Ok(Self(url.into()))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReceiptRef {
    type Error = EntryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReceiptRef> for String {
    fn from(receipt: ReceiptRef) -> Self {
        receipt.0
    }
}

impl std::fmt::Display for ReceiptRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Crypto asset a withdrawal is paid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutAsset {
    Bitcoin,
    Ethereum,
    /// USDT on ERC-20, which uses Ethereum addresses.
    Usdt,
}

impl PayoutAsset {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Ethereum => "ethereum",
            Self::Usdt => "usdt",
        }
    }

    /// Whether `address` is well-formed for this asset.
    #[must_use]
    pub fn accepts(self, address: &str) -> bool {
        match self {
            Self::Bitcoin => BITCOIN_ADDRESS.is_match(address),
            Self::Ethereum | Self::Usdt => ETHEREUM_ADDRESS.is_match(address),
        }
    }
}

impl std::fmt::Display for PayoutAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitcoin => write!(f, "Bitcoin"),
            Self::Ethereum => write!(f, "Ethereum"),
            Self::Usdt => write!(f, "USDT (Tether)"),
        }
    }
}

impl std::str::FromStr for PayoutAsset {
    type Err = super::InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" => Ok(Self::Bitcoin),
            "ethereum" => Ok(Self::Ethereum),
            "usdt" => Ok(Self::Usdt),
            _ => Err(super::InvalidStatus {
                kind: "payout asset",
                value: s.to_string(),
            }),
        }
    }
}

/// Destination wallet for a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutTarget {
    pub asset: PayoutAsset,
    pub address: String,
}

impl PayoutTarget {
    /// Validate a payout target.
    ///
    /// # Errors
    ///
    /// Returns `EntryError::InvalidAddress` if the address does not match the
    /// asset's format.
    pub fn new(asset: PayoutAsset, address: &str) -> Result<Self, EntryError> {
        let address = address.trim();
        if !asset.accepts(address) {
            return Err(EntryError::InvalidAddress { asset });
        }
        Ok(Self {
            asset,
            address: address.to_owned(),
        })
    }
}

/// A deposit awaiting (or past) operator confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEntry {
    pub id: EntryId,
    pub amount: Amount,
    pub confirmed: bool,
    pub receipt: ReceiptRef,
    pub created_at: DateTime<Utc>,
}

/// A withdrawal request awaiting (or past) operator confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitEntry {
    pub id: EntryId,
    pub amount: Amount,
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<PayoutTarget>,
    pub created_at: DateTime<Utc>,
}

/// One line of a user's history.
///
/// Serialized with a `kind` tag so clients can tell deposits from
/// withdrawals without guessing at optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntry {
    Credit(CreditEntry),
    Debit(DebitEntry),
}

impl LedgerEntry {
    /// Store-assigned entry id.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        match self {
            Self::Credit(e) => e.id,
            Self::Debit(e) => e.id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Credit(_) => EntryKind::Credit,
            Self::Debit(_) => EntryKind::Debit,
        }
    }

    #[must_use]
    pub const fn amount(&self) -> Amount {
        match self {
            Self::Credit(e) => e.amount,
            Self::Debit(e) => e.amount,
        }
    }

    #[must_use]
    pub const fn confirmed(&self) -> bool {
        match self {
            Self::Credit(e) => e.confirmed,
            Self::Debit(e) => e.confirmed,
        }
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Credit(e) => e.created_at,
            Self::Debit(e) => e.created_at,
        }
    }

    /// Receipt reference, present only for credits.
    #[must_use]
    pub const fn receipt(&self) -> Option<&ReceiptRef> {
        match self {
            Self::Credit(e) => Some(&e.receipt),
            Self::Debit(_) => None,
        }
    }

    /// Copy of this entry with `confirmed` set.
    #[must_use]
    pub fn into_confirmed(self) -> Self {
        match self {
            Self::Credit(e) => Self::Credit(CreditEntry {
                confirmed: true,
                ..e
            }),
            Self::Debit(e) => Self::Debit(DebitEntry {
                confirmed: true,
                ..e
            }),
        }
    }
}

/// An entry about to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewEntry {
    Credit {
        amount: Amount,
        receipt: ReceiptRef,
    },
    Debit {
        amount: Amount,
        payout: Option<PayoutTarget>,
    },
}

impl NewEntry {
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Credit { .. } => EntryKind::Credit,
            Self::Debit { .. } => EntryKind::Debit,
        }
    }

    #[must_use]
    pub const fn amount(&self) -> Amount {
        match self {
            Self::Credit { amount, .. } | Self::Debit { amount, .. } => *amount,
        }
    }

    /// Materialize the entry with its assigned id and creation time.
    ///
    /// New entries are always unconfirmed.
    #[must_use]
    pub fn into_entry(self, id: EntryId, created_at: DateTime<Utc>) -> LedgerEntry {
        match self {
            Self::Credit { amount, receipt } => LedgerEntry::Credit(CreditEntry {
                id,
                amount,
                confirmed: false,
                receipt,
                created_at,
            }),
            Self::Debit { amount, payout } => LedgerEntry::Debit(DebitEntry {
                id,
                amount,
                confirmed: false,
                payout,
                created_at,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BTC: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
    const ETH: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    #[test]
    fn test_receipt_requires_http_url() {
        assert!(ReceiptRef::parse("https://ucarecdn.com/abc/").is_ok());
        assert!(ReceiptRef::parse("ftp://files.example.com/r.png").is_err());
        assert!(ReceiptRef::parse("not a url").is_err());
        assert!(ReceiptRef::parse("").is_err());
    }

    #[test]
    fn test_payout_address_formats() {
        assert!(PayoutTarget::new(PayoutAsset::Bitcoin, BTC).is_ok());
        assert!(PayoutTarget::new(PayoutAsset::Ethereum, ETH).is_ok());
        assert!(PayoutTarget::new(PayoutAsset::Usdt, ETH).is_ok());

        assert_eq!(
            PayoutTarget::new(PayoutAsset::Bitcoin, ETH),
            Err(EntryError::InvalidAddress {
                asset: PayoutAsset::Bitcoin
            })
        );
        assert!(PayoutTarget::new(PayoutAsset::Ethereum, "0x123").is_err());
    }

    #[test]
    fn test_new_entry_is_unconfirmed() {
        let new = NewEntry::Credit {
            amount: "100".parse().unwrap(),
            receipt: ReceiptRef::parse("https://x/y.png").unwrap(),
        };
        let entry = new.into_entry(EntryId::new(1), Utc::now());
        assert_eq!(entry.kind(), EntryKind::Credit);
        assert!(!entry.confirmed());
        assert!(entry.into_confirmed().confirmed());
    }

    #[test]
    fn test_entry_serializes_with_kind_tag() {
        let entry = NewEntry::Debit {
            amount: "25".parse().unwrap(),
            payout: None,
        }
        .into_entry(EntryId::new(7), Utc::now());

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "debit");
        assert_eq!(json["id"], 7);
        assert_eq!(json["confirmed"], false);
        assert!(json.get("payout").is_none());
    }
}
