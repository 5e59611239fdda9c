//! Deposit wallets shown to users.

use serde::{Deserialize, Serialize};

use super::WalletId;

/// Errors for deposit wallet fields.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet address cannot be empty")]
    EmptyAddress,
    #[error("wallet network cannot be empty")]
    EmptyNetwork,
}

/// An address users send deposits to, labelled with its network
/// (e.g. `"BTC"`, `"ERC20"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositWallet {
    pub id: WalletId,
    pub address: String,
    pub network: String,
}

/// A wallet about to be registered; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWallet {
    address: String,
    network: String,
}

impl NewWallet {
    /// Validate a new wallet.
    ///
    /// # Errors
    ///
    /// Returns `WalletError` if either field is blank.
    pub fn new(address: &str, network: &str) -> Result<Self, WalletError> {
        let address = address.trim();
        let network = network.trim();
        if address.is_empty() {
            return Err(WalletError::EmptyAddress);
        }
        if network.is_empty() {
            return Err(WalletError::EmptyNetwork);
        }
        Ok(Self {
            address: address.to_owned(),
            network: network.to_owned(),
        })
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    #[must_use]
    pub fn into_wallet(self, id: WalletId) -> DepositWallet {
        DepositWallet {
            id,
            address: self.address,
            network: self.network,
        }
    }
}
