//! Deposit wallet management.
//!
//! # Usage
//!
//! ```bash
//! monance-cli wallet add --address bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh --network Bitcoin
//! monance-cli wallet list
//! ```

use monance_core::NewWallet;
use monance_web::db::WalletRepository;

use super::{CliError, connect};

/// Add a deposit wallet shown to users.
///
/// # Errors
///
/// Returns `CliError::Invalid` for a blank address or network, or a
/// repository conflict if the address is already listed.
pub async fn add(address: &str, network: &str) -> Result<(), CliError> {
    let wallet = NewWallet::new(address, network).map_err(|e| CliError::Invalid(e.to_string()))?;
    let pool = connect().await?;

    let wallet = WalletRepository::new(&pool).add(&wallet).await?;
    tracing::info!(
        id = %wallet.id,
        address = %wallet.address,
        network = %wallet.network,
        "Deposit wallet added"
    );
    Ok(())
}

/// List deposit wallets.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CliError> {
    let pool = connect().await?;
    let wallets = WalletRepository::new(&pool).list().await?;

    if wallets.is_empty() {
        tracing::info!("No deposit wallets");
    }
    for wallet in wallets {
        tracing::info!(id = %wallet.id, network = %wallet.network, "{}", wallet.address);
    }
    Ok(())
}
