//! Monance CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! monance-cli migrate
//!
//! # Move a pending user to verified
//! monance-cli verification complete --identity user_2abc
//!
//! # Show a user's version and unconfirmed entries
//! monance-cli entry list --identity user_2abc --pending
//!
//! # Confirm a deposit or withdrawal
//! monance-cli entry confirm --identity user_2abc --entry 17 --version 4
//!
//! # Credit investment returns
//! monance-cli earnings credit --identity user_2abc --amount 125.50 --version 5
//!
//! # Manage deposit wallets
//! monance-cli wallet add --address <address> --network Bitcoin
//! monance-cli wallet list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "monance-cli")]
#[command(author, version, about = "Monance CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user verification
    Verification {
        #[command(subcommand)]
        action: VerificationAction,
    },
    /// Manage ledger entries
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },
    /// Credit investment returns
    Earnings {
        #[command(subcommand)]
        action: EarningsAction,
    },
    /// Manage deposit wallets
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(Subcommand)]
enum VerificationAction {
    /// Move a user from pending to verified
    Complete {
        /// Identity provider subject id
        #[arg(short, long)]
        identity: String,
    },
}

#[derive(Subcommand)]
enum EntryAction {
    /// Show a user's version, balances and entries
    List {
        /// Identity provider subject id
        #[arg(short, long)]
        identity: String,

        /// Only entries not yet confirmed
        #[arg(short, long)]
        pending: bool,
    },
    /// Confirm a pending entry and apply it to the balance
    Confirm {
        /// Identity provider subject id
        #[arg(short, long)]
        identity: String,

        /// Entry id
        #[arg(short, long)]
        entry: i64,

        /// User's current version
        #[arg(short, long)]
        version: i64,
    },
}

#[derive(Subcommand)]
enum EarningsAction {
    /// Add returns to a user's balance
    Credit {
        /// Identity provider subject id
        #[arg(short, long)]
        identity: String,

        /// Amount in dollars
        #[arg(short, long)]
        amount: Decimal,

        /// User's current version
        #[arg(short, long)]
        version: i64,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Add a deposit wallet
    Add {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Network label shown to users (e.g. `Bitcoin`)
        #[arg(short, long)]
        network: String,
    },
    /// List deposit wallets
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Verification { action } => match action {
            VerificationAction::Complete { identity } => {
                commands::ledger::complete_verification(&identity).await?;
            }
        },
        Commands::Entry { action } => match action {
            EntryAction::List { identity, pending } => {
                commands::ledger::list_entries(&identity, pending).await?;
            }
            EntryAction::Confirm {
                identity,
                entry,
                version,
            } => commands::ledger::confirm_entry(&identity, entry, version).await?,
        },
        Commands::Earnings { action } => match action {
            EarningsAction::Credit {
                identity,
                amount,
                version,
            } => commands::ledger::credit_earnings(&identity, amount, version).await?,
        },
        Commands::Wallet { action } => match action {
            WalletAction::Add { address, network } => {
                commands::wallet::add(&address, &network).await?;
            }
            WalletAction::List => commands::wallet::list().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_entry_confirm() {
        let cli = Cli::try_parse_from([
            "monance-cli",
            "entry",
            "confirm",
            "--identity",
            "user_2abc",
            "--entry",
            "17",
            "--version",
            "4",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Entry {
                action: EntryAction::Confirm {
                    entry: 17,
                    version: 4,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_parse_entry_list() {
        let cli = Cli::try_parse_from([
            "monance-cli",
            "entry",
            "list",
            "--identity",
            "user_2abc",
            "--pending",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Entry {
                action: EntryAction::List { pending: true, .. }
            }
        ));

        let cli = Cli::try_parse_from(["monance-cli", "entry", "list", "-i", "user_2abc"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Entry {
                action: EntryAction::List { pending: false, .. }
            }
        ));
    }

    #[test]
    fn test_parse_earnings_amount() {
        let cli = Cli::try_parse_from([
            "monance-cli",
            "earnings",
            "credit",
            "-i",
            "user_2abc",
            "-a",
            "125.50",
            "-v",
            "5",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Earnings {
            action: EarningsAction::Credit { amount, .. },
        } = cli.command
        else {
            panic!("expected earnings credit");
        };
        assert_eq!(amount, Decimal::new(12550, 2));
    }
}
