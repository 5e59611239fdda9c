//! Monance Core - Shared ledger types library.
//!
//! This crate provides the types used across all Monance components:
//! - `web` - JSON API server (ledger service, identity and upload adapters)
//! - `cli` - Command-line tools for migrations and operator actions
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Identity ids, amounts, ledger entries, users and statuses
//! - [`catalog`] - Investment plans, badges and referral levels

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use types::*;
