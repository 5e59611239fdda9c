//! Business logic and external collaborators.
//!
//! # Services
//!
//! - `ledger` - Balance, deposit and history rules; verification transitions
//! - `identity` - OpenID Connect client for the identity provider
//! - `upload` - Uploadcare client for receipts and ID documents

pub mod identity;
pub mod ledger;
pub mod upload;

pub use identity::{IdentityClient, IdentityError, ResolvedIdentity};
pub use ledger::{IdentityContext, LedgerError, LedgerService};
pub use upload::{UploadClient, UploadError};
