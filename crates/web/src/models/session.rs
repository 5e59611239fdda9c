//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use monance_core::IdentityId;

use crate::services::ledger::IdentityContext;

/// Session-stored identity of the signed-in human.
///
/// Written once by the OIDC callback; everything else about the user lives
/// in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentIdentity {
    /// Stable subject id from the identity provider.
    pub identity_id: IdentityId,
    /// Display name at sign-in time.
    pub display_name: String,
}

impl CurrentIdentity {
    /// The explicit context passed to every ledger operation.
    #[must_use]
    pub fn context(&self) -> IdentityContext {
        IdentityContext {
            identity_id: self.identity_id.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in identity.
    pub const CURRENT_IDENTITY: &str = "current_identity";

    /// Key for OIDC state (CSRF protection).
    pub const OIDC_STATE: &str = "oidc_state";

    /// Key for OIDC nonce (replay protection).
    pub const OIDC_NONCE: &str = "oidc_nonce";

    /// Key for the ID token, kept as a logout hint.
    pub const ID_TOKEN: &str = "id_token";
}
