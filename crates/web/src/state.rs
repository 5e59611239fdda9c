//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::MonanceConfig;
use crate::db::{PgUserStore, UserStore};
use crate::services::{IdentityClient, LedgerService, UploadClient};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Generic over the store so the router can run
/// against [`crate::db::MemoryUserStore`] in tests.
pub struct AppState<S = PgUserStore> {
    inner: Arc<AppStateInner<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S> {
    config: MonanceConfig,
    ledger: LedgerService<S>,
    identity: IdentityClient,
    uploads: UploadClient,
}

impl<S: UserStore> AppState<S> {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: MonanceConfig, store: S) -> Self {
        let identity = IdentityClient::new(&config.identity);
        let uploads = UploadClient::new(&config.upload);

        Self {
            inner: Arc::new(AppStateInner {
                ledger: LedgerService::new(store),
                identity,
                uploads,
                config,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &MonanceConfig {
        &self.inner.config
    }

    /// Get a reference to the ledger service.
    #[must_use]
    pub fn ledger(&self) -> &LedgerService<S> {
        &self.inner.ledger
    }

    /// Get a reference to the store behind the ledger.
    #[must_use]
    pub fn store(&self) -> &S {
        self.inner.ledger.store()
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get a reference to the upload client.
    #[must_use]
    pub fn uploads(&self) -> &UploadClient {
        &self.inner.uploads
    }
}
