pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod swipe;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::{AuthorizingClient, CatalogClient, HttpClient, ReqwestHttpClient};
use crate::auth::{FileTokenStore, IdentityClient, SessionRefresher, TokenCache, TokenStore};
use crate::config::Config;
use crate::settings::SettingsStore;

// Re-export core components
pub use crate::adapters::catalog::Page;
pub use crate::error::{Error, ErrorCategory, ErrorCode, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Summary of what the client currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub has_catalog_token: bool,
    pub has_refresh_token: bool,
    pub has_identity_session: bool,
}

/// Composition root: owns the single token cache and everything wired to it.
///
/// Only obtainable through [`Session::start`] or [`Session::start_with`], so
/// the cache is always bound and hydrated before the catalog is reachable.
#[derive(Debug)]
pub struct Session {
    config: Config,
    tokens: Arc<TokenCache>,
    identity: Arc<IdentityClient>,
    catalog: CatalogClient,
    settings: SettingsStore,
}

impl Session {
    /// Build the production stack (reqwest transport, file stores) and start it
    pub async fn start(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestHttpClient::with_timeouts(
            Duration::from_secs(config.catalog.connect_timeout_seconds),
            Duration::from_secs(config.catalog.request_timeout_seconds),
        )
        .map_err(|e| Error::Http {
            url: config.catalog.base_url.clone(),
            reason: format!("{:#}", e),
        })?;
        let token_store = Arc::new(FileTokenStore::new(&config.storage.token_path));
        let session_store = Arc::new(FileTokenStore::new(&config.storage.session_path));

        Self::start_with(config, Arc::new(transport), token_store, session_store).await
    }

    /// Start over explicit collaborators
    pub async fn start_with(
        config: Config,
        transport: Arc<dyn HttpClient>,
        token_store: Arc<dyn TokenStore>,
        session_store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let tokens = Arc::new(TokenCache::new());
        tokens.initialize(token_store);
        if !tokens.hydrate().await {
            warn!("Starting without persisted catalog tokens");
        }

        let identity = Arc::new(
            IdentityClient::new(transport.clone(), config.identity.clone(), tokens.clone())
                .with_session_store(session_store),
        );
        if let Err(e) = identity.restore_session().await {
            warn!(error = %e, "Could not restore identity session");
        }

        let pipeline = AuthorizingClient::new(transport, tokens.clone())
            .with_refresher(identity.clone() as Arc<dyn SessionRefresher>);
        let catalog = CatalogClient::new(Arc::new(pipeline), &config.catalog.base_url)?;
        let settings = SettingsStore::new(&config.storage.settings_path);

        info!(
            has_catalog_token = tokens.has_token(),
            has_identity_session = identity.has_active_session(),
            "Session started"
        );

        Ok(Self {
            config,
            tokens,
            identity,
            catalog,
            settings,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    pub fn identity(&self) -> &Arc<IdentityClient> {
        &self.identity
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn status(&self) -> SessionStatus {
        let tokens = self.tokens.snapshot();
        SessionStatus {
            has_catalog_token: tokens.has_access_token(),
            has_refresh_token: tokens.refresh_token.is_some(),
            has_identity_session: self.identity.has_active_session(),
        }
    }

    /// Make sure a delegated token is cached, minting one from the identity
    /// session when the cache is empty. Returns whether a token is held.
    pub async fn ensure_delegated_token(&self) -> Result<bool> {
        if self.tokens.has_token() {
            return Ok(true);
        }
        if !self.identity.has_active_session() {
            return Ok(false);
        }

        let fresh = self
            .identity
            .refresh_delegated_token()
            .await
            .map_err(|e| Error::RefreshFailed {
                reason: format!("{:#}", e),
            })?;
        match fresh {
            Some(token) => {
                let refresh_token = self.tokens.refresh_token();
                self.tokens.set_tokens(Some(token), refresh_token).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// End the session and wipe every local credential
    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await
    }
}
