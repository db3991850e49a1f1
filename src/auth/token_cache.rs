use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::auth::storage::TokenStore;
use crate::auth::token::TokenPair;
use crate::error::{store_write_failed, Result};

/// Process-wide holder of the delegated token pair.
///
/// Two layers: a non-blocking in-memory snapshot for code paths that cannot
/// suspend (the request pipeline's hot path), written through to a durable
/// [`TokenStore`] by the async mutators. Constructed once by the composition
/// root and shared as `Arc<TokenCache>`.
///
/// Usage:
/// 1. [`initialize`](Self::initialize) with a store on startup
/// 2. [`hydrate`](Self::hydrate) before the first authorized request
/// 3. [`set_tokens`](Self::set_tokens) / [`clear`](Self::clear) on login, refresh, sign-out
/// 4. [`access_token`](Self::access_token) and friends for synchronous reads
pub struct TokenCache {
    /// Durable layer; `None` until initialized
    store: RwLock<Option<Arc<dyn TokenStore>>>,
    /// In-memory snapshot
    tokens: RwLock<TokenPair>,
    /// Change notifications for observers
    changes: watch::Sender<TokenPair>,
}

impl TokenCache {
    /// Create an empty, unbound cache
    pub fn new() -> Self {
        Self {
            store: RwLock::new(None),
            tokens: RwLock::new(TokenPair::empty()),
            changes: watch::Sender::new(TokenPair::empty()),
        }
    }

    /// Bind the cache to a durable store.
    ///
    /// Idempotent: rebinding only swaps the store reference and never
    /// touches the cached tokens.
    pub fn initialize(&self, store: Arc<dyn TokenStore>) {
        let mut guard = self.store.write();
        if guard.is_some() {
            debug!("Token cache already bound, rebinding store");
        }
        *guard = Some(store);
    }

    /// Whether a durable store has been bound
    pub fn is_initialized(&self) -> bool {
        self.store.read().is_some()
    }

    /// Load the durable tokens into memory.
    ///
    /// Returns `false` when no store is bound or the read failed; the cache
    /// keeps its previous contents in that case.
    pub async fn hydrate(&self) -> bool {
        let Some(store) = self.bound_store() else {
            warn!("Token cache hydrated before initialize, staying unauthenticated");
            return false;
        };

        match store.read().await {
            Ok(tokens) => {
                info!(
                    has_access = tokens.has_access_token(),
                    has_refresh = tokens.refresh_token.is_some(),
                    "Token cache hydrated from durable store"
                );
                self.replace(tokens);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to hydrate token cache");
                false
            }
        }
    }

    /// Replace both tokens.
    ///
    /// Memory is updated before the durable write is awaited, so synchronous
    /// readers see the new pair immediately. Without a bound store the pair
    /// lives in memory only.
    pub async fn set_tokens(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<()> {
        let tokens = TokenPair::new(access_token, refresh_token);
        self.replace(tokens.clone());

        let Some(store) = self.bound_store() else {
            warn!("Token store not bound, tokens only held in memory");
            return Ok(());
        };

        store.write(&tokens).await.map_err(|e| {
            error!(error = %e, "Failed to persist tokens");
            store_write_failed(e)
        })?;

        debug!(has_access = tokens.has_access_token(), "Tokens persisted");
        Ok(())
    }

    /// Current access token, `None` when absent
    pub fn access_token(&self) -> Option<String> {
        self.tokens.read().access_token.clone()
    }

    /// Current refresh token, `None` when absent
    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.read().refresh_token.clone()
    }

    /// Current access token, `None` when absent or empty
    pub fn usable_access_token(&self) -> Option<String> {
        self.tokens.read().usable_access_token().map(str::to_string)
    }

    /// True iff the in-memory access token is present and non-empty
    pub fn has_token(&self) -> bool {
        self.tokens.read().has_access_token()
    }

    /// Copy of the in-memory pair
    pub fn snapshot(&self) -> TokenPair {
        self.tokens.read().clone()
    }

    /// Wipe memory and the durable store (sign-out)
    pub async fn clear(&self) -> Result<()> {
        self.replace(TokenPair::empty());

        let Some(store) = self.bound_store() else {
            debug!("Token store not bound, cleared memory only");
            return Ok(());
        };

        store.clear().await.map_err(|e| {
            error!(error = %e, "Failed to clear durable tokens");
            store_write_failed(e)
        })?;

        info!("Token cache cleared");
        Ok(())
    }

    /// Observe every change of the in-memory pair
    pub fn subscribe(&self) -> watch::Receiver<TokenPair> {
        self.changes.subscribe()
    }

    fn bound_store(&self) -> Option<Arc<dyn TokenStore>> {
        self.store.read().clone()
    }

    fn replace(&self, tokens: TokenPair) {
        let mut guard = self.tokens.write();
        *guard = tokens.clone();
        // Notify under the lock so observers see writes in memory order
        self.changes.send_replace(tokens);
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens = self.tokens.read();
        f.debug_struct("TokenCache")
            .field("initialized", &self.is_initialized())
            .field("has_access", &tokens.has_access_token())
            .field("has_refresh", &tokens.refresh_token.is_some())
            .finish()
    }
}
