//! Identity provider client
//!
//! The identity provider brokers the catalog OAuth login. Its session carries
//! the delegated catalog tokens (`provider_token`, `provider_refresh_token`)
//! which end up in the [`TokenCache`] used by the request pipeline.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::SessionRefresher;
use crate::adapters::http_client::HttpClient;
use crate::auth::storage::TokenStore;
use crate::auth::token::TokenPair;
use crate::auth::token_cache::TokenCache;
use crate::config::IdentityConfig;
use crate::error::{config_invalid, store_read_failed, store_write_failed, Error, Result};

/// Tokens handed back by the identity provider, either on the login
/// callback or from a session refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackTokens {
    /// Identity session access token
    pub access_token: String,
    /// Identity session refresh token
    pub refresh_token: String,
    /// Delegated catalog access token
    #[serde(default)]
    pub provider_token: Option<String>,
    /// Delegated catalog refresh token
    #[serde(default)]
    pub provider_refresh_token: Option<String>,
    /// Identity session lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl CallbackTokens {
    /// Parse the deep link the provider redirected to.
    ///
    /// Parameters are read from the query and the fragment; the fragment
    /// wins when both carry the same key.
    pub fn parse(callback_url: &str) -> Result<Self> {
        let url = Url::parse(callback_url).map_err(|e| Error::CallbackInvalid {
            reason: format!("not a URL: {}", e),
        })?;

        let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        if let Some(fragment) = url.fragment() {
            params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
        }

        if let Some(error) = params.get("error") {
            let description = params
                .get("error_description")
                .cloned()
                .unwrap_or_else(|| error.clone());
            return Err(Error::CallbackInvalid {
                reason: description,
            });
        }

        let mut take = |key: &str| params.remove(key).filter(|v| !v.is_empty());
        let access_token = take("access_token").ok_or_else(|| Error::CallbackInvalid {
            reason: "missing access_token".to_string(),
        })?;
        let refresh_token = take("refresh_token").ok_or_else(|| Error::CallbackInvalid {
            reason: "missing refresh_token".to_string(),
        })?;

        Ok(Self {
            access_token,
            refresh_token,
            provider_token: take("provider_token"),
            provider_refresh_token: take("provider_refresh_token"),
            expires_in: take("expires_in").and_then(|v| v.parse().ok()),
            token_type: take("token_type"),
        })
    }

    /// Delegated catalog token, `None` when absent or empty
    pub fn delegated_token(&self) -> Option<String> {
        self.provider_token.clone().filter(|t| !t.is_empty())
    }

    fn session_pair(&self) -> TokenPair {
        TokenPair::new(
            Some(self.access_token.clone()),
            Some(self.refresh_token.clone()),
        )
    }
}

/// Client for the identity provider's auth endpoints
pub struct IdentityClient {
    http: Arc<dyn HttpClient>,
    config: IdentityConfig,
    tokens: Arc<TokenCache>,
    /// Current identity session (access + refresh token)
    session: RwLock<Option<TokenPair>>,
    /// Durable copy of the identity session
    session_store: Option<Arc<dyn TokenStore>>,
}

impl IdentityClient {
    /// Create a client without a durable session
    pub fn new(http: Arc<dyn HttpClient>, config: IdentityConfig, tokens: Arc<TokenCache>) -> Self {
        Self {
            http,
            config,
            tokens,
            session: RwLock::new(None),
            session_store: None,
        }
    }

    /// Persist the identity session through `store`
    pub fn with_session_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Load a previously persisted identity session.
    ///
    /// Returns whether a session was found.
    pub async fn restore_session(&self) -> Result<bool> {
        let Some(store) = &self.session_store else {
            return Ok(false);
        };

        let stored = store.read().await.map_err(store_read_failed)?;
        if !stored.has_access_token() {
            debug!("No persisted identity session");
            return Ok(false);
        }

        *self.session.write() = Some(stored);
        info!("Identity session restored");
        Ok(true)
    }

    /// Whether an identity session is currently held
    pub fn has_active_session(&self) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(TokenPair::has_access_token)
    }

    /// URL that starts the catalog OAuth login in a browser
    pub fn authorize_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.endpoint("authorize"))
            .map_err(|e| config_invalid("identity.base_url", e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", &self.config.provider)
            .append_pair("redirect_to", &self.config.redirect_url)
            .append_pair("scopes", &self.config.scopes.join(" "));
        Ok(url.into())
    }

    /// Complete a login from the provider's redirect.
    ///
    /// Stores the identity session and hands the delegated tokens to the
    /// token cache.
    #[instrument(skip_all)]
    pub async fn handle_callback(&self, callback_url: &str) -> Result<CallbackTokens> {
        let tokens = CallbackTokens::parse(callback_url)?;
        self.store_session(&tokens).await?;

        match tokens.delegated_token() {
            Some(provider_token) => {
                self.tokens
                    .set_tokens(Some(provider_token), tokens.provider_refresh_token.clone())
                    .await?;
                info!("Login completed with delegated catalog token");
            }
            None => warn!("Login callback carried no delegated catalog token"),
        }

        Ok(tokens)
    }

    /// Renew the identity session with its refresh token
    #[instrument(skip_all)]
    pub async fn refresh_session(&self) -> Result<CallbackTokens> {
        let refresh_token = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or_else(|| Error::RefreshFailed {
                reason: "no identity session".to_string(),
            })?;

        let url = format!("{}?grant_type=refresh_token", self.endpoint("token"));
        let body = json!({ "refresh_token": refresh_token }).to_string();
        let response = self
            .http
            .post(&url, Some(self.headers(None)), Some(body))
            .await
            .map_err(|e| Error::Http {
                url: url.clone(),
                reason: format!("{:#}", e),
            })?;

        if !response.is_success() {
            warn!(status = %response.status, "Identity provider refused session refresh");
            return Err(Error::RefreshFailed {
                reason: format!("HTTP {}", response.status.as_u16()),
            });
        }

        let tokens: CallbackTokens = response.json().map_err(|e| Error::RefreshFailed {
            reason: format!("unreadable session: {}", e),
        })?;
        self.store_session(&tokens).await?;

        debug!(
            has_provider_token = tokens.provider_token.is_some(),
            "Identity session refreshed"
        );
        Ok(tokens)
    }

    /// End the identity session and wipe every local credential.
    ///
    /// The remote logout is best effort; local state is always cleared.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<()> {
        let access_token = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.access_token.clone());

        if let Some(access_token) = access_token {
            let url = self.endpoint("logout");
            match self
                .http
                .post(&url, Some(self.headers(Some(&access_token))), None)
                .await
            {
                Ok(response) if response.is_success() => debug!("Identity session revoked"),
                Ok(response) => warn!(status = %response.status, "Remote logout refused"),
                Err(e) => warn!(error = %e, "Remote logout failed"),
            }
        }

        *self.session.write() = None;
        if let Some(store) = &self.session_store {
            store.clear().await.map_err(store_write_failed)?;
        }
        self.tokens.clear().await?;

        info!("Signed out");
        Ok(())
    }

    async fn store_session(&self, tokens: &CallbackTokens) -> Result<()> {
        let pair = tokens.session_pair();
        *self.session.write() = Some(pair.clone());

        if let Some(store) = &self.session_store {
            store.write(&pair).await.map_err(|e| {
                error!(error = %e, "Failed to persist identity session");
                store_write_failed(e)
            })?;
        }
        Ok(())
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    fn headers(&self, bearer: Option<&str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("apikey".to_string(), self.config.anon_key.clone());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(token) = bearer {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }
}

#[async_trait]
impl SessionRefresher for IdentityClient {
    async fn refresh_delegated_token(&self) -> anyhow::Result<Option<String>> {
        match self.refresh_session().await {
            Ok(tokens) => {
                let delegated = tokens.delegated_token();
                if let (Some(token), Some(refresh)) =
                    (&delegated, tokens.provider_refresh_token.clone())
                {
                    // Memory already holds the new pair even when the durable write fails
                    if let Err(e) = self
                        .tokens
                        .set_tokens(Some(token.clone()), Some(refresh))
                        .await
                    {
                        warn!(error = %e, "Refreshed catalog tokens not persisted, continuing with memory copy");
                    }
                }
                Ok(delegated)
            }
            Err(Error::RefreshFailed { reason }) => {
                warn!(%reason, "Delegated token refresh unavailable");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.config.base_url)
            .field("provider", &self.config.provider)
            .field("has_session", &self.has_active_session())
            .finish()
    }
}
