//! Authorizing request pipeline
//!
//! Decorates any [`HttpClient`] so that catalog requests carry the current
//! delegated token and recover from expiry with exactly one refresh and one
//! retry. Callers only ever see HTTP outcomes; refresh failures are folded
//! into the response they would have received anyway.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::adapters::http_client::{HttpClient, SimpleHttpResponse};
use crate::auth::providers::SessionRefresher;
use crate::auth::token_cache::TokenCache;

const AUTHORIZATION: &str = "Authorization";

/// [`HttpClient`] decorator that attaches `Authorization: Bearer <token>`
/// and retries once after a successful refresh on 401.
pub struct AuthorizingClient {
    inner: Arc<dyn HttpClient>,
    tokens: Arc<TokenCache>,
    refresher: Option<Arc<dyn SessionRefresher>>,
}

impl AuthorizingClient {
    /// Create a pipeline without a refresh collaborator; 401s pass through
    pub fn new(inner: Arc<dyn HttpClient>, tokens: Arc<TokenCache>) -> Self {
        Self {
            inner,
            tokens,
            refresher: None,
        }
    }

    /// Attach the collaborator asked for a fresh token on 401
    pub fn with_refresher(mut self, refresher: Arc<dyn SessionRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Whether 401 responses can be recovered from
    pub fn can_refresh(&self) -> bool {
        self.refresher.is_some()
    }

    /// Ask the collaborator for a new token; every failure becomes `None`
    async fn refresh(&self, refresher: &dyn SessionRefresher) -> Option<String> {
        match refresher.refresh_delegated_token().await {
            Ok(Some(token)) if !token.is_empty() => Some(token),
            Ok(_) => {
                debug!("Refresh collaborator returned no token");
                None
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                None
            }
        }
    }
}

/// Copy of `headers` with any existing authorization header replaced
fn with_bearer(headers: Option<&HashMap<String, String>>, token: &str) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = headers
        .map(|h| {
            h.iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case(AUTHORIZATION))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();
    headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
    headers
}

#[async_trait]
impl HttpClient for AuthorizingClient {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: Option<HashMap<String, String>>,
        body: Option<String>,
    ) -> Result<SimpleHttpResponse> {
        let Some(token) = self.tokens.usable_access_token() else {
            warn!(url = %url, "No delegated token available, sending request unauthenticated");
            return self.inner.request(method, url, headers, body).await;
        };

        debug!(url = %url, "Adding bearer token to request");
        let authorized = with_bearer(headers.as_ref(), &token);
        let response = self
            .inner
            .request(method, url, Some(authorized.clone()), body.clone())
            .await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        let Some(refresher) = &self.refresher else {
            debug!(url = %url, "Got 401 and no refresher configured, returning it");
            return Ok(response);
        };

        warn!(url = %url, status = 401, "Got 401, attempting token refresh");
        drop(response);

        match self.refresh(refresher.as_ref()).await {
            Some(fresh) => {
                // Keep whatever refresh token the collaborator may have stored
                let refresh_token = self.tokens.refresh_token();
                if let Err(e) = self.tokens.set_tokens(Some(fresh.clone()), refresh_token).await {
                    warn!(error = %e, "Refreshed token not persisted, continuing with memory copy");
                }

                debug!(url = %url, "Token refreshed, retrying request");
                self.inner
                    .request(method, url, Some(with_bearer(headers.as_ref(), &fresh)), body)
                    .await
            }
            None => {
                warn!(url = %url, "Could not refresh token, user may need to re-authenticate");
                self.inner.request(method, url, Some(authorized), body).await
            }
        }
    }
}

impl fmt::Debug for AuthorizingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizingClient")
            .field("inner", &self.inner)
            .field("tokens", &self.tokens)
            .field("can_refresh", &self.can_refresh())
            .finish()
    }
}
