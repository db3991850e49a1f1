//! Catalog API client
//!
//! Thin typed-path wrapper over the catalog's REST endpoints. Responses are
//! returned as raw JSON; authorization and 401 recovery happen in the
//! [`HttpClient`] it is built on (normally an
//! [`AuthorizingClient`](super::AuthorizingClient)).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::adapters::http_client::HttpClient;
use crate::error::{config_invalid, Error, Result};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 50;

/// Pagination window for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// Create a page; the limit is clamped to what the catalog accepts
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Client for the music catalog API
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Arc<dyn HttpClient>,
    base_url: Url,
}

impl CatalogClient {
    /// Create a client resolving every path against `base_url`
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| config_invalid("catalog.base_url", e.to_string()))?;
        // Relative joins drop the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    /// The signed-in user's profile
    pub async fn current_user_profile(&self) -> Result<Value> {
        self.get("v1/me", &[]).await
    }

    /// A single playlist, optionally narrowed by market and field filter
    pub async fn playlist(
        &self,
        playlist_id: &str,
        market: Option<&str>,
        fields: Option<&str>,
    ) -> Result<Value> {
        let path = format!("v1/playlists/{}", playlist_id);
        self.get(&path, &[("market", market), ("fields", fields)])
            .await
    }

    /// Browse categories
    pub async fn categories(&self, locale: Option<&str>, page: Page) -> Result<Value> {
        let (limit, offset) = (page.limit.to_string(), page.offset.to_string());
        self.get(
            "v1/browse/categories",
            &[
                ("locale", locale),
                ("limit", Some(limit.as_str())),
                ("offset", Some(offset.as_str())),
            ],
        )
        .await
    }

    /// A single browse category
    pub async fn category(&self, category_id: &str, locale: Option<&str>) -> Result<Value> {
        let path = format!("v1/browse/categories/{}", category_id);
        self.get(&path, &[("locale", locale)]).await
    }

    /// Playlists tagged with a browse category
    pub async fn category_playlists(&self, category_id: &str, page: Page) -> Result<Value> {
        let path = format!("v1/browse/categories/{}/playlists", category_id);
        let (limit, offset) = (page.limit.to_string(), page.offset.to_string());
        self.get(
            &path,
            &[("limit", Some(limit.as_str())), ("offset", Some(offset.as_str()))],
        )
        .await
    }

    /// Editorially featured playlists
    pub async fn featured_playlists(&self, locale: Option<&str>, page: Page) -> Result<Value> {
        let (limit, offset) = (page.limit.to_string(), page.offset.to_string());
        self.get(
            "v1/browse/featured-playlists",
            &[
                ("locale", locale),
                ("limit", Some(limit.as_str())),
                ("offset", Some(offset.as_str())),
            ],
        )
        .await
    }

    fn url_for(&self, path: &str, query: &[(&str, Option<&str>)]) -> Result<Url> {
        let mut url = self.base_url.join(path).map_err(|e| Error::Http {
            url: path.to_string(),
            reason: e.to_string(),
        })?;
        let present: Vec<_> = query
            .iter()
            .filter_map(|(key, value)| value.map(|v| (*key, v)))
            .collect();
        if !present.is_empty() {
            url.query_pairs_mut().extend_pairs(present);
        }
        Ok(url)
    }

    #[instrument(skip(self, query))]
    async fn get(&self, path: &str, query: &[(&str, Option<&str>)]) -> Result<Value> {
        let url = self.url_for(path, query)?;
        let response = self
            .http
            .get(url.as_str(), None)
            .await
            .map_err(|e| Error::Http {
                url: url.to_string(),
                reason: format!("{:#}", e),
            })?;

        if response.is_unauthorized() {
            warn!(path, "Catalog still rejects the delegated token");
            return Err(Error::Unauthorized {
                path: path.to_string(),
            });
        }
        if !response.is_success() {
            warn!(path, status = response.status.as_u16(), "Catalog request failed");
            return Err(Error::ApiStatus {
                path: path.to_string(),
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        debug!(path, status = response.status.as_u16(), "Catalog request succeeded");
        serde_json::from_str(&response.body).map_err(|e| Error::ResponseInvalid {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}
