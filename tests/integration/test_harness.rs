//! Integration test harness for SongSwipe
//! Provides a fully wired session over in-memory stores and a mock transport

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;
use tempfile::TempDir;

use songswipe_lib::adapters::MockHttpClient;
use songswipe_lib::auth::MemoryTokenStore;
use songswipe_lib::config::Config;
use songswipe_lib::Session;

pub const CATALOG: &str = "https://catalog.test/";
pub const IDENTITY: &str = "https://identity.test";
pub const ME_URL: &str = "https://catalog.test/v1/me";
pub const REFRESH_URL: &str = "https://identity.test/auth/v1/token?grant_type=refresh_token";
pub const LOGOUT_URL: &str = "https://identity.test/auth/v1/logout";

/// Test environment for integration tests
pub struct TestEnvironment {
    /// Scripted transport shared by the catalog and identity clients
    pub http: MockHttpClient,
    /// Durable catalog token layer
    pub token_store: Arc<MemoryTokenStore>,
    /// Durable identity session
    pub session_store: Arc<MemoryTokenStore>,
    pub config: Config,
    _dir: TempDir,
}

impl TestEnvironment {
    /// Empty stores, no session
    pub fn new() -> Self {
        Self::with_stores(MemoryTokenStore::new(), MemoryTokenStore::new())
    }

    /// Catalog tokens `{old, r1}` and an identity session `{sa, sr}`
    pub fn signed_in() -> Self {
        Self::with_stores(
            MemoryTokenStore::with_tokens(Some("old"), Some("r1")),
            MemoryTokenStore::with_tokens(Some("sa"), Some("sr")),
        )
    }

    pub fn with_stores(token_store: MemoryTokenStore, session_store: MemoryTokenStore) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let mut config = Config::default();
        config.catalog.base_url = CATALOG.to_string();
        config.identity.base_url = IDENTITY.to_string();
        config.identity.anon_key = "anon".to_string();
        config.storage.settings_path = dir.path().join("settings.json");

        Self {
            http: MockHttpClient::new(),
            token_store: Arc::new(token_store),
            session_store: Arc::new(session_store),
            config,
            _dir: dir,
        }
    }

    /// Start a session over this environment's collaborators
    pub async fn start(&self) -> Session {
        Session::start_with(
            self.config.clone(),
            Arc::new(self.http.clone()),
            self.token_store.clone(),
            self.session_store.clone(),
        )
        .await
        .expect("session should start")
    }

    /// Script the identity provider to hand out `provider_token`
    pub fn refresh_grants(&self, provider_token: &str) {
        self.http
            .push_json(
                REFRESH_URL,
                StatusCode::OK,
                &json!({
                    "access_token": "sa2",
                    "refresh_token": "sr2",
                    "provider_token": provider_token,
                    "expires_in": 3600,
                    "token_type": "bearer"
                }),
            )
            .expect("serializable");
    }

    /// Requests made to `url`, in order
    pub fn requests_to(&self, url: &str) -> Vec<songswipe_lib::adapters::RecordedRequest> {
        self.http
            .requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
