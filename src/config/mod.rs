use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{config_invalid, Result};

// Default configuration values
const DEFAULT_CATALOG_URL: &str = "https://api.spotify.com/";
const DEFAULT_IDENTITY_URL: &str = "http://localhost:54321";
const DEFAULT_REDIRECT_URL: &str = "songswipe://login-callback";
const DEFAULT_PROVIDER: &str = "spotify";
const DEFAULT_SCOPES: &[&str] = &[
    "user-read-email",
    "user-read-private",
    "playlist-read-private",
];
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_DATA_DIR: &str = ".songswipe";
const DEFAULT_CONFIG_FILE: &str = "songswipe.json";

/// Main configuration struct for SongSwipe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog API settings
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Identity provider settings
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Local persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Catalog API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL every catalog path is resolved against
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Identity provider (OAuth broker) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity provider base URL
    #[serde(default = "default_identity_url")]
    pub base_url: String,
    /// Public API key sent as the `apikey` header
    #[serde(default = "default_anon_key")]
    pub anon_key: String,
    /// Deep link the provider redirects back to after login
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    /// OAuth provider name
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Catalog scopes requested at login
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

/// Paths of the files the client persists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Delegated catalog token pair
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    /// Identity provider session
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
    /// User preferences
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

// Default functions
fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|val| !val.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn data_dir() -> PathBuf {
    PathBuf::from(env_or("SONGSWIPE_DATA_DIR", DEFAULT_DATA_DIR))
}

fn default_catalog_url() -> String {
    env_or("SONGSWIPE_CATALOG_URL", DEFAULT_CATALOG_URL)
}

fn default_connect_timeout() -> u64 {
    std::env::var("SONGSWIPE_CONNECT_TIMEOUT")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
}

fn default_request_timeout() -> u64 {
    std::env::var("SONGSWIPE_REQUEST_TIMEOUT")
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
}

fn default_identity_url() -> String {
    env_or("SONGSWIPE_IDENTITY_URL", DEFAULT_IDENTITY_URL)
}

fn default_anon_key() -> String {
    env_or("SONGSWIPE_IDENTITY_ANON_KEY", "")
}

fn default_redirect_url() -> String {
    env_or("SONGSWIPE_REDIRECT_URL", DEFAULT_REDIRECT_URL)
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_token_path() -> PathBuf {
    std::env::var("SONGSWIPE_TOKEN_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("catalog_tokens.json"))
}

fn default_session_path() -> PathBuf {
    std::env::var("SONGSWIPE_SESSION_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("identity_session.json"))
}

fn default_settings_path() -> PathBuf {
    std::env::var("SONGSWIPE_SETTINGS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("settings.json"))
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_url(),
            anon_key: default_anon_key(),
            redirect_url: default_redirect_url(),
            provider: default_provider(),
            scopes: default_scopes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            session_path: default_session_path(),
            settings_path: default_settings_path(),
        }
    }
}

impl Config {
    /// Reject configurations the client cannot run with
    pub fn validate(&self) -> Result<()> {
        validate_url("catalog.base_url", &self.catalog.base_url)?;
        validate_url("identity.base_url", &self.identity.base_url)?;
        if self.catalog.request_timeout_seconds == 0 {
            return Err(config_invalid("catalog.request_timeout_seconds", "must be positive"));
        }
        if self.identity.provider.is_empty() {
            return Err(config_invalid("identity.provider", "must not be empty"));
        }
        Ok(())
    }
}

fn validate_url(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(config_invalid(key, "must not be empty"));
    }
    let parsed = url::Url::parse(value).map_err(|e| config_invalid(key, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(config_invalid(key, format!("unsupported scheme '{}'", parsed.scheme())));
    }
    Ok(())
}

/// Manages configuration for the application
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load the configuration at `path` (or the resolved default path),
    /// writing a default file when none exists
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => get_config_path(),
        };
        let config = load_or_create_config(&config_path).await?;
        config.validate()?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a clone of the current configuration
    pub async fn get_config(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Where the configuration lives on disk
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Validate, replace and persist the configuration
    pub async fn update_config(&self, new_config: Config) -> Result<()> {
        new_config.validate()?;
        *self.config.write().await = new_config.clone();
        save_config(&self.config_path, &new_config).await
    }
}

/// Get the path to the configuration file
fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SONGSWIPE_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Load configuration from file or create default
async fn load_or_create_config(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await? {
        let default_config = Config::default();
        save_config(path, &default_config).await?;
        info!("Created default configuration at {}", path.display());
        return Ok(default_config);
    }

    let config_str = fs::read_to_string(path).await?;
    let config: Config = serde_json::from_str(&config_str)?;
    debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

/// Save configuration to file
async fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(path, config_str).await?;
    debug!("Saved configuration to {}", path.display());

    Ok(())
}
