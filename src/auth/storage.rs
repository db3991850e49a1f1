use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::token::TokenPair;
use crate::error::Error;

/// Durable key-value storage for the delegated token pair.
///
/// Survives process restarts. Implementations own their locking and
/// transaction discipline; the token cache treats them as opaque.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read both tokens; absent keys come back as `None`
    async fn read(&self) -> Result<TokenPair>;

    /// Replace both tokens; a `None` field removes that key
    async fn write(&self, tokens: &TokenPair) -> Result<()>;

    /// Remove both tokens
    async fn clear(&self) -> Result<()>;
}

/// Token store backed by a single JSON document on disk
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    /// Serializes writers so a rename never races another temp file
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Create a store at the given path; nothing is touched until first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the token document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tokens.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn read(&self) -> Result<TokenPair> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file found");
                return Ok(TokenPair::empty());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        let tokens: TokenPair = serde_json::from_str(&contents).map_err(|e| Error::StoreCorrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(
            path = %self.path.display(),
            has_access = tokens.access_token.is_some(),
            has_refresh = tokens.refresh_token.is_some(),
            "Tokens read from disk"
        );
        Ok(tokens)
    }

    async fn write(&self, tokens: &TokenPair) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(tokens)?;
        let temp = self.temp_path();
        fs::write(&temp, json)
            .await
            .with_context(|| format!("Failed to write {}", temp.display()))?;

        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e).with_context(|| format!("Failed to replace {}", self.path.display()));
        }

        debug!(path = %self.path.display(), "Tokens written to disk");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Token file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file to remove");
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove token file");
                Err(anyhow!(e))
            }
        }
    }
}

/// In-process token store, used for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<TokenPair>,
    writes: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds the given tokens
    pub fn with_tokens(access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
        Self {
            tokens: Mutex::new(TokenPair::new(
                access_token.map(str::to_string),
                refresh_token.map(str::to_string),
            )),
            ..Self::default()
        }
    }

    /// Number of completed writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of completed clears
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn read(&self) -> Result<TokenPair> {
        Ok(self.tokens.lock().await.clone())
    }

    async fn write(&self, tokens: &TokenPair) -> Result<()> {
        *self.tokens.lock().await = tokens.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.tokens.lock().await = TokenPair::empty();
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
