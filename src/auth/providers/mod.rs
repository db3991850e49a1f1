use anyhow::Result;
use async_trait::async_trait;

pub mod identity;

pub use identity::{CallbackTokens, IdentityClient};

/// Collaborator able to mint a fresh delegated catalog token.
///
/// Implementations renew the identity-provider session and extract the
/// delegated token from it. `Ok(None)` means "could not refresh" for any
/// reason; an `Err` is treated exactly the same by the request pipeline.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Renew the session and return the new delegated access token
    async fn refresh_delegated_token(&self) -> Result<Option<String>>;
}
