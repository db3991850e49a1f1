//! Integration tests for session startup, login, sign-out and preferences
use anyhow::Result;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;

use crate::test_harness::{TestEnvironment, LOGOUT_URL, ME_URL, REFRESH_URL};
use songswipe_lib::auth::{MemoryTokenStore, TokenStore};
use songswipe_lib::settings::ThemeMode;
use songswipe_lib::SessionStatus;

const CALLBACK: &str = "songswipe://login-callback#access_token=sa&refresh_token=sr\
    &provider_token=pa&provider_refresh_token=pr&expires_in=3600&token_type=bearer";

/// Startup hydrates the cache and restores the identity session
#[tokio::test]
async fn test_start_restores_persisted_state() -> Result<()> {
    let env = TestEnvironment::signed_in();
    let session = env.start().await;

    assert!(session.tokens().is_initialized());
    assert_eq!(
        session.status(),
        SessionStatus {
            has_catalog_token: true,
            has_refresh_token: true,
            has_identity_session: true,
        }
    );
    Ok(())
}

/// A fresh install starts unauthenticated without touching the network
#[tokio::test]
async fn test_start_with_empty_stores() -> Result<()> {
    let env = TestEnvironment::new();
    let session = env.start().await;

    assert!(!session.status().has_catalog_token);
    assert!(!session.status().has_identity_session);
    assert!(!session.ensure_delegated_token().await?);
    assert_eq!(env.http.request_count(), 0);
    Ok(())
}

/// Login callback feeds the catalog client end to end
#[tokio::test]
async fn test_login_then_fetch_profile() -> Result<()> {
    let env = TestEnvironment::new();
    env.http.push_status(ME_URL, StatusCode::OK, r#"{"id":"u1"}"#);

    let session = env.start().await;
    session.identity().handle_callback(CALLBACK).await?;

    assert_eq!(env.token_store.read().await?.access_token.as_deref(), Some("pa"));
    assert_eq!(env.session_store.read().await?.access_token.as_deref(), Some("sa"));

    let profile = session.catalog().current_user_profile().await?;
    assert_eq!(profile["id"], "u1");
    assert_eq!(env.requests_to(ME_URL)[0].header("authorization"), Some("Bearer pa"));
    Ok(())
}

/// An identity session without a cached catalog token mints one on demand
#[tokio::test]
async fn test_ensure_delegated_token_mints_from_session() -> Result<()> {
    let env = TestEnvironment::with_stores(
        MemoryTokenStore::new(),
        MemoryTokenStore::with_tokens(Some("sa"), Some("sr")),
    );
    env.refresh_grants("minted");

    let session = env.start().await;
    assert!(!session.tokens().has_token());
    assert!(session.ensure_delegated_token().await?);

    assert_eq!(session.tokens().access_token().as_deref(), Some("minted"));
    assert_eq!(env.requests_to(REFRESH_URL).len(), 1);

    // Already holding a token: no further refresh
    assert!(session.ensure_delegated_token().await?);
    assert_eq!(env.requests_to(REFRESH_URL).len(), 1);
    Ok(())
}

/// Sign-out wipes both durable layers even if the remote logout fails
#[tokio::test]
async fn test_sign_out_wipes_credentials() -> Result<()> {
    let env = TestEnvironment::signed_in();
    env.http.push_status(LOGOUT_URL, StatusCode::INTERNAL_SERVER_ERROR, "");

    let session = env.start().await;
    let mut changes = session.tokens().subscribe();
    session.sign_out().await?;

    assert!(env.token_store.read().await?.is_empty());
    assert!(env.session_store.read().await?.is_empty());
    assert_eq!(env.token_store.clear_count(), 1);
    assert!(!session.status().has_identity_session);

    changes.changed().await?;
    assert!(changes.borrow().is_empty());

    // A new session over the same stores stays signed out
    let restarted = env.start().await;
    assert!(!restarted.status().has_catalog_token);
    Ok(())
}

/// Theme preference survives a restart
#[tokio::test]
async fn test_theme_preference_persists() -> Result<()> {
    let env = TestEnvironment::new();

    let session = env.start().await;
    assert_eq!(session.settings().theme_mode().await?, ThemeMode::System);
    session.settings().set_theme_mode(ThemeMode::Light).await?;

    let restarted = env.start().await;
    assert_eq!(restarted.settings().theme_mode().await?, ThemeMode::Light);
    Ok(())
}
