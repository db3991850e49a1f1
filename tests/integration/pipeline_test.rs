//! Integration tests for the authorizing request pipeline behind the catalog client
use anyhow::Result;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;

use crate::test_harness::{TestEnvironment, ME_URL, REFRESH_URL};
use songswipe_lib::auth::TokenStore;
use songswipe_lib::Error;

/// Expired token: one refresh, one retry, new token cached and persisted
#[tokio::test]
async fn test_expired_token_is_refreshed_once() -> Result<()> {
    let env = TestEnvironment::signed_in();
    env.http.push_status(ME_URL, StatusCode::UNAUTHORIZED, "");
    env.http.push_status(ME_URL, StatusCode::OK, r#"{"id":"u1"}"#);
    env.refresh_grants("new");

    let session = env.start().await;
    let profile = session.catalog().current_user_profile().await?;

    assert_eq!(profile["id"], "u1");
    assert_eq!(session.tokens().access_token().as_deref(), Some("new"));
    assert_eq!(session.tokens().refresh_token().as_deref(), Some("r1"));
    assert_eq!(env.token_store.read().await?.access_token.as_deref(), Some("new"));

    let catalog_calls = env.requests_to(ME_URL);
    assert_eq!(catalog_calls.len(), 2);
    assert_eq!(catalog_calls[0].header("authorization"), Some("Bearer old"));
    assert_eq!(catalog_calls[1].header("authorization"), Some("Bearer new"));

    let refresh_calls = env.requests_to(REFRESH_URL);
    assert_eq!(refresh_calls.len(), 1);
    assert_eq!(refresh_calls[0].header("apikey"), Some("anon"));
    Ok(())
}

/// A second 401 after the retry surfaces as re-authentication required
#[tokio::test]
async fn test_persistent_401_requires_reauthentication() -> Result<()> {
    let env = TestEnvironment::signed_in();
    env.http.push_status(ME_URL, StatusCode::UNAUTHORIZED, "");
    env.refresh_grants("new");

    let session = env.start().await;
    let err = session.catalog().current_user_profile().await.unwrap_err();

    assert!(matches!(err, Error::Unauthorized { .. }));
    assert_eq!(env.requests_to(ME_URL).len(), 2);
    assert_eq!(env.requests_to(REFRESH_URL).len(), 1);
    Ok(())
}

/// Refresh rejected by the identity provider: retried once with the stale token
#[tokio::test]
async fn test_refresh_rejection_retries_with_stale_token() -> Result<()> {
    let env = TestEnvironment::signed_in();
    env.http.push_status(ME_URL, StatusCode::UNAUTHORIZED, "");
    env.http
        .push_status(REFRESH_URL, StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#);

    let session = env.start().await;
    let err = session.catalog().current_user_profile().await.unwrap_err();

    assert!(err.requires_reauthentication());
    let catalog_calls = env.requests_to(ME_URL);
    assert_eq!(catalog_calls.len(), 2);
    assert_eq!(catalog_calls[1].header("authorization"), Some("Bearer old"));
    assert_eq!(session.tokens().access_token().as_deref(), Some("old"));
    Ok(())
}

/// Identity provider unreachable: the transport error is swallowed by the pipeline
#[tokio::test]
async fn test_refresh_transport_error_is_swallowed() -> Result<()> {
    let env = TestEnvironment::signed_in();
    env.http.push_status(ME_URL, StatusCode::UNAUTHORIZED, "");
    env.http.push_status(ME_URL, StatusCode::OK, r#"{"id":"u1"}"#);
    env.http.push_failure(REFRESH_URL, "connection refused");

    let session = env.start().await;
    let profile = session.catalog().current_user_profile().await?;

    assert_eq!(profile["id"], "u1");
    assert_eq!(session.tokens().access_token().as_deref(), Some("old"));
    Ok(())
}

/// Without a cached token the request goes out unauthenticated and nothing is refreshed
#[tokio::test]
async fn test_no_token_sends_unauthenticated() -> Result<()> {
    let env = TestEnvironment::new();
    env.http.push_status(ME_URL, StatusCode::UNAUTHORIZED, "");

    let session = env.start().await;
    let err = session.catalog().current_user_profile().await.unwrap_err();

    assert!(err.requires_reauthentication());
    let catalog_calls = env.requests_to(ME_URL);
    assert_eq!(catalog_calls.len(), 1);
    assert_eq!(catalog_calls[0].header("authorization"), None);
    assert!(env.requests_to(REFRESH_URL).is_empty());
    Ok(())
}

/// Non-401 failures pass straight through
#[tokio::test]
async fn test_server_errors_are_not_retried() -> Result<()> {
    let env = TestEnvironment::signed_in();
    env.http
        .push_status(ME_URL, StatusCode::SERVICE_UNAVAILABLE, "try later");

    let session = env.start().await;
    let err = session.catalog().current_user_profile().await.unwrap_err();

    assert!(matches!(err, Error::ApiStatus { status: 503, .. }));
    assert_eq!(env.requests_to(ME_URL).len(), 1);
    assert!(env.requests_to(REFRESH_URL).is_empty());
    Ok(())
}

/// Concurrent callers racing an expired token all end up with the profile
#[tokio::test]
async fn test_concurrent_requests_all_succeed() -> Result<()> {
    let env = TestEnvironment::signed_in();
    env.http.push_status(ME_URL, StatusCode::UNAUTHORIZED, "");
    env.http.push_status(ME_URL, StatusCode::OK, r#"{"id":"u1"}"#);
    env.refresh_grants("new");

    let session = env.start().await;
    let catalog = session.catalog();
    let (a, b) = tokio::join!(catalog.current_user_profile(), catalog.current_user_profile());

    assert_eq!(a?["id"], "u1");
    assert_eq!(b?["id"], "u1");
    assert_eq!(session.tokens().access_token().as_deref(), Some("new"));
    Ok(())
}
