//! End-to-end tests over real HTTP (reqwest against a local mockito server)
//! with file-backed stores
use anyhow::Result;
use mockito::Matcher;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use songswipe_lib::auth::{FileTokenStore, TokenPair, TokenStore};
use songswipe_lib::config::Config;
use songswipe_lib::{Page, Session};

fn config_for(server_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.catalog.base_url = server_url.to_string();
    config.catalog.connect_timeout_seconds = 5;
    config.catalog.request_timeout_seconds = 5;
    config.identity.base_url = server_url.to_string();
    config.identity.anon_key = "anon".to_string();
    config.storage.token_path = dir.path().join("catalog_tokens.json");
    config.storage.session_path = dir.path().join("identity_session.json");
    config.storage.settings_path = dir.path().join("settings.json");
    config
}

async fn seed(path: std::path::PathBuf, access: &str, refresh: &str) -> Result<()> {
    FileTokenStore::new(path)
        .write(&TokenPair::new(Some(access.to_string()), Some(refresh.to_string())))
        .await
}

/// Expired token on disk is refreshed over HTTP and the new one lands on disk
#[tokio::test]
async fn test_refresh_over_http_persists_new_token() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let dir = TempDir::new()?;
    let config = config_for(&server.url(), &dir);
    seed(config.storage.token_path.clone(), "old", "r1").await?;
    seed(config.storage.session_path.clone(), "sa", "sr").await?;

    let expired = server
        .mock("GET", "/v1/me")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/v1/me")
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"u1"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
        .match_header("apikey", "anon")
        .match_body(Matcher::Json(json!({"refresh_token": "sr"})))
        .with_status(200)
        .with_body(
            json!({
                "access_token": "sa2",
                "refresh_token": "sr2",
                "provider_token": "new",
                "provider_refresh_token": "r2"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let session = Session::start(config.clone()).await?;
    let profile = session.catalog().current_user_profile().await?;
    assert_eq!(profile["id"], "u1");

    expired.assert_async().await;
    fresh.assert_async().await;
    refresh.assert_async().await;

    let on_disk = FileTokenStore::new(&config.storage.token_path).read().await?;
    assert_eq!(on_disk, TokenPair::new(Some("new".into()), Some("r2".into())));
    let session_on_disk = FileTokenStore::new(&config.storage.session_path).read().await?;
    assert_eq!(session_on_disk.refresh_token.as_deref(), Some("sr2"));
    Ok(())
}

/// Query parameters reach the catalog as the API expects them
#[tokio::test]
async fn test_categories_query_over_http() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let dir = TempDir::new()?;
    let config = config_for(&server.url(), &dir);
    seed(config.storage.token_path.clone(), "tok", "r1").await?;

    let categories = server
        .mock("GET", "/v1/browse/categories")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("locale".into(), "es_ES".into()),
            Matcher::UrlEncoded("limit".into(), "50".into()),
            Matcher::UrlEncoded("offset".into(), "0".into()),
        ]))
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_body(r#"{"categories":{"items":[{"id":"rock"}]}}"#)
        .create_async()
        .await;

    let session = Session::start(config).await?;
    let body = session
        .catalog()
        .categories(Some("es_ES"), Page::new(80, 0))
        .await?;

    assert_eq!(body["categories"]["items"][0]["id"], "rock");
    categories.assert_async().await;
    Ok(())
}
