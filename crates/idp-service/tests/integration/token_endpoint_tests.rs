//! End-to-end tests for `POST /api/oauth2/token`
//!
//! Each test spawns a real server on a random port and talks to it over HTTP.

use idp_service::models::TokenResponse;
use idp_test_utils::{
    decode_claims_unverified, TestConfigBuilder, TestIdpServer, TokenAssertions, TEST_ISSUER,
};
use reqwest::StatusCode;
use serde_json::json;
use std::collections::HashSet;

async fn server_with_clients() -> Result<TestIdpServer, anyhow::Error> {
    let config = TestConfigBuilder::new()
        .with_client("c1", "s1", &["admin"])
        .with_client("reader", "r-secret", &["reader", "auditor"])
        .expires_in(900)
        .build()?;
    TestIdpServer::spawn(config).await
}

// ============================================================================
// Successful issuance
// ============================================================================

#[tokio::test]
async fn test_valid_client_receives_bearer_token() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let response = server.request_token("c1", "s1").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: TokenResponse = response.json().await?;
    assert_eq!(body.token_type, "bearer");
    assert_eq!(body.expires_in, 900);
    assert!(!body.access_token.is_empty());

    body.access_token
        .assert_valid_jwt("RS256")
        .assert_for_subject("c1")
        .assert_issued_by(TEST_ISSUER)
        .assert_has_role("admin")
        .assert_expires_in(900);

    Ok(())
}

#[tokio::test]
async fn test_issued_token_verifies_with_public_key() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let body: TokenResponse = server.request_token("reader", "r-secret").await?.json().await?;

    let claims = server
        .state()
        .signer
        .verify(&body.access_token, TEST_ISSUER)?;
    assert_eq!(claims.sub, "reader");
    assert_eq!(
        claims.roles,
        vec!["reader".to_string(), "auditor".to_string()]
    );

    Ok(())
}

#[tokio::test]
async fn test_claim_times_are_epoch_seconds() -> Result<(), anyhow::Error> {
    let config = TestConfigBuilder::new()
        .with_client("c1", "s1", &[])
        .with_time_zone("+02:00")
        .build()?;
    let server = TestIdpServer::spawn(config).await?;

    let before = chrono::Utc::now().timestamp();
    let body: TokenResponse = server.request_token("c1", "s1").await?.json().await?;
    let after = chrono::Utc::now().timestamp();

    let claims = decode_claims_unverified(&body.access_token);
    assert!(
        (before..=after).contains(&claims.iat),
        "iat {} should be within [{}, {}] regardless of the configured offset",
        claims.iat,
        before,
        after
    );
    assert_eq!(claims.nbf, claims.iat);
    // No roles registered, so the claim is omitted.
    assert!(claims.roles.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_every_token_has_unique_jti() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let mut jtis = HashSet::new();
    for _ in 0..5 {
        let body: TokenResponse = server.request_token("c1", "s1").await?.json().await?;
        jtis.insert(decode_claims_unverified(&body.access_token).jti);
    }
    assert_eq!(jtis.len(), 5);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_are_all_answered() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = server.client().clone();
        let url = server.token_url();
        let secret = if i % 4 == 0 { "wrong" } else { "s1" };
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .form(&[("client_id", "c1"), ("client_secret", secret)])
                .send()
                .await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let expected = if i % 4 == 0 {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::OK
        };
        assert_eq!(task.await??.status(), expected, "request {i}");
    }

    Ok(())
}

#[tokio::test]
async fn test_eddsa_issuance_from_key_files() -> Result<(), anyhow::Error> {
    let pair = idp_test_utils::test_ed25519_pair(3)?;
    let files = idp_test_utils::KeyFiles::write(&pair)?;

    let config = TestConfigBuilder::new()
        .with_client("c1", "s1", &["admin"])
        .with_algorithm("EdDSA")
        .with_inline_keys(
            Some(&files.public_path_str()),
            Some(&files.private_path_str()),
        )
        .build()?;
    let server = TestIdpServer::spawn(config).await?;

    let body: TokenResponse = server.request_token("c1", "s1").await?.json().await?;
    body.access_token
        .assert_valid_jwt("EdDSA")
        .assert_for_subject("c1");

    Ok(())
}

// ============================================================================
// Denied requests
// ============================================================================

#[tokio::test]
async fn test_wrong_secret_is_unauthorized_with_empty_body() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let response = server.request_token("c1", "wrong").await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.bytes().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_client_matches_wrong_secret() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let unknown = server.request_token("ghost", "s1").await?;
    let wrong = server.request_token("c1", "nope").await?;

    assert_eq!(unknown.status(), wrong.status());
    assert_eq!(unknown.bytes().await?, wrong.bytes().await?);

    Ok(())
}

#[tokio::test]
async fn test_incomplete_client_entries_are_not_registered() -> Result<(), anyhow::Error> {
    let config = TestConfigBuilder::new()
        .with_client_entry(json!({ "id": "no-secret", "roles": ["admin"] }))
        .with_client_entry(json!({ "secret": "orphan" }))
        .with_client("c1", "s1", &[])
        .build()?;
    let server = TestIdpServer::spawn(config).await?;

    assert_eq!(
        server.request_token("no-secret", "").await?.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        server.request_token("c1", "s1").await?.status(),
        StatusCode::OK
    );

    Ok(())
}

// ============================================================================
// Malformed requests
// ============================================================================

#[tokio::test]
async fn test_missing_body_is_bad_request() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let response = server.client().post(server.token_url()).send().await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.bytes().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_form_without_secret_is_bad_request() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let response = server
        .client()
        .post(server.token_url())
        .form(&[("client_id", "c1")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_json_body_is_bad_request() -> Result<(), anyhow::Error> {
    let server = server_with_clients().await?;

    let response = server
        .client()
        .post(server.token_url())
        .json(&json!({ "client_id": "c1", "client_secret": "s1" }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
