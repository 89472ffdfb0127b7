//! Integration tests for the health and metrics endpoints

use idp_test_utils::{TestConfigBuilder, TestIdpServer};
use reqwest::StatusCode;

/// `/health` answers as soon as the listener is up.
#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestIdpServer::spawn(TestConfigBuilder::new().build()?).await?;

    let response = server
        .client()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Health check should return 200 OK"
    );
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// `/metrics` renders Prometheus text.
#[tokio::test]
async fn test_metrics_endpoint_is_served() -> Result<(), anyhow::Error> {
    let server = TestIdpServer::spawn(
        TestConfigBuilder::new()
            .with_client("c1", "s1", &[])
            .build()?,
    )
    .await?;

    // Generate some traffic first.
    server.request_token("c1", "s1").await?;

    let response = server
        .client()
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// Unknown paths are 404 and do not reach the token handler.
#[tokio::test]
async fn test_unknown_path_is_not_found() -> Result<(), anyhow::Error> {
    let server = TestIdpServer::spawn(TestConfigBuilder::new().build()?).await?;

    let response = server
        .client()
        .post(format!("{}/api/oauth2/authorize", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
