mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/health")).send().await?;

    // No database in the test environment, so degraded is expected; either is fine
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let body = res.json::<serde_json::Value>().await?;
    assert!(body.get("status").is_some());
    assert!(body.get("database").is_some());
    Ok(())
}

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["name"], "Template Store API");
    assert!(body["endpoints"]["templates"].is_string());
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_404() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/api/v1/nope")).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn invalid_id_is_400() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/api/v1/templates/not-a-uuid")).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::error_message(res).await?, "Invalid id");
    Ok(())
}
