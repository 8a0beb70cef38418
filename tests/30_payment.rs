mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use template_store_api::integrations::payment::{signature_header, SIGNATURE_HEADER};

#[tokio::test]
async fn cancel_acknowledges() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/api/v1/payment/cancel")).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<serde_json::Value>().await?, json!({ "message": "Payment cancelled" }));
    Ok(())
}

#[tokio::test]
async fn success_requires_session_id() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = reqwest::get(server.url("/api/v1/payment/success")).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::error_message(res).await?, "Session ID is required");
    Ok(())
}

#[tokio::test]
async fn webhook_rejects_bad_signatures() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();
    let payload = json!({ "id": "evt_1", "type": "checkout.session.completed", "data": { "object": {} } }).to_string();

    // Missing header
    let res = client
        .post(server.url("/api/v1/payment/webhooks/stripe"))
        .body(payload.clone())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::error_message(res).await?, "Webhook processing failed");

    // Signed with the wrong secret
    let now = chrono::Utc::now().timestamp();
    let forged = signature_header("whsec_wrong", now, payload.as_bytes())?;
    let res = client
        .post(server.url("/api/v1/payment/webhooks/stripe"))
        .header(SIGNATURE_HEADER, forged)
        .body(payload)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::error_message(res).await?, "Webhook processing failed");
    Ok(())
}

#[tokio::test]
async fn webhook_acknowledges_unhandled_events() -> Result<()> {
    let server = common::spawn_server().await?;
    let payload = json!({ "id": "evt_2", "type": "customer.created", "data": { "object": { "id": "cus_1" } } }).to_string();
    let now = chrono::Utc::now().timestamp();
    let header = signature_header(common::WEBHOOK_SECRET, now, payload.as_bytes())?;

    let res = reqwest::Client::new()
        .post(server.url("/api/v1/payment/webhooks/stripe"))
        .header(SIGNATURE_HEADER, header)
        .body(payload)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<serde_json::Value>().await?, json!({ "received": true }));
    Ok(())
}
