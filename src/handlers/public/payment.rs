// handlers/public/payment.rs - checkout callbacks
//
// GET  /api/v1/payment/success?session_id=   browser redirect after paying
// GET  /api/v1/payment/cancel                 browser redirect after abandoning
// POST /api/v1/payment/webhooks/stripe        processor notifications
//
// The success redirect and the webhook race each other; both go through
// CheckoutService::complete_session, which applies the order transition once.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::required;
use crate::integrations::payment::{CheckoutSession, PaymentError, WebhookEvent, SIGNATURE_HEADER};
use crate::services::{CheckoutService, ClientInfo};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

fn checkout_service(state: &AppState) -> CheckoutService {
    CheckoutService::new(
        state.pool().clone(),
        state.mailer(),
        state.config().email.frontend_url.clone(),
    )
}

pub async fn success_get(
    State(state): State<AppState>,
    client: ClientInfo,
    Query(query): Query<SuccessQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(session_id) = required(&query.session_id) else {
        return Err(ApiError::bad_request("Session ID is required"));
    };

    let session = state.payments().retrieve_session(session_id).await?;
    if !session.is_paid() {
        return Err(ApiError::bad_request("Payment not completed"));
    }

    let reconciled = checkout_service(&state).complete_session(&session, &client).await?;

    Ok(Json(json!({
        "message": "Payment successful",
        "orderId": reconciled.order.id,
    })))
}

pub async fn cancel_get() -> Json<Value> {
    Json(json!({ "message": "Payment cancelled" }))
}

pub async fn stripe_webhook_post(
    State(state): State<AppState>,
    client: ClientInfo,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PaymentError::Signature("missing signature header".to_string()))?;

    let event = state.payments().construct_event(&body, signature).map_err(|e| match e {
        PaymentError::InvalidPayload(reason) => PaymentError::Signature(format!("unparseable event: {}", reason)),
        other => other,
    })?;

    tracing::info!("Webhook event {} ({})", event.id, event.kind);
    dispatch(&state, &event, &client).await?;

    Ok(Json(json!({ "received": true })))
}

fn session_of(event: &WebhookEvent) -> Result<CheckoutSession, ApiError> {
    event.session().map_err(|e| {
        tracing::warn!("Webhook event {} carries no usable session: {}", event.id, e);
        ApiError::bad_request("Webhook processing failed")
    })
}

async fn dispatch(state: &AppState, event: &WebhookEvent, client: &ClientInfo) -> Result<(), ApiError> {
    let checkout = checkout_service(state);

    match event.kind.as_str() {
        "checkout.session.completed" => {
            let session = session_of(event)?;
            if session.is_paid() {
                checkout.complete_session(&session, client).await?;
            } else {
                tracing::info!("Session {} completed without payment yet ({})", session.id, session.payment_status);
            }
        }
        "checkout.session.async_payment_succeeded" => {
            checkout.complete_session(&session_of(event)?, client).await?;
        }
        "checkout.session.async_payment_failed" | "checkout.session.expired" => {
            checkout.fail_session(&session_of(event)?.id).await?;
        }
        "charge.refunded" => match event.payment_intent() {
            Some(payment_intent) => {
                checkout.refund_payment(payment_intent, client).await?;
            }
            None => tracing::warn!("Refund event {} has no payment intent", event.id),
        },
        other => tracing::debug!("Ignoring webhook event type {}", other),
    }

    Ok(())
}
