// handlers/protected/checkout.rs
//
// POST /api/v1/payment/checkout   start a hosted checkout for one template

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::JsonBody;
use crate::error::ApiError;
use crate::integrations::payment::CheckoutRequest;
use crate::middleware::CurrentUser;
use crate::services::{OrderService, TemplateService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub template_id: Option<Uuid>,
}

pub async fn checkout_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<CheckoutBody>,
) -> Result<Json<Value>, ApiError> {
    let Some(template_id) = body.template_id else {
        return Err(ApiError::bad_request("Template ID is required"));
    };

    let template = TemplateService::new(state.pool().clone())
        .get_by_id(template_id)
        .await?
        .filter(|t| t.active)
        .ok_or_else(|| ApiError::not_found("Template not found"))?;

    if OrderService::new(state.pool().clone())
        .user_owns(user.id, template.id)
        .await?
    {
        return Err(ApiError::conflict("You already own this template"));
    }

    let session = state
        .payments()
        .create_checkout_session(&CheckoutRequest {
            user_id: user.id,
            customer_email: user.email.clone(),
            template_id: template.id,
            template_name: template.name.clone(),
            template_description: template.description.clone(),
            unit_amount: template.unit_amount(),
        })
        .await?;

    tracing::info!("Checkout session {} opened for user {} / template {}", session.id, user.id, template.id);

    Ok(Json(json!({
        "checkoutUrl": session.url,
        "sessionId": session.id,
        "message": "Checkout session created",
    })))
}
