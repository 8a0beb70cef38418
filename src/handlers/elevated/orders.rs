// handlers/elevated/orders.rs
//
// POST /api/v1/admin/orders/:id/refund

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::Id;
use crate::database::models::OrderStatus;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::{CheckoutService, ClientInfo, OrderService};
use crate::state::AppState;

pub async fn refund_post(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    client: ClientInfo,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    let order = OrderService::new(state.pool().clone())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if order.status != OrderStatus::Completed {
        return Err(ApiError::conflict(format!("Only completed orders can be refunded (order is {})", order.status)));
    }
    let Some(payment_intent) = order.payment_intent_id.as_deref() else {
        return Err(ApiError::conflict("Order has no payment to refund"));
    };

    let refund = state.payments().create_refund(payment_intent).await?;

    let transition = CheckoutService::new(
        state.pool().clone(),
        state.mailer(),
        state.config().email.frontend_url.clone(),
    )
    .refund_order(&order, Some(admin.id), &client)
    .await?;

    tracing::info!("Admin {} refunded order {} ({})", admin.id, order.id, refund.id);

    Ok(Json(json!({
        "message": "Order refunded successfully",
        "refundId": refund.id,
        "order": transition.into_order(),
    })))
}
