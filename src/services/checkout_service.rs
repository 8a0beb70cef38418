use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{activity, template::from_minor_units, Order, OrderStatus};
use crate::error::ApiError;
use crate::integrations::email::{self, Mailer};
use crate::integrations::payment::CheckoutSession;
use crate::services::activity_service::{ActivityService, ClientInfo};
use crate::services::order_service::{NewOrder, OrderService, Transition};
use crate::services::template_service::TemplateService;
use crate::services::user_service::UserService;

/// Result of reconciling a checkout session against the orders table
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub order: Order,
    /// False when an earlier delivery already completed the order
    pub applied: bool,
}

/// Turns payment-processor events into order state. Every entry point is
/// safe to call repeatedly for the same session or payment.
pub struct CheckoutService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl CheckoutService {
    pub fn new(pool: PgPool, mailer: Arc<dyn Mailer>, frontend_url: String) -> Self {
        Self {
            pool,
            mailer,
            frontend_url,
        }
    }

    /// Create-or-fetch the order for a paid session and complete it
    pub async fn complete_session(&self, session: &CheckoutSession, client: &ClientInfo) -> Result<Reconciled, ApiError> {
        let (user_id, template_id) = session.purchase_ids().map_err(|e| {
            tracing::warn!("Cannot reconcile session {}: {}", session.id, e);
            ApiError::bad_request("Checkout session is missing purchase details")
        })?;

        let templates = TemplateService::new(self.pool.clone());
        let template = templates.get_by_id(template_id).await?;

        let amount = match (session.amount_total, &template) {
            (Some(total), _) => from_minor_units(total),
            (None, Some(template)) => template.price,
            (None, None) => rust_decimal::Decimal::ZERO,
        };

        let orders = OrderService::new(self.pool.clone());
        let order = orders
            .create_pending(&NewOrder {
                user_id,
                template_id,
                amount,
                checkout_session_id: session.id.clone(),
                payment_intent_id: session.payment_intent.clone(),
                metadata: Some(json!({ "checkoutSessionId": session.id })),
            })
            .await?;

        let transition = orders
            .transition_status(order.id, OrderStatus::Completed, session.payment_intent.as_deref())
            .await?;

        let applied = transition.applied();
        let order = transition.into_order();

        if applied {
            ActivityService::new(self.pool.clone())
                .record(
                    user_id,
                    activity::ORDER_PLACED,
                    Some(("order", order.id.to_string())),
                    Some(json!({ "templateId": template_id, "amount": order.amount })),
                    client,
                )
                .await;

            let template_name = template.as_ref().map(|t| t.name.as_str()).unwrap_or("your template");
            self.send_confirmation(&order, template_name).await;
        } else {
            tracing::info!("Session {} already reconciled as order {}", session.id, order.id);
        }

        Ok(Reconciled { order, applied })
    }

    /// Expired or failed sessions fail their pending order, if one was created
    pub async fn fail_session(&self, session_id: &str) -> Result<Option<Order>, ApiError> {
        let orders = OrderService::new(self.pool.clone());
        let Some(order) = orders.get_by_session_id(session_id).await? else {
            tracing::info!("No order recorded for session {}, nothing to fail", session_id);
            return Ok(None);
        };

        if order.status != OrderStatus::Pending && order.status != OrderStatus::Failed {
            tracing::warn!("Ignoring failure for session {}: order {} is {}", session_id, order.id, order.status);
            return Ok(Some(order));
        }

        let transition = orders.transition_status(order.id, OrderStatus::Failed, None).await?;
        Ok(Some(transition.into_order()))
    }

    /// Mark the order paid with `payment_intent` as refunded
    pub async fn refund_payment(&self, payment_intent: &str, client: &ClientInfo) -> Result<Option<Transition>, ApiError> {
        let orders = OrderService::new(self.pool.clone());
        let Some(order) = orders.get_by_payment_intent(payment_intent).await? else {
            tracing::warn!("Refund for unknown payment intent {}", payment_intent);
            return Ok(None);
        };
        self.refund_order(&order, None, client).await.map(Some)
    }

    /// Move a completed order to refunded; `actor` is the admin who asked for it
    pub async fn refund_order(&self, order: &Order, actor: Option<Uuid>, client: &ClientInfo) -> Result<Transition, ApiError> {
        let transition = OrderService::new(self.pool.clone())
            .transition_status(order.id, OrderStatus::Refunded, None)
            .await?;

        if transition.applied() {
            ActivityService::new(self.pool.clone())
                .record(
                    order.user_id,
                    activity::ORDER_REFUNDED,
                    Some(("order", order.id.to_string())),
                    actor.map(|id| json!({ "refundedBy": id })),
                    client,
                )
                .await;
        }
        Ok(transition)
    }

    async fn send_confirmation(&self, order: &Order, template_name: &str) {
        let users = UserService::new(self.pool.clone());
        let user = match users.get_by_id(order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Could not load buyer for order {}: {}", order.id, e);
                return;
            }
        };

        match users.preferences(user.id).await {
            Ok(prefs) if !prefs.order_notifications => {
                tracing::debug!("User {} opted out of order emails", user.id);
                return;
            }
            _ => {}
        }

        let message = email::order_confirmation(
            &user.email,
            &user.name,
            template_name,
            order.amount,
            order.id,
            &self.frontend_url,
        );
        if let Err(e) = self.mailer.send(message).await {
            tracing::warn!("Order confirmation for {} not sent: {}", order.id, e);
        }
    }
}
