use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{DeliveryStatus, Order, OrderStats, OrderStatus, OrderWithTemplate, Template};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub amount: Decimal,
    pub checkout_session_id: String,
    pub payment_intent_id: Option<String>,
    pub metadata: Option<Value>,
}

/// Outcome of a status change request
#[derive(Debug, Clone)]
pub enum Transition {
    /// This call moved the order
    Applied(Order),
    /// The order was already in the requested status
    Unchanged(Order),
}

impl Transition {
    pub fn into_order(self) -> Order {
        match self {
            Transition::Applied(order) | Transition::Unchanged(order) => order,
        }
    }

    pub fn applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

/// Decide what a failed conditional update means given the row's current status
fn classify_miss(current: Order, target: OrderStatus) -> Result<Transition, DatabaseError> {
    if current.status == target {
        Ok(Transition::Unchanged(current))
    } else {
        Err(DatabaseError::Conflict(format!(
            "Order {} cannot move from {} to {}",
            current.id, current.status, target
        )))
    }
}

pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending order for a checkout session, or return the one that
    /// already exists for it.
    pub async fn create_pending(&self, new: &NewOrder) -> Result<Order, DatabaseError> {
        let inserted = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (user_id, template_id, amount, status, delivery_status, \
                checkout_session_id, payment_intent_id, metadata) \
             VALUES ($1, $2, $3, 'pending', 'pending', $4, $5, $6) \
             ON CONFLICT (checkout_session_id) DO NOTHING RETURNING *",
        )
        .bind(new.user_id)
        .bind(new.template_id)
        .bind(new.amount)
        .bind(&new.checkout_session_id)
        .bind(new.payment_intent_id.as_deref())
        .bind(new.metadata.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Order"))?;

        match inserted {
            Some(order) => {
                tracing::info!("Created pending order {} for session {}", order.id, new.checkout_session_id);
                Ok(order)
            }
            None => self
                .get_by_session_id(&new.checkout_session_id)
                .await?
                .ok_or_else(|| DatabaseError::NotFound("Order not found".to_string())),
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Order>, DatabaseError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn get_by_session_id(&self, session_id: &str) -> Result<Option<Order>, DatabaseError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE checkout_session_id = $1 AND deleted_at IS NULL",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    pub async fn get_by_payment_intent(&self, payment_intent: &str) -> Result<Option<Order>, DatabaseError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE payment_intent_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(payment_intent)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    /// Move an order to `target` with a single conditional update, so only one
    /// of several concurrent callers can apply a given transition.
    pub async fn transition_status(
        &self,
        id: Uuid,
        target: OrderStatus,
        payment_intent: Option<&str>,
    ) -> Result<Transition, DatabaseError> {
        let from: Vec<String> = OrderStatus::predecessors(target)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let moved = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $2, payment_intent_id = COALESCE($4, payment_intent_id), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL AND status = ANY($3) RETURNING *",
        )
        .bind(id)
        .bind(target.as_str())
        .bind(&from)
        .bind(payment_intent)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(order) = moved {
            tracing::info!("Order {} moved to {}", order.id, target);
            return Ok(Transition::Applied(order));
        }

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Order not found".to_string()))?;
        classify_miss(current, target)
    }

    pub async fn set_delivery_status(&self, id: Uuid, status: DeliveryStatus) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE orders SET delivery_status = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remember the issued download link and mark the order delivered
    pub async fn set_download_url(&self, id: Uuid, url: &str, expires_at: DateTime<Utc>) -> Result<Order, DatabaseError> {
        sqlx::query_as::<_, Order>(
            "UPDATE orders SET download_url = $2, download_expires_at = $3, delivery_status = 'delivered', \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(url)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Order not found".to_string()))
    }

    pub async fn list_by_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<OrderWithTemplate>, DatabaseError> {
        let orders = sqlx::query_as::<_, OrderWithTemplate>(
            "SELECT o.*, t.name AS template_name, t.thumbnail_url AS template_thumbnail_url, \
                t.file_url AS template_file_url \
             FROM orders o JOIN templates t ON t.id = o.template_id \
             WHERE o.user_id = $1 AND o.deleted_at IS NULL \
             ORDER BY o.created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// One of the user's orders; other users' orders read as missing
    pub async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<OrderWithTemplate>, DatabaseError> {
        let order = sqlx::query_as::<_, OrderWithTemplate>(
            "SELECT o.*, t.name AS template_name, t.thumbnail_url AS template_thumbnail_url, \
                t.file_url AS template_file_url \
             FROM orders o JOIN templates t ON t.id = o.template_id \
             WHERE o.id = $1 AND o.user_id = $2 AND o.deleted_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    pub async fn stats_for_user(&self, user_id: Uuid) -> Result<OrderStats, DatabaseError> {
        let stats = sqlx::query_as::<_, OrderStats>(
            "SELECT COUNT(*) AS total_orders, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed_orders, \
                COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0) AS total_spent, \
                COUNT(DISTINCT template_id) FILTER (WHERE status = 'completed') AS templates_purchased \
             FROM orders WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Templates the user has a completed order for
    pub async fn purchased_by_user(&self, user_id: Uuid) -> Result<Vec<Template>, DatabaseError> {
        let templates = sqlx::query_as::<_, Template>(
            "SELECT t.* FROM templates t \
             WHERE t.deleted_at IS NULL AND EXISTS ( \
                SELECT 1 FROM orders o WHERE o.template_id = t.id AND o.user_id = $1 \
                    AND o.status = 'completed' AND o.deleted_at IS NULL) \
             ORDER BY t.name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    pub async fn user_owns(&self, user_id: Uuid, template_id: Uuid) -> Result<bool, DatabaseError> {
        let (owns,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE user_id = $1 AND template_id = $2 \
                AND status = 'completed' AND deleted_at IS NULL)",
        )
        .bind(user_id)
        .bind(template_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(owns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_in(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            amount: Decimal::new(1999, 2),
            status,
            delivery_status: DeliveryStatus::Pending,
            payment_intent_id: None,
            checkout_session_id: Some("cs_test".to_string()),
            download_url: None,
            download_expires_at: None,
            metadata: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn replay_of_same_status_is_unchanged() {
        let result = classify_miss(order_in(OrderStatus::Completed), OrderStatus::Completed).unwrap();
        assert!(!result.applied());
        assert_eq!(result.into_order().status, OrderStatus::Completed);
    }

    #[test]
    fn illegal_transition_is_conflict() {
        let err = classify_miss(order_in(OrderStatus::Failed), OrderStatus::Completed).unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let err = classify_miss(order_in(OrderStatus::Pending), OrderStatus::Refunded).unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }
}
