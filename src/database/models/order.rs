use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

text_enum!(DeliveryStatus, "delivery status", {
    Pending => "pending",
    Delivered => "delivered",
    Failed => "failed",
});

impl OrderStatus {
    /// Statuses this one may move to. Same-status moves are handled by the
    /// caller as no-ops and are not listed here.
    pub fn successors(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Completed, OrderStatus::Failed],
            OrderStatus::Completed => &[OrderStatus::Refunded],
            OrderStatus::Failed | OrderStatus::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Statuses from which `self` is reachable in one step
    pub fn predecessors(target: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .iter()
            .copied()
            .filter(|from| from.can_transition_to(target))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: Option<String>,
    pub download_url: Option<String>,
    pub download_expires_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Order row joined with the purchased template's display fields
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithTemplate {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub template_name: String,
    pub template_thumbnail_url: Option<String>,
    pub template_file_url: Option<String>,
}

/// Per-user order totals. Spend and purchases count completed orders only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub completed_orders: i64,
    pub total_spent: Decimal,
    pub templates_purchased: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_complete_or_fail() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Failed));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn terminal_states_do_not_move() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Failed.can_transition_to(*next));
            assert!(!OrderStatus::Refunded.can_transition_to(*next));
        }
    }

    #[test]
    fn only_completed_orders_refund() {
        assert_eq!(OrderStatus::predecessors(OrderStatus::Refunded), vec![OrderStatus::Completed]);
        assert_eq!(OrderStatus::predecessors(OrderStatus::Completed), vec![OrderStatus::Pending]);
        assert!(OrderStatus::predecessors(OrderStatus::Pending).is_empty());
    }

    #[test]
    fn statuses_round_trip_through_text() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        assert!("shipped".parse::<DeliveryStatus>().is_err());
    }

    #[test]
    fn stats_serialize_camel_case() {
        let stats = OrderStats {
            total_orders: 3,
            completed_orders: 2,
            total_spent: Decimal::new(3998, 2),
            templates_purchased: 2,
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["totalOrders"], 3);
        assert_eq!(value["templatesPurchased"], 2);
        assert!(value.get("totalSpent").is_some());
    }
}
