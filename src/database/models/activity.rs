use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Activity action names
pub const ACCOUNT_CREATED: &str = "account_created";
pub const ACCOUNT_DEACTIVATED: &str = "account_deactivated";
pub const PROFILE_UPDATED: &str = "profile_updated";
pub const PREFERENCES_UPDATED: &str = "preferences_updated";
pub const PASSWORD_CHANGED: &str = "password_changed";
pub const PASSWORD_RESET_REQUESTED: &str = "password_reset_requested";
pub const EMAIL_VERIFIED: &str = "email_verified";
pub const ORDER_PLACED: &str = "order_placed";
pub const ORDER_REFUNDED: &str = "order_refunded";
pub const TEMPLATE_DOWNLOADED: &str = "template_downloaded";
pub const USER_SUSPENDED: &str = "user_suspended";
pub const USER_UNSUSPENDED: &str = "user_unsuspended";
pub const ROLE_CHANGED: &str = "role_changed";
pub const USER_DELETED: &str = "user_deleted";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub login_method: Option<String>,
    pub successful: bool,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
