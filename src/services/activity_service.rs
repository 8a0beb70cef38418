use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{ActivityLog, LoginHistory};

/// Where a request came from, for the audit tables
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Audit trail writes are best-effort: a failed insert is logged and never
/// fails the request that triggered it.
pub struct ActivityService {
    pool: PgPool,
}

impl ActivityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        user_id: Uuid,
        action: &str,
        resource: Option<(&str, String)>,
        details: Option<Value>,
        client: &ClientInfo,
    ) {
        let (resource_type, resource_id) = match resource {
            Some((kind, id)) => (Some(kind), Some(id)),
            None => (None, None),
        };

        let result = sqlx::query(
            "INSERT INTO activity_logs (user_id, action, resource_type, resource_id, details, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user_id)
        .bind(action)
        .bind(resource_type)
        .bind(resource_id)
        .bind(details)
        .bind(client.ip_address.as_deref())
        .bind(client.user_agent.as_deref())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to record activity {} for user {}: {}", action, user_id, e);
        }
    }

    pub async fn record_login(
        &self,
        user_id: Uuid,
        client: &ClientInfo,
        method: &str,
        failure_reason: Option<&str>,
    ) {
        let result = sqlx::query(
            "INSERT INTO login_history (user_id, ip_address, user_agent, login_method, successful, failure_reason) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user_id)
        .bind(client.ip_address.as_deref())
        .bind(client.user_agent.as_deref())
        .bind(method)
        .bind(failure_reason.is_none())
        .bind(failure_reason)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to record login attempt for user {}: {}", user_id, e);
        }
    }

    pub async fn recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityLog>, DatabaseError> {
        let rows = sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Newest-first login attempts with the total for paging
    pub async fn login_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<LoginHistory>, i64), DatabaseError> {
        let rows = sqlx::query_as::<_, LoginHistory>(
            "SELECT * FROM login_history WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM login_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((rows, total))
    }
}
