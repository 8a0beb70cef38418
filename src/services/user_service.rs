use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{User, UserPreferences, UserRole, UserStatus};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub identity_subject: Option<String>,
    pub password_hash: Option<String>,
    pub role: UserRole,
}

/// Fields a user may change on their own profile. Anything else in the
/// request body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Name cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewUser) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, name, identity_subject, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new.email.trim().to_lowercase())
        .bind(new.name.trim())
        .bind(new.identity_subject)
        .bind(new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "User"))?;

        tracing::info!("Created user {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_subject(&self, subject: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE identity_subject = $1 AND deleted_at IS NULL",
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Existing user or NotFound
    pub async fn require(&self, id: Uuid) -> Result<User, DatabaseError> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                avatar_url = COALESCE($3, avatar_url), \
                phone_number = COALESCE($4, phone_number), \
                address = COALESCE($5, address), \
                city = COALESCE($6, city), \
                state = COALESCE($7, state), \
                postal_code = COALESCE($8, postal_code), \
                country = COALESCE($9, country), \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.avatar_url.as_deref())
        .bind(update.phone_number.as_deref())
        .bind(update.address.as_deref())
        .bind(update.city.as_deref())
        .bind(update.state.as_deref())
        .bind(update.postal_code.as_deref())
        .bind(update.country.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
    }

    pub async fn set_role(&self, id: Uuid, role: UserRole) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

        tracing::info!("User {} role set to {}", id, role);
        Ok(user)
    }

    /// Suspending stamps the time and reason; any other status clears them
    pub async fn set_status(&self, id: Uuid, status: UserStatus, reason: Option<&str>) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET \
                status = $2, \
                suspended_at = CASE WHEN $2 = 'suspended' THEN NOW() ELSE NULL END, \
                suspension_reason = CASE WHEN $2 = 'suspended' THEN $3 ELSE NULL END, \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

        tracing::info!("User {} status set to {}", id, status);
        Ok(user)
    }

    pub async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    pub async fn touch_last_login(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_email_verified(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET email_verified = TRUE, updated_at = NOW() \
             WHERE email = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        tracing::info!("Soft-deleted user {}", id);
        Ok(())
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Stored preferences, or the defaults when the user never saved any
    pub async fn preferences(&self, user_id: Uuid) -> Result<UserPreferences, DatabaseError> {
        let stored = sqlx::query_as::<_, UserPreferences>("SELECT * FROM user_preferences WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stored.unwrap_or_else(|| UserPreferences::defaults_for(user_id)))
    }

    pub async fn save_preferences(&self, prefs: &UserPreferences) -> Result<UserPreferences, DatabaseError> {
        let saved = sqlx::query_as::<_, UserPreferences>(
            "INSERT INTO user_preferences (user_id, marketing_emails, order_notifications, blog_notifications, \
                language, timezone, theme, profile_visibility, show_email, show_purchase_history, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET \
                marketing_emails = EXCLUDED.marketing_emails, \
                order_notifications = EXCLUDED.order_notifications, \
                blog_notifications = EXCLUDED.blog_notifications, \
                language = EXCLUDED.language, \
                timezone = EXCLUDED.timezone, \
                theme = EXCLUDED.theme, \
                profile_visibility = EXCLUDED.profile_visibility, \
                show_email = EXCLUDED.show_email, \
                show_purchase_history = EXCLUDED.show_purchase_history, \
                updated_at = NOW() \
             RETURNING *",
        )
        .bind(prefs.user_id)
        .bind(prefs.marketing_emails)
        .bind(prefs.order_notifications)
        .bind(prefs.blog_notifications)
        .bind(&prefs.language)
        .bind(&prefs.timezone)
        .bind(&prefs.theme)
        .bind(&prefs.profile_visibility)
        .bind(prefs.show_email)
        .bind(prefs.show_purchase_history)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Preferences"))?;
        Ok(saved)
    }
}
