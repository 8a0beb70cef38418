use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(skip_deserializing)]
    pub user_id: Uuid,
    pub marketing_emails: bool,
    pub order_notifications: bool,
    pub blog_notifications: bool,
    pub language: String,
    pub timezone: String,
    pub theme: String,
    pub profile_visibility: String,
    pub show_email: bool,
    pub show_purchase_history: bool,
    #[serde(skip_deserializing, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            marketing_emails: true,
            order_notifications: true,
            blog_notifications: true,
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            theme: "light".to_string(),
            profile_visibility: "public".to_string(),
            show_email: false,
            show_purchase_history: false,
            updated_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.theme.as_str(), "light" | "dark" | "auto") {
            return Err(format!("Invalid theme '{}'", self.theme));
        }
        if !matches!(self.profile_visibility.as_str(), "public" | "private") {
            return Err(format!("Invalid profile visibility '{}'", self.profile_visibility));
        }
        if self.language.trim().is_empty() || self.timezone.trim().is_empty() {
            return Err("Language and timezone are required".to_string());
        }
        Ok(())
    }
}
