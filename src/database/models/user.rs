use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(UserRole, "role", {
    User => "user",
    Author => "author",
    Admin => "admin",
});

text_enum!(UserStatus, "status", {
    Active => "active",
    Suspended => "suspended",
    Deactivated => "deactivated",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub identity_subject: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub avatar_url: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn has_role(&self, allowed: &[UserRole]) -> bool {
        allowed.contains(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_and_print() {
        assert_eq!("author".parse::<UserRole>().unwrap(), UserRole::Author);
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert!("superuser".parse::<UserRole>().is_err());
        assert_eq!(UserStatus::ALL.len(), 3);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            identity_subject: Some("sub-123".to_string()),
            password_hash: Some("$2b$hash".to_string()),
            name: "A".to_string(),
            role: UserRole::User,
            status: UserStatus::Active,
            avatar_url: None,
            phone_number: None,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            email_verified: false,
            last_login: None,
            suspended_at: None,
            suspension_reason: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("identitySubject").is_none());
        assert_eq!(value["role"], "user");
        assert_eq!(value["emailVerified"], false);
    }
}
