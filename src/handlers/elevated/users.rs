// handlers/elevated/users.rs - user administration
//
// GET    /api/v1/admin/users
// GET    /api/v1/admin/users/:id
// PUT    /api/v1/admin/users/:id
// PUT    /api/v1/admin/users/:id/role
// POST   /api/v1/admin/users/:id/suspend
// POST   /api/v1/admin/users/:id/unsuspend
// DELETE /api/v1/admin/users/:id

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{Id, JsonBody, PageQuery};
use crate::database::models::{activity, User, UserRole, UserStatus};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::services::{user_service::ProfileUpdate, ActivityService, ClientInfo, UserService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    #[serde(flatten)]
    pub profile: ProfileUpdate,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuspendRequest {
    pub reason: Option<String>,
}

/// Admins may not lock themselves out
fn not_self(admin: &User, target: Uuid, action: &str) -> Result<(), ApiError> {
    if admin.id == target {
        return Err(ApiError::bad_request(format!("You cannot {} your own account", action)));
    }
    Ok(())
}

fn parse_role(raw: &str) -> Result<UserRole, ApiError> {
    raw.trim().parse::<UserRole>().map_err(ApiError::from)
}

pub async fn list_get(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Result<Json<Value>, ApiError> {
    let page = query.resolve(&state.config().api);
    let users = UserService::new(state.pool().clone())
        .list(page.limit, page.offset)
        .await?;

    Ok(Json(json!({
        "users": users,
        "count": users.len(),
        "limit": page.limit,
        "offset": page.offset,
    })))
}

pub async fn show_get(State(state): State<AppState>, Id(id): Id) -> Result<Json<Value>, ApiError> {
    let user = UserService::new(state.pool().clone()).require(id).await?;
    Ok(Json(json!({ "user": user })))
}

/// The role to write for an admin edit of `target`, if it changes.
/// Runs before any write so a rejected self-demotion leaves the row untouched.
fn role_change(admin: &User, target: &User, requested: Option<UserRole>) -> Result<Option<UserRole>, ApiError> {
    match requested {
        Some(role) if role != target.role => {
            not_self(admin, target.id, "change the role of")?;
            Ok(Some(role))
        }
        _ => Ok(None),
    }
}

pub async fn update_put(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    client: ClientInfo,
    Id(id): Id,
    JsonBody(update): JsonBody<AdminUserUpdate>,
) -> Result<Json<Value>, ApiError> {
    update.profile.validate().map_err(ApiError::bad_request)?;
    let requested = update.role.as_deref().map(parse_role).transpose()?;

    let users = UserService::new(state.pool().clone());
    let target = users.require(id).await?;
    let change = role_change(&admin, &target, requested)?;

    let mut user = users.update_profile(id, &update.profile).await?;

    if let Some(role) = change {
        user = users.set_role(id, role).await?;
        ActivityService::new(state.pool().clone())
            .record(
                id,
                activity::ROLE_CHANGED,
                None,
                Some(json!({ "from": target.role, "to": role, "changedBy": admin.id })),
                &client,
            )
            .await;
    }

    Ok(Json(json!({ "message": "User updated successfully", "user": user })))
}

pub async fn role_put(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    client: ClientInfo,
    Id(id): Id,
    JsonBody(body): JsonBody<RoleRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(raw) = body.role.as_deref() else {
        return Err(ApiError::bad_request("Role is required"));
    };
    let role = parse_role(raw)?;
    not_self(&admin, id, "change the role of")?;

    let users = UserService::new(state.pool().clone());
    let previous = users.require(id).await?.role;
    let user = users.set_role(id, role).await?;

    ActivityService::new(state.pool().clone())
        .record(
            id,
            activity::ROLE_CHANGED,
            None,
            Some(json!({ "from": previous, "to": role, "changedBy": admin.id })),
            &client,
        )
        .await;
    tracing::info!("Admin {} set role of {} to {}", admin.id, id, role);

    Ok(Json(json!({ "message": "User role updated successfully", "user": user })))
}

pub async fn suspend_post(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    client: ClientInfo,
    Id(id): Id,
    body: Option<JsonBody<SuspendRequest>>,
) -> Result<Json<Value>, ApiError> {
    not_self(&admin, id, "suspend")?;
    let reason = body.and_then(|JsonBody(b)| b.reason).filter(|r| !r.trim().is_empty());

    let user = UserService::new(state.pool().clone())
        .set_status(id, UserStatus::Suspended, reason.as_deref())
        .await?;

    ActivityService::new(state.pool().clone())
        .record(
            id,
            activity::USER_SUSPENDED,
            None,
            Some(json!({ "reason": reason, "suspendedBy": admin.id })),
            &client,
        )
        .await;
    tracing::info!("Admin {} suspended user {}", admin.id, id);

    Ok(Json(json!({ "message": "User suspended successfully", "user": user })))
}

pub async fn unsuspend_post(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    client: ClientInfo,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    let user = UserService::new(state.pool().clone())
        .set_status(id, UserStatus::Active, None)
        .await?;

    ActivityService::new(state.pool().clone())
        .record(id, activity::USER_UNSUSPENDED, None, Some(json!({ "unsuspendedBy": admin.id })), &client)
        .await;

    Ok(Json(json!({ "message": "User unsuspended successfully", "user": user })))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    client: ClientInfo,
    Id(id): Id,
) -> Result<Json<Value>, ApiError> {
    not_self(&admin, id, "delete")?;

    UserService::new(state.pool().clone()).soft_delete(id).await?;

    ActivityService::new(state.pool().clone())
        .record(id, activity::USER_DELETED, None, Some(json!({ "deletedBy": admin.id })), &client)
        .await;
    tracing::info!("Admin {} deleted user {}", admin.id, id);

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            identity_subject: None,
            password_hash: None,
            name: "Admin".to_string(),
            role,
            status: UserStatus::Active,
            avatar_url: None,
            phone_number: None,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            email_verified: true,
            last_login: None,
            suspended_at: None,
            suspension_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn rejects_unknown_role() {
        let err = parse_role("superuser").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_role(" author ").unwrap(), UserRole::Author);
    }

    #[test]
    fn admin_update_reads_profile_and_role() {
        let update: AdminUserUpdate =
            serde_json::from_value(json!({ "name": "Ada", "postalCode": "12345", "role": "admin" })).unwrap();
        assert_eq!(update.profile.name.as_deref(), Some("Ada"));
        assert_eq!(update.profile.postal_code.as_deref(), Some("12345"));
        assert_eq!(update.role.as_deref(), Some("admin"));
    }

    #[test]
    fn admin_cannot_change_own_role_in_profile_edit() {
        let admin = user(UserRole::Admin);
        let err = role_change(&admin, &admin, Some(UserRole::User)).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "You cannot change the role of your own account");

        // Restating the current role is not a change
        assert_eq!(role_change(&admin, &admin, Some(UserRole::Admin)).unwrap(), None);
        assert_eq!(role_change(&admin, &admin, None).unwrap(), None);
    }

    #[test]
    fn admin_changes_other_roles() {
        let admin = user(UserRole::Admin);
        let target = user(UserRole::User);
        assert_eq!(role_change(&admin, &target, Some(UserRole::Author)).unwrap(), Some(UserRole::Author));
        assert_eq!(role_change(&admin, &target, Some(UserRole::User)).unwrap(), None);
    }
}
