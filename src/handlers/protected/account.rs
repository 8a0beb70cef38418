// handlers/protected/account.rs
//
// POST /api/v1/auth/change-password

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::JsonBody;
use crate::database::models::activity;
use crate::error::ApiError;
use crate::handlers::{check_password_length, hash_password, verify_password};
use crate::middleware::CurrentUser;
use crate::services::{ActivityService, ClientInfo, UserService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn change_password_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    client: ClientInfo,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(current), Some(new_password)) = (body.current_password.as_deref(), body.new_password.as_deref()) else {
        return Err(ApiError::bad_request("Current password and new password are required"));
    };
    check_password_length(&state, new_password)?;

    // Accounts created through the identity provider alone have no local hash
    if let Some(stored) = user.password_hash.as_deref() {
        if !verify_password(current, stored).await? {
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }
    }

    let hash = hash_password(new_password).await?;
    UserService::new(state.pool().clone()).set_password_hash(user.id, &hash).await?;

    ActivityService::new(state.pool().clone())
        .record(user.id, activity::PASSWORD_CHANGED, None, None, &client)
        .await;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}
