// handlers/public/auth.rs - account sign-up, sign-in and password recovery
//
// POST /api/v1/auth/register
// POST /api/v1/auth/login
// POST /api/v1/auth/confirm
// POST /api/v1/auth/forgot-password
// POST /api/v1/auth/reset-password

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::JsonBody;
use crate::database::models::{activity, UserRole};
use crate::error::ApiError;
use crate::handlers::{check_password_length, deliver, hash_password, required};
use crate::integrations::{email, identity::IdentityError};
use crate::middleware::ensure_active;
use crate::services::{user_service::NewUser, ActivityService, ClientInfo, UserService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub new_password: Option<String>,
}

/// POST /auth/register - create the identity-provider account and local user
pub async fn register_post(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(email), Some(password), Some(name)) =
        (required(&body.email), body.password.as_deref(), required(&body.name))
    else {
        return Err(ApiError::bad_request("Email, password, and name are required"));
    };
    check_password_length(&state, password)?;

    let users = UserService::new(state.pool().clone());
    if users.get_by_email(email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let signup = state
        .identity()
        .sign_up(email, password, name)
        .await
        .map_err(|e| match &e {
            IdentityError::Rejected { code, .. } if code == "UsernameExistsException" => {
                ApiError::bad_request("User already exists")
            }
            _ => ApiError::from(e),
        })?;

    let password_hash = hash_password(password).await?;
    let user = users
        .create(NewUser {
            email: email.to_string(),
            name: name.to_string(),
            identity_subject: Some(signup.user_sub.clone()),
            password_hash: Some(password_hash),
            role: UserRole::User,
        })
        .await?;

    ActivityService::new(state.pool().clone())
        .record(user.id, activity::ACCOUNT_CREATED, None, None, &client)
        .await;

    deliver(
        &state,
        email::welcome(&user.email, &user.name, &state.config().email.frontend_url),
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "userId": user.id,
            "emailVerificationRequired": signup.email_verification_required,
        })),
    ))
}

/// POST /auth/login - exchange credentials for identity-provider tokens
pub async fn login_post(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(email), Some(password)) = (required(&body.email), body.password.as_deref()) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let users = UserService::new(state.pool().clone());
    let activity = ActivityService::new(state.pool().clone());

    let tokens = match state.identity().sign_in(email, password).await {
        Ok(tokens) => tokens,
        Err(e) if e.is_credentials() || e.is_unconfirmed() => {
            if let Some(user) = users.get_by_email(email).await? {
                activity.record_login(user.id, &client, "password", Some(&e.to_string())).await;
            }
            let message = if e.is_unconfirmed() { "Email not verified" } else { "Invalid credentials" };
            return Err(ApiError::unauthorized(message));
        }
        Err(e) => return Err(e.into()),
    };

    let user = users
        .get_by_email(email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Err(denied) = ensure_active(&user) {
        activity
            .record_login(user.id, &client, "password", Some(denied.message()))
            .await;
        return Err(denied);
    }

    users.touch_last_login(user.id).await?;
    activity.record_login(user.id, &client, "password", None).await;
    tracing::info!("User {} logged in", user.id);

    Ok(Json(json!({
        "message": "Login successful",
        "user": user,
        "tokens": tokens,
    })))
}

/// POST /auth/confirm - confirm the sign-up code and mark the email verified
pub async fn confirm_post(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(body): JsonBody<ConfirmRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(email), Some(code)) = (required(&body.email), required(&body.code)) else {
        return Err(ApiError::bad_request("Email and confirmation code are required"));
    };

    state.identity().confirm_sign_up(email, code).await?;

    if let Some(user) = UserService::new(state.pool().clone()).mark_email_verified(email).await? {
        ActivityService::new(state.pool().clone())
            .record(user.id, activity::EMAIL_VERIFIED, None, None, &client)
            .await;
    }

    Ok(Json(json!({ "message": "Email confirmed successfully" })))
}

/// POST /auth/forgot-password - start the reset flow. The response does not
/// reveal whether the address is registered.
pub async fn forgot_password_post(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(body): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(email) = required(&body.email) else {
        return Err(ApiError::bad_request("Email is required"));
    };

    match state.identity().forgot_password(email).await {
        Ok(()) => {}
        Err(e) if e.is_credentials() => tracing::info!("Password reset requested for unknown account"),
        Err(e) => return Err(e.into()),
    }

    if let Some(user) = UserService::new(state.pool().clone()).get_by_email(email).await? {
        ActivityService::new(state.pool().clone())
            .record(user.id, activity::PASSWORD_RESET_REQUESTED, None, None, &client)
            .await;
        deliver(
            &state,
            email::password_reset_requested(&user.email, &state.config().email.frontend_url),
        );
    }

    Ok(Json(json!({ "message": "Password reset code sent to your email" })))
}

/// POST /auth/reset-password - finish the reset with the emailed code
pub async fn reset_password_post(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(email), Some(code), Some(new_password)) =
        (required(&body.email), required(&body.code), body.new_password.as_deref())
    else {
        return Err(ApiError::bad_request("Email, code, and new password are required"));
    };
    check_password_length(&state, new_password)?;

    state
        .identity()
        .confirm_forgot_password(email, code, new_password)
        .await?;

    let users = UserService::new(state.pool().clone());
    if let Some(user) = users.get_by_email(email).await? {
        let hash = hash_password(new_password).await?;
        users.set_password_hash(user.id, &hash).await?;
        ActivityService::new(state.pool().clone())
            .record(user.id, activity::PASSWORD_CHANGED, None, Some(json!({ "via": "reset" })), &client)
            .await;
    }

    Ok(Json(json!({ "message": "Password reset successfully" })))
}
