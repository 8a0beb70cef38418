use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{bearer_token, AuthError};
use crate::database::models::{User, UserStatus};
use crate::error::ApiError;
use crate::services::UserService;
use crate::state::AppState;

/// The authenticated caller, injected by [`require_auth`] / [`optional_auth`]
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Suspended and deactivated accounts may not act
pub fn ensure_active(user: &User) -> Result<(), ApiError> {
    match user.status {
        UserStatus::Active => Ok(()),
        UserStatus::Suspended => Err(ApiError::forbidden("Account suspended")),
        UserStatus::Deactivated => Err(ApiError::forbidden("Account deactivated")),
    }
}

/// Development bypass: the user named by DEBUG_USER_ID, when it exists
async fn debug_user(state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(raw) = state.config().debug_user_id() else {
        return Ok(None);
    };
    let Ok(id) = raw.parse::<Uuid>() else {
        tracing::warn!("DEBUG_USER_ID '{}' is not a UUID, ignoring", raw);
        return Ok(None);
    };

    let user = UserService::new(state.pool().clone()).get_by_id(id).await?;
    match &user {
        Some(user) => tracing::debug!("Debug auth bypass as {} ({})", user.id, user.email),
        None => tracing::warn!("DEBUG_USER_ID {} does not name an existing user", id),
    }
    Ok(user)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    if let Some(user) = debug_user(state).await? {
        ensure_active(&user)?;
        return Ok(user);
    }

    let token = bearer_token(headers).map_err(|_| ApiError::unauthorized("No authorization token provided"))?;

    let claims = state.verifier().verify(token).await.map_err(|e| {
        match &e {
            AuthError::NotConfigured | AuthError::KeyFetch(_) => tracing::error!("Token verification unavailable: {}", e),
            _ => tracing::debug!("Rejected token: {}", e),
        }
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let user = UserService::new(state.pool().clone())
        .get_by_subject(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    ensure_active(&user)?;
    Ok(user)
}

/// Requires a valid bearer token (or the development bypass) and an active account
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Attaches the caller when one can be authenticated; never rejects
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let has_credentials =
        request.headers().contains_key(axum::http::header::AUTHORIZATION) || state.config().debug_user_id().is_some();

    if has_credentials {
        match authenticate(&state, request.headers()).await {
            Ok(user) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Err(e) => tracing::debug!("Optional auth skipped: {}", e),
        }
    }

    next.run(request).await
}
