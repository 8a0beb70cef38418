use axum::{extract::Request, middleware::Next, response::Response};

use crate::database::models::UserRole;
use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;

/// Checks the caller attached by `require_auth` against an allow-list
pub fn require_role(request: &Request, allowed: &[UserRole], denied: &str) -> Result<(), ApiError> {
    let CurrentUser(user) = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.has_role(allowed) {
        Ok(())
    } else {
        tracing::info!("User {} ({}) denied: needs one of {:?}", user.id, user.role, allowed);
        Err(ApiError::forbidden(denied))
    }
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, &[UserRole::Admin], "Admin access required")?;
    Ok(next.run(request).await)
}

/// Content management: authors and admins
pub async fn require_author(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(&request, &[UserRole::Admin, UserRole::Author], "Insufficient permissions")?;
    Ok(next.run(request).await)
}
