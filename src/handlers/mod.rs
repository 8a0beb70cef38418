// handlers/mod.rs - HTTP handlers grouped by the access they require
//
// public/     no authentication (catalogue, sign-in, payment callbacks)
// protected/  any active user; authors/admins for content management
// elevated/   admin role only

pub mod elevated;
pub mod protected;
pub mod public;

use crate::auth;
use crate::error::ApiError;
use crate::integrations::EmailMessage;
use crate::state::AppState;

/// Trimmed, non-empty value of an optional request field
pub(crate) fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn check_password_length(state: &AppState, password: &str) -> Result<(), ApiError> {
    let min = state.config().security.min_password_length;
    if password.chars().count() < min {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters long",
            min
        )));
    }
    Ok(())
}

/// bcrypt is deliberately slow; keep it off the async workers
pub(crate) async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| ApiError::internal_with_detail("Failed to hash password", e))?
        .map_err(|e| ApiError::internal_with_detail("Failed to hash password", e))
}

pub(crate) async fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal_with_detail("Failed to verify password", e))
}

/// Fire-and-forget email; failures are logged, never returned
pub(crate) fn deliver(state: &AppState, message: EmailMessage) {
    let mailer = state.mailer();
    tokio::spawn(async move {
        let subject = message.subject.clone();
        if let Err(e) = mailer.send(message).await {
            tracing::warn!("Email '{}' not delivered: {}", subject, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_drops_blank() {
        assert_eq!(required(&Some("  a@b.c ".to_string())), Some("a@b.c"));
        assert_eq!(required(&Some("   ".to_string())), None);
        assert_eq!(required(&None), None);
    }
}
