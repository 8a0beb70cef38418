//! Managed identity provider (AWS Cognito user pools).
//!
//! Only the unauthenticated user-pool API is used (sign-up, password auth,
//! confirmation and password reset), so requests carry the app client id and
//! no request signing is needed.

use reqwest::header::CONTENT_TYPE;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::IdentityConfig;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider not configured: {0}")]
    NotConfigured(&'static str),

    /// The provider understood the request and refused it
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    #[error("unexpected identity provider response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl IdentityError {
    /// Credential failures, as opposed to malformed requests or outages
    pub fn is_credentials(&self) -> bool {
        matches!(
            self,
            IdentityError::Rejected { code, .. }
                if code == "NotAuthorizedException" || code == "UserNotFoundException"
        )
    }

    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, IdentityError::Rejected { code, .. } if code == "UserNotConfirmedException")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResult {
    pub user_sub: String,
    pub email_verification_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    user_sub: String,
    user_confirmed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    message: Option<String>,
    #[serde(rename = "Message")]
    message_upper: Option<String>,
}

/// Parse a Cognito error body into a rejection
fn rejection_from(body: &str) -> IdentityError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            // __type may be namespaced: "com.amazonaws...#UsernameExistsException"
            let code = parsed
                .kind
                .as_deref()
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
                .unwrap_or_else(|| "UnknownError".to_string());
            let message = parsed
                .message
                .or(parsed.message_upper)
                .unwrap_or_else(|| code.clone());
            IdentityError::Rejected { code, message }
        }
        Err(_) => IdentityError::InvalidResponse(body.chars().take(200).collect()),
    }
}

pub struct IdentityClient {
    http: reqwest::Client,
    config: IdentityConfig,
}

impl IdentityClient {
    pub fn new(http: reqwest::Client, config: IdentityConfig) -> Self {
        Self { http, config }
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, body: serde_json::Value) -> Result<T, IdentityError> {
        if self.config.client_id.is_empty() {
            return Err(IdentityError::NotConfigured("AWS_COGNITO_CLIENT_ID"));
        }

        let response = self
            .http
            .post(self.config.endpoint())
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, action))
            .header(CONTENT_TYPE, AMZ_JSON)
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!("Identity provider {} failed with {}", action, status);
            return Err(rejection_from(&text));
        }

        // Some actions return an empty body on success
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpResult, IdentityError> {
        let response: SignUpResponse = self
            .call(
                "SignUp",
                json!({
                    "ClientId": self.config.client_id,
                    "Username": email,
                    "Password": password,
                    "UserAttributes": [
                        { "Name": "email", "Value": email },
                        { "Name": "name", "Value": name },
                    ],
                }),
            )
            .await?;

        tracing::info!("Identity sign-up succeeded for {}", email);
        Ok(SignUpResult {
            user_sub: response.user_sub,
            email_verification_required: !response.user_confirmed,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, IdentityError> {
        let response: InitiateAuthResponse = self
            .call(
                "InitiateAuth",
                json!({
                    "ClientId": self.config.client_id,
                    "AuthFlow": "USER_PASSWORD_AUTH",
                    "AuthParameters": { "USERNAME": email, "PASSWORD": password },
                }),
            )
            .await?;

        match response.authentication_result {
            Some(result) => Ok(AuthTokens {
                access_token: result.access_token,
                id_token: result.id_token,
                refresh_token: result.refresh_token,
                expires_in: result.expires_in,
            }),
            None => Err(IdentityError::Rejected {
                code: response.challenge_name.unwrap_or_else(|| "ChallengeRequired".to_string()),
                message: "Additional authentication challenge required".to_string(),
            }),
        }
    }

    pub async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "ConfirmSignUp",
                json!({ "ClientId": self.config.client_id, "Username": email, "ConfirmationCode": code }),
            )
            .await?;
        tracing::info!("Identity sign-up confirmed for {}", email);
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call("ForgotPassword", json!({ "ClientId": self.config.client_id, "Username": email }))
            .await?;
        tracing::info!("Password reset initiated for {}", email);
        Ok(())
    }

    pub async fn confirm_forgot_password(&self, email: &str, code: &str, new_password: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "ConfirmForgotPassword",
                json!({
                    "ClientId": self.config.client_id,
                    "Username": email,
                    "ConfirmationCode": code,
                    "Password": new_password,
                }),
            )
            .await?;
        tracing::info!("Password reset confirmed for {}", email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespaced_error_type() {
        let err = rejection_from(
            r#"{"__type":"com.amazonaws.cognito#UsernameExistsException","message":"User already exists"}"#,
        );
        match err {
            IdentityError::Rejected { code, message } => {
                assert_eq!(code, "UsernameExistsException");
                assert_eq!(message, "User already exists");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn classifies_credential_failures() {
        let err = rejection_from(r#"{"__type":"NotAuthorizedException","Message":"Incorrect username or password."}"#);
        assert!(err.is_credentials());
        assert!(!err.is_unconfirmed());

        let err = rejection_from(r#"{"__type":"UserNotConfirmedException","message":"User is not confirmed."}"#);
        assert!(err.is_unconfirmed());
    }

    #[test]
    fn non_json_error_is_invalid_response() {
        assert!(matches!(rejection_from("<html>502</html>"), IdentityError::InvalidResponse(_)));
    }
}
