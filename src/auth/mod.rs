use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::IdentityConfig;

/// Claims carried by an identity-provider access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub iss: String,
    pub token_use: String,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub exp: i64,
    pub iat: Option<i64>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authorization token provided")]
    MissingToken,

    #[error("authorization header must use the Bearer scheme")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("no signing key for kid {0}")]
    UnknownKey(String),

    #[error("identity provider not configured")]
    NotConfigured,

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken(err.to_string())
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let token = value.strip_prefix("Bearer ").ok_or(AuthError::MalformedHeader)?.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Checks beyond signature, expiry and issuer
fn check_claims(claims: &AccessClaims, client_id: &str) -> Result<(), AuthError> {
    if claims.token_use != "access" {
        return Err(AuthError::InvalidToken(format!("token_use is {}", claims.token_use)));
    }
    if claims.client_id.as_deref() != Some(client_id) {
        return Err(AuthError::InvalidToken("token issued for another client".to_string()));
    }
    Ok(())
}

/// Verifies access tokens against the user pool's published key set.
/// Keys are cached; an unknown `kid` refreshes the cache once.
pub struct TokenVerifier {
    http: reqwest::Client,
    config: IdentityConfig,
    keys: RwLock<Option<JwkSet>>,
}

impl TokenVerifier {
    pub fn new(http: reqwest::Client, config: IdentityConfig) -> Self {
        Self {
            http,
            config,
            keys: RwLock::new(None),
        }
    }

    async fn fetch_keys(&self) -> Result<(), AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!("Fetching signing keys from {}", url);
        let set = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        tracing::info!("Loaded {} identity signing keys", set.keys.len());
        *self.keys.write().await = Some(set);
        Ok(())
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cached = self.keys.read().await;
            if let Some(jwk) = cached.as_ref().and_then(|set| set.find(kid)) {
                return Ok(DecodingKey::from_jwk(jwk)?);
            }
        }

        self.fetch_keys().await?;

        let cached = self.keys.read().await;
        let jwk = cached
            .as_ref()
            .and_then(|set| set.find(kid))
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }

    pub async fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        if self.config.user_pool_id.is_empty() || self.config.client_id.is_empty() {
            return Err(AuthError::NotConfigured);
        }

        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer()]);
        // access tokens carry client_id instead of aud
        validation.validate_aud = false;

        let claims = decode::<AccessClaims>(token, &key, &validation)?.claims;
        check_claims(&claims, &self.config.client_id)?;
        Ok(claims)
    }
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
