//! Application state shared across handlers

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::integrations::{email, IdentityClient, Mailer, PaymentClient, StorageClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    config: &'static AppConfig,
    verifier: TokenVerifier,
    identity: IdentityClient,
    payments: PaymentClient,
    storage: StorageClient,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Wire every external client from configuration
    pub fn new(pool: PgPool, config: &'static AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("template-store-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mailer = email::mailer_from_config(http.clone(), &config.email);
        Ok(Self::with_mailer(pool, config, http, mailer))
    }

    pub fn with_mailer(
        pool: PgPool,
        config: &'static AppConfig,
        http: reqwest::Client,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                config,
                verifier: TokenVerifier::new(http.clone(), config.identity.clone()),
                identity: IdentityClient::new(http.clone(), config.identity.clone()),
                payments: PaymentClient::new(http, config.stripe.clone()),
                storage: StorageClient::new(config.storage.clone()),
                mailer,
            }),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    pub fn config(&self) -> &'static AppConfig {
        self.inner.config
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.inner.verifier
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    pub fn payments(&self) -> &PaymentClient {
        &self.inner.payments
    }

    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    pub fn mailer(&self) -> Arc<dyn Mailer> {
        self.inner.mailer.clone()
    }
}
