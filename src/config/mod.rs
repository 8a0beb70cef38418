use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub identity: IdentityConfig,
    pub stripe: StripeConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    /// Development-only: requests are authenticated as this user id
    pub debug_user_id: Option<String>,
    pub min_password_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub webhook_tolerance_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub sendgrid_api_key: String,
    pub from_email: String,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub download_url_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") | Ok("release") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("STORE_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("DEBUG_USER_ID") {
            if !v.trim().is_empty() {
                self.security.debug_user_id = Some(v.trim().to_string());
            }
        }

        // Identity provider
        if let Ok(v) = env::var("AWS_COGNITO_REGION") {
            self.identity.region = v;
        }
        if let Ok(v) = env::var("AWS_COGNITO_USER_POOL_ID") {
            self.identity.user_pool_id = v;
        }
        if let Ok(v) = env::var("AWS_COGNITO_CLIENT_ID") {
            self.identity.client_id = v;
        }

        // Payments
        if let Ok(v) = env::var("STRIPE_API_KEY") {
            self.stripe.secret_key = v;
        }
        if let Ok(v) = env::var("STRIPE_WEBHOOK_SECRET") {
            self.stripe.webhook_secret = v;
        }
        if let Ok(v) = env::var("STRIPE_SUCCESS_URL") {
            self.stripe.success_url = v;
        }
        if let Ok(v) = env::var("STRIPE_CANCEL_URL") {
            self.stripe.cancel_url = v;
        }
        if let Ok(v) = env::var("STRIPE_CURRENCY") {
            self.stripe.currency = v.to_lowercase();
        }
        if let Ok(v) = env::var("STRIPE_WEBHOOK_TOLERANCE_SECS") {
            self.stripe.webhook_tolerance_secs = v.parse().unwrap_or(self.stripe.webhook_tolerance_secs);
        }

        // Email
        if let Ok(v) = env::var("SENDGRID_API_KEY") {
            self.email.sendgrid_api_key = v;
        }
        if let Ok(v) = env::var("SENDGRID_FROM_EMAIL") {
            self.email.from_email = v;
        }
        if let Ok(v) = env::var("FRONTEND_URL") {
            self.email.frontend_url = v;
        }

        // Object storage
        if let Ok(v) = env::var("AWS_S3_BUCKET") {
            self.storage.bucket = v;
        }
        if let Ok(v) = env::var("AWS_REGION") {
            self.storage.region = v;
        }
        if let Ok(v) = env::var("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = v;
        }
        if let Ok(v) = env::var("AWS_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = v;
        }
        if let Ok(v) = env::var("STORAGE_DOWNLOAD_URL_TTL_SECS") {
            self.storage.download_url_ttl_secs = v.parse().unwrap_or(self.storage.download_url_ttl_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                url: "postgres://postgres@localhost:5432/template_store".to_string(),
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 100,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                debug_user_id: None,
                min_password_length: 8,
            },
            identity: IdentityConfig::default_region(),
            stripe: StripeConfig::localhost(),
            email: EmailConfig::localhost(),
            storage: StorageConfig::default_region(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: "postgres://postgres@localhost:5432/template_store".to_string(),
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                debug_user_id: None,
                min_password_length: 8,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: "postgres://postgres@localhost:5432/template_store".to_string(),
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                default_page_size: 50,
                max_page_size: 100,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                debug_user_id: None,
                min_password_length: 10,
            },
            ..Self::development()
        }
    }

    /// The development bypass only exists outside staging/production.
    pub fn debug_user_id(&self) -> Option<&str> {
        match self.environment {
            Environment::Development => self.security.debug_user_id.as_deref(),
            _ => None,
        }
    }
}

impl IdentityConfig {
    fn default_region() -> Self {
        Self {
            region: "us-east-1".to_string(),
            user_pool_id: String::new(),
            client_id: String::new(),
        }
    }

    /// Token issuer, also the base of the JWKS document URL
    pub fn issuer(&self) -> String {
        format!("https://cognito-idp.{}.amazonaws.com/{}", self.region, self.user_pool_id)
    }

    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }

    pub fn endpoint(&self) -> String {
        format!("https://cognito-idp.{}.amazonaws.com/", self.region)
    }
}

impl StripeConfig {
    fn localhost() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            success_url: "http://localhost:3000/payment/success".to_string(),
            cancel_url: "http://localhost:3000/payment/cancel".to_string(),
            currency: "usd".to_string(),
            webhook_tolerance_secs: 300,
        }
    }
}

impl EmailConfig {
    fn localhost() -> Self {
        Self {
            sendgrid_api_key: String::new(),
            from_email: "noreply@templatestore.com".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl StorageConfig {
    fn default_region() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            download_url_ttl_secs: 3600,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
