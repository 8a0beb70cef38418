#![allow(dead_code)]

// Database-backed test context. Tests that need PostgreSQL call
// `TestDatabase::connect()` and return early when TEST_DATABASE_URL is unset.

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;
use uuid::Uuid;

use template_store_api::database::migrations;
use template_store_api::database::models::{Order, Template, User, UserRole};
use template_store_api::integrations::email::LogMailer;
use template_store_api::services::{
    order_service::NewOrder, template_service::TemplateInput, user_service::NewUser, CheckoutService,
    OrderService, TemplateService, UserService,
};

use super::{spawn_server_with, TestServer};

static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub struct TestDatabase {
    pub url: String,
    pub pool: PgPool,
}

impl TestDatabase {
    /// None when no test database is configured
    pub async fn connect() -> Result<Option<Self>> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return Ok(None);
        };

        // Concurrent CREATE ... IF NOT EXISTS can still race, so migrate once per binary
        MIGRATED
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new().max_connections(1).connect(&url).await?;
                migrations::run(&pool).await?;
                pool.close().await;
                anyhow::Ok(())
            })
            .await?;

        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(&url)
            .await
            .context("failed to connect to TEST_DATABASE_URL")?;
        Ok(Some(Self { url, pool }))
    }

    pub async fn create_user(&self, role: UserRole) -> Result<User> {
        let user = UserService::new(self.pool.clone())
            .create(NewUser {
                email: format!("test_{}@example.com", Uuid::new_v4().simple()),
                name: format!("Test {}", role),
                identity_subject: None,
                password_hash: None,
                role,
            })
            .await?;
        Ok(user)
    }

    pub async fn create_template(&self, category_id: Option<Uuid>) -> Result<Template> {
        let template = TemplateService::new(self.pool.clone())
            .create(&TemplateInput {
                name: Some(format!("Template {}", Uuid::new_v4().simple())),
                category_id,
                price: Some(Decimal::new(1999, 2)),
                file_url: Some("https://cdn.example.com/files/invoice.docx".to_string()),
                ..Default::default()
            })
            .await?;
        Ok(template)
    }

    pub async fn create_pending_order(&self, user: &User, template: &Template) -> Result<Order> {
        let order = OrderService::new(self.pool.clone())
            .create_pending(&NewOrder {
                user_id: user.id,
                template_id: template.id,
                amount: template.price,
                checkout_session_id: format!("cs_test_{}", Uuid::new_v4().simple()),
                payment_intent_id: Some(format!("pi_test_{}", Uuid::new_v4().simple())),
                metadata: None,
            })
            .await?;
        Ok(order)
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.pool.clone(), Arc::new(LogMailer), "http://localhost:3000".to_string())
    }

    /// Server on this database, signed in as `user` through DEBUG_USER_ID
    pub async fn server_as(&self, user: &User) -> Result<TestServer> {
        let user_id = user.id.to_string();
        spawn_server_with(&[("DATABASE_URL", self.url.as_str()), ("DEBUG_USER_ID", user_id.as_str())]).await
    }
}
