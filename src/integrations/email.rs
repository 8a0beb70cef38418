//! Transactional email (SendGrid v3).

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::config::EmailConfig;

const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

pub struct SendGridMailer {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
}

impl SendGridMailer {
    pub fn new(http: reqwest::Client, api_key: String, from_email: String) -> Self {
        Self { http, api_key, from_email }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from_email },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html }],
        });

        let response = self
            .http
            .post(SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Api { status: status.as_u16(), body });
        }

        tracing::info!("Email sent to {}: {}", message.to, message.subject);
        Ok(())
    }
}

/// Used when no API key is configured
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        tracing::info!("Email delivery disabled, skipping '{}' to {}", message.subject, message.to);
        Ok(())
    }
}

pub fn mailer_from_config(http: reqwest::Client, config: &EmailConfig) -> Arc<dyn Mailer> {
    if config.sendgrid_api_key.is_empty() {
        tracing::warn!("SENDGRID_API_KEY not set, outgoing email will only be logged");
        Arc::new(LogMailer)
    } else {
        Arc::new(SendGridMailer::new(
            http,
            config.sendgrid_api_key.clone(),
            config.from_email.clone(),
        ))
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn welcome(to: &str, name: &str, frontend_url: &str) -> EmailMessage {
    let name = escape_html(name);
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome to Template Store".to_string(),
        html: format!(
            "<h1>Welcome, {name}!</h1>\
             <p>Your account is ready. Browse the catalogue at \
             <a href=\"{url}/templates\">{url}/templates</a>.</p>",
            name = name,
            url = frontend_url,
        ),
    }
}

pub fn password_reset_requested(to: &str, frontend_url: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Password reset requested".to_string(),
        html: format!(
            "<p>A password reset was requested for your account. Enter the code we sent \
             you at <a href=\"{url}/reset-password\">{url}/reset-password</a>.</p>\
             <p>If this wasn't you, you can ignore this email.</p>",
            url = frontend_url,
        ),
    }
}

pub fn order_confirmation(
    to: &str,
    name: &str,
    template_name: &str,
    amount: Decimal,
    order_id: uuid::Uuid,
    frontend_url: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Order confirmation: {}", template_name),
        html: format!(
            "<h1>Thanks for your purchase, {name}!</h1>\
             <p>Template: <strong>{template}</strong><br>Amount: ${amount}<br>Order: {order}</p>\
             <p>Download it from <a href=\"{url}/profile/orders\">your orders</a>.</p>",
            name = escape_html(name),
            template = escape_html(template_name),
            amount = amount.round_dp(2),
            order = order_id,
            url = frontend_url,
        ),
    }
}
