pub mod db;

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

/// Shared secret the spawned server verifies webhook signatures with
pub const WEBHOOK_SECRET: &str = "whsec_integration_test";

/// Unreachable on purpose: the pool connects lazily
const NO_DATABASE_URL: &str = "postgres://postgres@127.0.0.1:1/template_store_test";

/// A server process owned by one test. Dropping it kills the process.
pub struct TestServer {
    #[allow(dead_code)]
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(overrides: &[(&str, &str)]) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // No database is required by default: anything that needs it answers
        // 503 while the routing, auth and validation layers are still exercised.
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_template-store-api"));
        cmd.env("STORE_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("DATABASE_URL", NO_DATABASE_URL)
            .env("DATABASE_CONNECTION_TIMEOUT", "2")
            .env("DATABASE_RUN_MIGRATIONS", "false")
            .env("DEBUG_USER_ID", "")
            .env("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET)
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (key, value) in overrides {
            cmd.env(key, value);
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Server with no reachable database
#[allow(dead_code)]
pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(&[]).await
}

/// Server with extra environment on top of the defaults
pub async fn spawn_server_with(overrides: &[(&str, &str)]) -> Result<TestServer> {
    let server = TestServer::spawn(overrides)?;
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// Asserts the API error shape and returns the message
#[allow(dead_code)]
pub async fn error_message(res: reqwest::Response) -> Result<String> {
    let body = res.json::<serde_json::Value>().await?;
    let message = body
        .get("error")
        .and_then(|v| v.as_str())
        .with_context(|| format!("no error field in {}", body))?;
    Ok(message.to_string())
}
