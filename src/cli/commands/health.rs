use serde_json::json;

use crate::cli::{pool, utils::output_success, OutputFormat};
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = pool()?;
    DatabaseManager::health_check(&pool).await?;
    pool.close().await;

    output_success(&output_format, "Database reachable", Some(json!({ "database": "ok" })))
}
