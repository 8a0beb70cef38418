use crate::cli::{pool, utils::output_success, OutputFormat};
use crate::database::migrations;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = pool()?;
    migrations::run(&pool).await?;
    pool.close().await;

    output_success(&output_format, "Schema migrations applied", None)
}
