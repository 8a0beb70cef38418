use anyhow::{anyhow, Context};
use clap::Subcommand;
use serde_json::json;

use crate::cli::{
    pool,
    utils::{output_empty_collection, output_success},
    OutputFormat,
};
use crate::database::models::UserRole;
use crate::services::UserService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Set a user's role")]
    Promote {
        #[arg(help = "Email address of the user")]
        email: String,
        #[arg(long, default_value = "admin", help = "Role to grant (user, author, admin)")]
        role: String,
    },

    #[command(about = "List users, newest first")]
    List {
        #[arg(long, default_value_t = 50, help = "Maximum number of users to print")]
        limit: i64,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let users = UserService::new(pool()?);

    match cmd {
        UserCommands::Promote { email, role } => {
            let role: UserRole = role.parse()?;
            let user = users
                .get_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("no user with email {}", email))?;

            let user = users
                .set_role(user.id, role)
                .await
                .with_context(|| format!("failed to update role for {}", email))?;

            output_success(
                &output_format,
                &format!("{} is now {}", user.email, user.role),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::List { limit } => {
            let list = users.list(limit.max(1), 0).await?;
            if list.is_empty() {
                return output_empty_collection(&output_format, "users", "No users found");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "users": list, "count": list.len() }))?);
                }
                OutputFormat::Text => {
                    println!("{:<36}  {:<8}  {:<11}  {}", "ID", "ROLE", "STATUS", "EMAIL");
                    for user in &list {
                        println!("{:<36}  {:<8}  {:<11}  {}", user.id, user.role, user.status, user.email);
                    }
                }
            }
            Ok(())
        }
    }
}
