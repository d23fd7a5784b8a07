use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::verify_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::user::{CreateUserInput, User};
use crate::database::DatabaseManager;
use crate::services::UserService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an account")]
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, help = "Role: admin, prodi, dosen or student (repeatable)")]
        role: Vec<String>,
        #[arg(long, help = "Program studi code, required for prodi accounts")]
        program_studi: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
    },

    #[command(about = "Show whether an account can log in")]
    Check {
        #[arg(long)]
        email: String,
        #[arg(long, help = "Also verify this password against the stored hash")]
        password: Option<String>,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;

    match cmd {
        UserCommands::Create {
            email,
            password,
            role,
            program_studi,
            full_name,
        } => {
            let program_studi_id = match program_studi {
                Some(kode) => {
                    let id: Option<Uuid> =
                        sqlx::query_scalar("SELECT id FROM program_studi WHERE kode_program_studi = $1")
                            .bind(&kode)
                            .fetch_optional(&pool)
                            .await?;
                    Some(id.with_context(|| format!("Program studi '{}' not found", kode))?)
                }
                None => None,
            };

            let input = CreateUserInput {
                email: Some(email),
                password: Some(password),
                full_name,
                roles: Some(role),
                is_active: Some(true),
                program_studi_id,
            };
            let user = UserService::new(pool)
                .create(input)
                .await
                .map_err(|e| anyhow::anyhow!(crate::error::ApiError::from(e).to_json()))?;

            output_success(
                output_format,
                &format!("User '{}' created", user.email),
                Some(json!({ "id": user.id, "roles": user.roles, "program_studi_id": user.program_studi_id })),
            )
        }
        UserCommands::Check { email, password } => {
            let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(&email)
                .fetch_optional(&pool)
                .await?;
            let user = user.with_context(|| format!("User '{}' not found", email))?;

            let password_ok = match password {
                Some(password) => Some(verify_password(&password, &user.password_hash)?),
                None => None,
            };

            output_success(
                output_format,
                &format!("User '{}' found", user.email),
                Some(json!({
                    "id": user.id,
                    "is_active": user.is_active,
                    "roles": user.role_set(),
                    "program_studi_id": user.program_studi_id,
                    "password_ok": password_ok,
                })),
            )
        }
    }
}
