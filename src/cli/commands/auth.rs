use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{output_success, unwrap_envelope};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the current server and store the token")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    #[command(about = "Show the account behind the stored token")]
    Whoami,

    #[command(about = "Forget the stored token")]
    Logout,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = load_session()?;
    let base = session.server_url();
    let client = reqwest::Client::new();

    match cmd {
        AuthCommands::Login { email, password } => {
            let body: Value = client
                .post(format!("{}/auth/login", base))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?
                .json()
                .await?;
            let data = unwrap_envelope(body)?;
            let token = data
                .get("token")
                .and_then(Value::as_str)
                .context("login response carried no token")?
                .to_string();

            session.token = Some(token);
            session.email = Some(email.clone());
            session.expires_at = data.get("expires_at").and_then(Value::as_i64);
            session.logged_in_at = Some(Utc::now());
            save_session(&session)?;

            output_success(
                output_format,
                &format!("Logged in as {}", email),
                Some(json!({ "roles": data["user"]["roles"], "server": base })),
            )
        }
        AuthCommands::Whoami => {
            let token = session.token.clone().context("Not logged in")?;
            let body: Value = client
                .get(format!("{}/api/auth/whoami", base))
                .bearer_auth(token)
                .send()
                .await?
                .json()
                .await?;
            let data = unwrap_envelope(body)?;
            output_success(
                output_format,
                "Current user",
                Some(json!({
                    "email": data["user"]["email"],
                    "roles": data["user"]["roles"],
                    "scope": data["scope"],
                })),
            )
        }
        AuthCommands::Logout => {
            session.clear_login();
            save_session(&session)?;
            output_success(output_format, "Logged out", None)
        }
    }
}
