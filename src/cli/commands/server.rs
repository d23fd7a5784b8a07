use std::time::Duration;

use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::config::{load_session, save_session};
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health from the /health endpoint")]
    Health {
        #[arg(long, help = "Server URL (defaults to the current server)")]
        url: Option<String>,
    },

    #[command(about = "Set the server used by later commands")]
    Use {
        #[arg(help = "Server URL")]
        url: String,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health { url } => {
            let base = match url {
                Some(url) => url,
                None => load_session()?.server_url(),
            };
            let response = reqwest::Client::new()
                .get(format!("{}/health", base.trim_end_matches('/')))
                .timeout(Duration::from_secs(5))
                .send()
                .await?;
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);

            if status.is_success() {
                output_success(output_format, &format!("{} is healthy", base), Some(json!({ "health": body })))
            } else {
                output_error(output_format, &format!("{} answered {}", base, status))?;
                Err(anyhow::anyhow!("server unhealthy"))
            }
        }
        ServerCommands::Use { url } => {
            let mut session = load_session()?;
            let url = url.trim_end_matches('/').to_string();
            if session.server_url.as_deref() != Some(url.as_str()) {
                session.clear_login();
            }
            session.server_url = Some(url.clone());
            save_session(&session)?;
            output_success(output_format, &format!("Using server {}", url), None)
        }
    }
}
