use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Current server and login, persisted between invocations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub email: Option<String>,
    pub expires_at: Option<i64>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl SessionConfig {
    pub fn server_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn clear_login(&mut self) {
        self.token = None;
        self.email = None;
        self.expires_at = None;
        self.logged_in_at = None;
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("OBE_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("obe").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<SessionConfig> {
    let session_file = get_config_dir()?.join("session.json");

    if !session_file.exists() {
        return Ok(SessionConfig::default());
    }

    let content = fs::read_to_string(session_file)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_session(config: &SessionConfig) -> anyhow::Result<()> {
    let session_file = get_config_dir()?.join("session.json");
    fs::write(session_file, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_and_logout() {
        let mut session = SessionConfig {
            token: Some("t".into()),
            email: Some("a@b.id".into()),
            ..Default::default()
        };
        assert_eq!(session.server_url(), DEFAULT_SERVER_URL);
        session.clear_login();
        assert!(session.token.is_none());
        assert!(session.email.is_none());
    }
}
