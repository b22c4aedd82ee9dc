//! Connection settings: optional TOML file, overridden by flags and environment.

use clap::Args;
use rc_client::ClientConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Flags take precedence over the config file; each falls back to its env var.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Rocket.Chat server URL, e.g. https://chat.example.com
    #[arg(long, env = "ROCKETCHAT_URL")]
    pub server_url: Option<String>,
    /// Username for password login.
    #[arg(long, env = "ROCKETCHAT_USERNAME")]
    pub username: Option<String>,
    /// Password for password login.
    #[arg(long, env = "ROCKETCHAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// User id of a pre-issued personal access token.
    #[arg(long, env = "ROCKETCHAT_USER_ID")]
    pub user_id: Option<String>,
    /// Pre-issued personal access token; skips login when paired with --user-id.
    #[arg(long, env = "ROCKETCHAT_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
}

impl AppConfig {
    pub async fn load(path: Option<&Path>, args: ConnectionArgs) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let contents = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
                toml::from_str(&contents)
                    .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?
            }
            None => AppConfig::default(),
        };

        cfg.apply_args(args);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_args(&mut self, args: ConnectionArgs) {
        let server = &mut self.server;
        if let Some(v) = non_blank(args.server_url) {
            server.url = v;
        }
        if let Some(v) = non_blank(args.username) {
            server.username = Some(v);
        }
        if let Some(v) = non_blank(args.password) {
            server.password = Some(v);
        }
        if let Some(v) = non_blank(args.user_id) {
            server.user_id = Some(v);
        }
        if let Some(v) = non_blank(args.auth_token) {
            server.auth_token = Some(v);
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.server.url.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "server url is required (--server-url, ROCKETCHAT_URL or server.url)"
            ));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.server.url.clone(),
            username: self.server.username.clone(),
            password: self.server.password.clone(),
            user_id: self.server.user_id.clone(),
            auth_token: self.server.auth_token.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
