use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::server::http::RetryPolicy;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Root folder shown when the client has not navigated anywhere yet.
    pub google_drive_folder_id: Option<String>,

    /// Base64-encoded service-account JSON key.
    pub google_service_account_key: Option<String>,

    pub turso_connection_url: Option<String>,
    pub turso_auth_token: Option<String>,

    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    log_dir: Option<String>,
    google_drive_folder_id: Option<String>,
    google_service_account_key: Option<String>,
    turso_connection_url: Option<String>,
    turso_auth_token: Option<String>,
    request_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    max_upload_bytes: Option<usize>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

/// Empty strings in the environment count as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_dir: default_log_dir(),
            google_drive_folder_id: None,
            google_service_account_key: None,
            turso_connection_url: None,
            turso_auth_token: None,
            request_timeout_secs: None,
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Self::layered(config_path, env_config)
    }

    fn layered(config_path: Option<&str>, env_config: PartialServerConfig) -> Result<Self, String> {
        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Merge: environment overrides file
        let final_config = ServerConfig {
            listen_addr: env_config.listen_addr.or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            log_dir: env_config.log_dir.or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            google_drive_folder_id: non_empty(env_config.google_drive_folder_id)
                .or(non_empty(file_config.google_drive_folder_id)),
            google_service_account_key: non_empty(env_config.google_service_account_key)
                .or(non_empty(file_config.google_service_account_key)),
            turso_connection_url: non_empty(env_config.turso_connection_url)
                .or(non_empty(file_config.turso_connection_url)),
            turso_auth_token: non_empty(env_config.turso_auth_token)
                .or(non_empty(file_config.turso_auth_token)),
            request_timeout_secs: env_config.request_timeout_secs.or(file_config.request_timeout_secs),
            max_retries: env_config.max_retries.or(file_config.max_retries)
                .unwrap_or(0),
            retry_backoff_ms: env_config.retry_backoff_ms.or(file_config.retry_backoff_ms)
                .unwrap_or_else(default_retry_backoff_ms),
            max_upload_bytes: env_config.max_upload_bytes.or(file_config.max_upload_bytes)
                .unwrap_or_else(default_max_upload_bytes),
        };

        Ok(final_config)
    }

    /// The SQL-over-HTTP endpoint, with `libsql://` rewritten to `https://`.
    /// `None` unless both the URL and the token are present.
    pub fn tag_store_endpoint(&self) -> Option<(String, String)> {
        let url = self.turso_connection_url.as_deref()?;
        let token = self.turso_auth_token.clone()?;
        let url = match url.strip_prefix("libsql://") {
            Some(rest) => format!("https://{rest}"),
            None => url.to_string(),
        };
        Some((url, token))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}
