//! Application configuration, read from a TOML file.

use crate::error::AppError;
use event_photos::DEFAULT_UPLOADED_ENDPOINTS;
use photoshare_auth::GateConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "photoshare.toml";
const UPLOAD_ENDPOINT: &str = "/functions/v1/mobile-upload";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
    /// Absolute upload URL; derived from `api_base_url` when unset
    pub upload_url: Option<String>,
    /// Uploaded-id endpoint templates containing `{event_id}`, tried in order
    pub uploaded_endpoints: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub identity_max_attempts: u32,
    pub identity_retry_delay_ms: u64,
    pub sweep_interval_secs: u64,
    pub sweep_retry_delay_secs: u64,
    pub upload_pause_ms: u64,
    pub database_path: PathBuf,
    pub media_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:54321".to_string(),
            api_key: None,
            upload_url: None,
            uploaded_endpoints: DEFAULT_UPLOADED_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fetch_timeout_secs: 5,
            identity_max_attempts: 30,
            identity_retry_delay_ms: 5000,
            sweep_interval_secs: 30,
            sweep_retry_delay_secs: 60,
            upload_pause_ms: 500,
            database_path: PathBuf::from("./data/photoshare.db"),
            media_dir: PathBuf::from("./media"),
        }
    }
}

impl AppConfig {
    /// Loads the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(AppError::Filesystem(e)),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, AppError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.api_base_url.trim().is_empty() {
            return Err(AppError::Config("api_base_url must not be empty".to_string()));
        }
        if let Some(template) = self
            .uploaded_endpoints
            .iter()
            .find(|t| !t.contains("{event_id}"))
        {
            return Err(AppError::Config(format!(
                "uploaded endpoint '{}' has no {{event_id}} placeholder",
                template
            )));
        }
        Ok(())
    }

    pub fn upload_url(&self) -> String {
        self.upload_url.clone().unwrap_or_else(|| {
            format!("{}{}", self.api_base_url.trim_end_matches('/'), UPLOAD_ENDPOINT)
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn sweep_retry_delay(&self) -> Duration {
        Duration::from_secs(self.sweep_retry_delay_secs)
    }

    pub fn upload_pause(&self) -> Duration {
        Duration::from_millis(self.upload_pause_ms)
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            max_attempts: self.identity_max_attempts,
            retry_delay: Duration::from_millis(self.identity_retry_delay_ms),
        }
    }
}
