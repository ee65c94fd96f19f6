// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Every section is optional; defaults point at a local chat API and the hosted image store
use crate::paths;
use crate::session::DEFAULT_BOT_NAME;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_suggest_path")]
    pub suggest_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Storefront the assistant answers for, sent with every chat request
    #[serde(default = "default_domain")]
    pub domain: String,
    /// userId sent when no user name is known
    #[serde(default = "default_guest_id")]
    pub guest_id: String,
    /// 0 disables the timeout and lets a stalled request stay pending
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_url")]
    pub url: String,
    #[serde(default = "default_upload_preset")]
    pub preset: String,
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
}

// Custom Debug impl to redact the unsigned upload preset
impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("url", &self.url)
            .field("preset", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    /// Minimum milliseconds between revealed characters
    #[serde(default = "default_reveal_interval_ms")]
    pub reveal_interval_ms: u64,
    /// Reveal driver cadence in milliseconds
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_chat_path() -> String {
    "/chat".to_string()
}

fn default_suggest_path() -> String {
    "/generate_questions".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_domain() -> String {
    "https://klassy.com.bd/".to_string()
}

fn default_guest_id() -> String {
    "guest".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_upload_url() -> String {
    "https://api.cloudinary.com/v1_1/dddvfrdb1/image/upload".to_string()
}

fn default_upload_preset() -> String {
    "lt2tb7ci".to_string()
}

fn default_upload_timeout_secs() -> u64 {
    30
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}

fn default_reveal_interval_ms() -> u64 {
    2
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_scroll_delay_ms() -> u64 {
    100
}

fn default_storage_path() -> String {
    paths::data_dir().to_string_lossy().to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            suggest_path: default_suggest_path(),
            health_path: default_health_path(),
            domain: default_domain(),
            guest_id: default_guest_id(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url: default_upload_url(),
            preset: default_upload_preset(),
            timeout_secs: default_upload_timeout_secs(),
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            reveal_interval_ms: default_reveal_interval_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            scroll_delay_ms: default_scroll_delay_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl ApiConfig {
    /// Join a configured path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl UploadConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl WidgetConfig {
    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        // tokio intervals reject a zero period
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
}

fn expand_tilde(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs
                .home_dir()
                .join(stripped)
                .to_string_lossy()
                .to_string();
        } else {
            tracing::warn!(
                path = %path,
                "Failed to expand tilde in path: could not determine home directory"
            );
        }
    }
    path.to_string()
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. SHOPCHAT_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/shopchat/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("SHOPCHAT_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration from config.toml with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if let Some(config_path) = Self::find_config_file() {
            tracing::info!(
                path = %config_path.display(),
                "Loading configuration from file"
            );
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.storage.path = expand_tilde(&config.storage.path);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Config>(content).context("Invalid configuration")
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SHOPCHAT_API_URL") {
            self.api.base_url = val;
        }
        if let Ok(val) = std::env::var("SHOPCHAT_DOMAIN") {
            self.api.domain = val;
        }
        if let Ok(val) = std::env::var("SHOPCHAT_GUEST_ID") {
            self.api.guest_id = val;
        }
        if let Ok(val) = std::env::var("SHOPCHAT_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = val.parse().with_context(|| {
                format!(
                    "SHOPCHAT_REQUEST_TIMEOUT_SECS must be a valid number, got: {}",
                    val
                )
            })?;
        }
        if let Ok(val) = std::env::var("SHOPCHAT_UPLOAD_URL") {
            self.upload.url = val;
        }
        if let Ok(val) = std::env::var("SHOPCHAT_UPLOAD_PRESET") {
            self.upload.preset = val;
        }
        if let Ok(val) = std::env::var("SHOPCHAT_DATA_DIR") {
            self.storage.path = val;
        }
        if let Ok(val) = std::env::var("SHOPCHAT_BOT_NAME") {
            self.widget.bot_name = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url is required (set in config.toml or SHOPCHAT_API_URL)");
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "api.base_url must start with http:// or https://, got: {}",
                self.api.base_url
            );
        }
        if self.api.guest_id.trim().is_empty() {
            anyhow::bail!("api.guest_id cannot be empty");
        }
        if self.widget.bot_name.trim().is_empty() {
            anyhow::bail!("widget.bot_name cannot be empty");
        }
        Ok(())
    }
}
