//! Dashboard configuration.
//!
//! Precedence: defaults < TOML file (`DIVINE_CONFIG`, default `config/divine.toml`)
//! < environment (`DIVINE__PORT`, `DIVINE__GATEWAY__API_KEY`, ...).
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | DIVINE_CONFIG | config/divine | Config file path (extension optional). |
//! | DIVINE__LLM_MODE | live | `live` calls the AI service, `mock` serves canned payloads. |
//! | GEMINI_API_KEY / API_KEY | (none) | Credential used when `gateway.api_key` is unset. |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::gateway::prompts::{ModelTable, PromptTemplates};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_CONFIG_PATH: &str = "config/divine";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    60
}

fn default_request_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    #[default]
    Live,
    Mock,
}

/// Connection settings for the external AI service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Explicit key; falls back to `GEMINI_API_KEY`, then `API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub models: ModelTable,
    /// Seconds between polls of a long-running media job.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Polls before a media job is abandoned with a timeout.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            models: ModelTable::default(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the credential. `None` means every live call fails with `MissingApiKey`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("API_KEY").ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivineConfig {
    pub app_name: String,
    pub port: u16,
    #[serde(default)]
    pub llm_mode: LlmMode,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub prompts: PromptTemplates,
}

impl Default for DivineConfig {
    fn default() -> Self {
        Self {
            app_name: "Divine OS".to_string(),
            port: 3013,
            llm_mode: LlmMode::Live,
            gateway: GatewayConfig::default(),
            prompts: PromptTemplates::default(),
        }
    }
}

impl DivineConfig {
    /// Load from `DIVINE_CONFIG` (or `config/divine.toml`) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("DIVINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from an explicit file. A missing file is not an error; defaults apply.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("app_name", "Divine OS")?
            .set_default("port", 3013_i64)?
            .set_default("llm_mode", "live")?;

        let with_ext = path.with_extension("toml");
        let builder = if path.is_file() {
            builder.add_source(config::File::from(path))
        } else if with_ext.is_file() {
            builder.add_source(config::File::from(with_ext.as_path()))
        } else {
            builder
        };

        builder
            .add_source(config::Environment::with_prefix("DIVINE").separator("__"))
            .build()?
            .try_deserialize()
    }
}
