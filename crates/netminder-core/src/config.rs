//! Configuration for the netminder assistant
//!
//! Loaded from a TOML file with serde defaults, so a missing or partial
//! file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Top-level assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Where the orchestrator state is persisted
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// When true, confirmed/declined candidates are written back to the
    /// roster as official game replies
    #[serde(default)]
    pub live_replies: bool,

    /// Days of inactivity before a resting chat conversation is evicted
    #[serde(default = "default_conversation_ttl_days")]
    pub conversation_ttl_days: i64,

    /// Oracle model selection
    #[serde(default)]
    pub model: ModelConfig,

    /// Outbound SMS settings
    #[serde(default)]
    pub sms: SmsConfig,
}

/// Oracle model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model tier to use
    #[serde(default = "default_model")]
    pub default: String,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// SMS gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Master switch; when false, outbound texts are logged instead of sent
    #[serde(default = "default_sms_enabled")]
    pub enabled: bool,

    /// Environment variable containing the gateway account id
    #[serde(default = "default_account_env")]
    pub account_env: String,

    /// Environment variable containing the gateway auth token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Environment variable containing the sending phone number
    #[serde(default = "default_from_number_env")]
    pub from_number_env: String,
}

// Default value providers

fn default_state_path() -> PathBuf {
    PathBuf::from("data/assistant_state.json")
}

fn default_conversation_ttl_days() -> i64 {
    30
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_sms_enabled() -> bool {
    true
}

fn default_account_env() -> String {
    "TWILIO_ACCOUNT_ID".to_string()
}

fn default_token_env() -> String {
    "TWILIO_TOKEN".to_string()
}

fn default_from_number_env() -> String {
    "TWILIO_PHONE_NUMBER".to_string()
}

impl AssistantConfig {
    /// Load configuration from a TOML file, or use defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                crate::NetminderError::Config(format!("Failed to parse config file: {}", e))
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default configuration to the given path
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&Self::default()).map_err(|e| {
            crate::NetminderError::Config(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            live_replies: false,
            conversation_ttl_days: default_conversation_ttl_days(),
            model: ModelConfig::default(),
            sms: SmsConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: default_sms_enabled(),
            account_env: default_account_env(),
            token_env: default_token_env(),
            from_number_env: default_from_number_env(),
        }
    }
}
