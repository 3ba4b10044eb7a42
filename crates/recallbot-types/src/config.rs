//! Configuration types for recallbot.
//!
//! `AppConfig` is built once at startup (secrets from the environment,
//! tunables from an optional `recallbot.toml`) and handed to each component
//! explicitly. Sections that hold credentials do not derive `Debug`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MEMORY_BASE_URL: &str = "https://api.recallrai.com";

/// Fully resolved configuration for both agents.
#[derive(Clone)]
pub struct AppConfig {
    pub openai: OpenAiSettings,
    pub memory: MemorySettings,
    /// Present only when the WhatsApp variables are set.
    pub whatsapp: Option<WhatsAppSettings>,
    /// Present only when the email provider variables are set.
    pub email: Option<EmailSettings>,
    pub agent: AgentSettings,
    pub server: ServerSettings,
}

impl AppConfig {
    /// WhatsApp settings, required by the webhook server.
    pub fn require_whatsapp(&self) -> Result<&WhatsAppSettings, ConfigError> {
        self.whatsapp
            .as_ref()
            .ok_or(ConfigError::MissingSection("WATI_API_TOKEN and WATI_BASE_URL"))
    }

    /// Email settings, required by the email agent.
    pub fn require_email(&self) -> Result<&EmailSettings, ConfigError> {
        self.email
            .as_ref()
            .ok_or(ConfigError::MissingSection("ACS_EMAIL, ACS_KEY and ACS_ENDPOINT"))
    }

    /// The fixed memory user the email agent talks as.
    pub fn require_memory_user(&self) -> Result<&str, ConfigError> {
        self.memory
            .user_id
            .as_deref()
            .ok_or(ConfigError::MissingVar("RECALLRAI_USER_ID".to_string()))
    }
}

/// Chat completion provider credentials.
#[derive(Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
}

/// Long-term memory provider credentials.
#[derive(Clone)]
pub struct MemorySettings {
    pub api_key: String,
    pub project_id: String,
    pub base_url: String,
    pub user_id: Option<String>,
}

/// WhatsApp messaging provider credentials and sender allow-list.
#[derive(Clone)]
pub struct WhatsAppSettings {
    pub api_token: String,
    /// Tenant API root, e.g. `https://live-server-1234.wati.io/api/v1`.
    pub base_url: String,
    pub allowed_phone_numbers: Vec<String>,
}

impl WhatsAppSettings {
    pub fn is_allowed(&self, phone: &str) -> bool {
        self.allowed_phone_numbers.iter().any(|p| p == phone)
    }
}

/// Email provider (Azure Communication Services) credentials.
#[derive(Clone)]
pub struct EmailSettings {
    pub sender_address: String,
    /// Base64-encoded access key.
    pub access_key: String,
    pub endpoint: String,
}

/// Non-secret agent tunables. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f64,
    /// Token cap for the single-shot support reply.
    pub max_tokens: u32,
    /// Token cap for interactive chat replies.
    pub chat_max_tokens: u32,
    pub auto_process_after_minutes: u32,
    /// Suffix of per-contact memory user ids: `whatsapp_{phone}_{namespace}`.
    pub memory_user_namespace: String,
    pub history_page_size: u32,
    pub history_max_pages: u32,
    pub email_poll_interval_ms: u64,
    pub email_poll_max_attempts: u32,
    /// Replaces the built-in support persona. `{memories}` is substituted
    /// with the context summary.
    pub persona_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            chat_max_tokens: 1024,
            auto_process_after_minutes: 5,
            memory_user_namespace: "prod".to_string(),
            history_page_size: 100,
            history_max_pages: 5,
            email_poll_interval_ms: 1000,
            email_poll_max_attempts: 60,
            persona_prompt: None,
        }
    }
}

/// HTTP listener settings for the webhook server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Shape of the optional `recallbot.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub agent: AgentSettings,
    pub server: ServerSettings,
}

/// Errors raised while assembling [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("missing configuration: set {0}")]
    MissingSection(&'static str),
}
