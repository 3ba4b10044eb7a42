//! Configuration loader for recallbot.
//!
//! Credentials come from the process environment (after loading `.env` when
//! present). Non-secret tunables come from an optional TOML file. The file
//! falls back to defaults when it is missing or malformed.

use std::path::{Path, PathBuf};

use recallbot_types::config::{
    AppConfig, ConfigError, DEFAULT_MEMORY_BASE_URL, DEFAULT_OPENAI_BASE_URL, EmailSettings,
    FileConfig, MemorySettings, OpenAiSettings, WhatsAppSettings,
};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "recallbot.toml";

/// Environment variable that overrides the config file path.
pub const CONFIG_PATH_VAR: &str = "RECALLBOT_CONFIG";

/// Load the full configuration.
///
/// `config_path` (from `--config`) wins over `RECALLBOT_CONFIG`, which wins
/// over [`DEFAULT_CONFIG_FILE`].
pub async fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let path = config_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let file = load_file_config(&path).await;
    config_from_lookup(|key| std::env::var(key).ok(), file)
}

/// Read the optional TOML file.
///
/// - Missing file: defaults.
/// - Unreadable or malformed file: a warning, then defaults.
pub async fn load_file_config(path: &Path) -> FileConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return FileConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return FileConfig::default();
        }
    };

    match toml::from_str::<FileConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            FileConfig::default()
        }
    }
}

/// Assemble [`AppConfig`] from a variable lookup and the file settings.
///
/// Empty values count as unset. The WhatsApp and email sections are only
/// built when all of their variables are present; a partially configured
/// section is reported as an error rather than silently dropped.
pub fn config_from_lookup<F>(lookup: F, file: FileConfig) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

    let openai = OpenAiSettings {
        api_key: required("OPENAI_API_KEY")?,
        base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
    };

    let memory = MemorySettings {
        api_key: required("RECALLRAI_API_KEY")?,
        project_id: required("RECALLRAI_PROJECT_ID")?,
        base_url: var("RECALLRAI_BASE_URL").unwrap_or_else(|| DEFAULT_MEMORY_BASE_URL.to_string()),
        user_id: var("RECALLRAI_USER_ID"),
    };

    let whatsapp = match (var("WATI_API_TOKEN"), var("WATI_BASE_URL")) {
        (Some(api_token), Some(base_url)) => Some(WhatsAppSettings {
            api_token,
            base_url,
            allowed_phone_numbers: var("ALLOWED_PHONE_NUMBERS")
                .map(|raw| parse_phone_list(&raw))
                .transpose()?
                .unwrap_or_default(),
        }),
        (None, None) => None,
        (Some(_), None) => return Err(ConfigError::MissingVar("WATI_BASE_URL".to_string())),
        (None, Some(_)) => return Err(ConfigError::MissingVar("WATI_API_TOKEN".to_string())),
    };

    let email = {
        let parts = [var("ACS_EMAIL"), var("ACS_KEY"), var("ACS_ENDPOINT")];
        match parts {
            [Some(sender_address), Some(access_key), Some(endpoint)] => Some(EmailSettings {
                sender_address,
                access_key,
                endpoint,
            }),
            [None, None, None] => None,
            [sender, key, _] => {
                let missing = if sender.is_none() {
                    "ACS_EMAIL"
                } else if key.is_none() {
                    "ACS_KEY"
                } else {
                    "ACS_ENDPOINT"
                };
                return Err(ConfigError::MissingVar(missing.to_string()));
            }
        }
    };

    Ok(AppConfig {
        openai,
        memory,
        whatsapp,
        email,
        agent: file.agent,
        server: file.server,
    })
}

/// Parse `ALLOWED_PHONE_NUMBERS`: a JSON array of strings or numbers, or a
/// comma-separated list.
pub fn parse_phone_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        let values: Vec<serde_json::Value> =
            serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
                key: "ALLOWED_PHONE_NUMBERS".to_string(),
                message: e.to_string(),
            })?;
        return values
            .into_iter()
            .map(|value| match value {
                serde_json::Value::String(s) => Ok(s.trim().to_string()),
                serde_json::Value::Number(n) => Ok(n.to_string()),
                other => Err(ConfigError::Invalid {
                    key: "ALLOWED_PHONE_NUMBERS".to_string(),
                    message: format!("unexpected entry {other}"),
                }),
            })
            .filter(|entry| !matches!(entry, Ok(s) if s.is_empty()))
            .collect();
    }

    Ok(raw
        .split(',')
        .map(|p| p.trim().trim_matches('"').to_string())
        .filter(|p| !p.is_empty())
        .collect())
}
