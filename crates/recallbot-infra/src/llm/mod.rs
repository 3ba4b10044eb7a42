//! LLM provider implementations.
//!
//! Contains the concrete implementation of the [`LlmProvider`] trait
//! defined in `recallbot-core`, and a factory ([`create_provider`]) that
//! builds it from configuration.
//!
//! [`LlmProvider`]: recallbot_core::llm::provider::LlmProvider

pub mod openai;

use secrecy::SecretString;

use recallbot_core::llm::box_provider::BoxLlmProvider;
use recallbot_types::config::OpenAiSettings;
use recallbot_types::llm::LlmError;

use self::openai::OpenAiProvider;

/// Create a [`BoxLlmProvider`] from the OpenAI settings.
pub fn create_provider(settings: &OpenAiSettings) -> Result<BoxLlmProvider, LlmError> {
    if settings.api_key.is_empty() {
        return Err(LlmError::AuthenticationFailed);
    }
    let api_key = SecretString::from(settings.api_key.clone());
    let provider = OpenAiProvider::new(&api_key, &settings.base_url);
    Ok(BoxLlmProvider::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_openai() {
        let settings = OpenAiSettings {
            api_key: "sk-test".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        };
        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_create_provider_missing_key() {
        let settings = OpenAiSettings {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
        };
        assert!(matches!(
            create_provider(&settings),
            Err(LlmError::AuthenticationFailed)
        ));
    }
}
