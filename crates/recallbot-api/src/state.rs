//! Application wiring.
//!
//! Core services are generic over their ports; the aliases below pin them to
//! the concrete HTTP adapters from `recallbot-infra`.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use recallbot_core::agent::chat::ChatAgent;
use recallbot_core::support::handler::SupportBot;
use recallbot_infra::email::AcsEmailSender;
use recallbot_infra::llm::create_provider;
use recallbot_infra::memory::RecallrClient;
use recallbot_infra::messaging::WatiClient;
use recallbot_types::config::{AppConfig, MemorySettings};

pub type ConcreteSupportBot = SupportBot<RecallrClient, WatiClient>;

pub type ConcreteChatAgent = ChatAgent<RecallrClient, AcsEmailSender>;

/// Shared state of the webhook server.
///
/// Holds no per-request mutable state; every delivery is handled
/// independently.
#[derive(Clone)]
pub struct AppState {
    pub support: Arc<ConcreteSupportBot>,
}

impl AppState {
    /// Wire the support bot. Requires the WhatsApp section.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let whatsapp = config.require_whatsapp()?;
        if whatsapp.allowed_phone_numbers.is_empty() {
            tracing::warn!("ALLOWED_PHONE_NUMBERS is empty; every sender will be ignored");
        }

        let support = SupportBot::new(
            create_provider(&config.openai)?,
            memory_client(&config.memory)?,
            WatiClient::new(&whatsapp.api_token, whatsapp.base_url.clone())?,
            whatsapp.allowed_phone_numbers.iter().cloned(),
            config.agent.clone(),
        );

        Ok(Self {
            support: Arc::new(support),
        })
    }
}

/// Wire the interactive email agent. Requires the email section and a
/// fixed memory user.
pub fn build_chat_agent(config: &AppConfig) -> anyhow::Result<ConcreteChatAgent> {
    let email = config.require_email()?;
    let user_id = config.require_memory_user()?;

    let sender = AcsEmailSender::new(
        email.endpoint.clone(),
        email.sender_address.clone(),
        SecretString::from(email.access_key.clone()),
    )?
    .with_polling(
        Duration::from_millis(config.agent.email_poll_interval_ms),
        config.agent.email_poll_max_attempts,
    );

    Ok(ChatAgent::new(
        create_provider(&config.openai)?,
        memory_client(&config.memory)?,
        sender,
        user_id,
        config.agent.clone(),
    ))
}

fn memory_client(settings: &MemorySettings) -> anyhow::Result<RecallrClient> {
    Ok(RecallrClient::new(
        SecretString::from(settings.api_key.clone()),
        settings.project_id.clone(),
        settings.base_url.clone(),
    )?)
}
