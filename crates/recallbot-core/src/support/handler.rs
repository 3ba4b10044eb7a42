//! Webhook event handling for the support bot.
//!
//! `SupportBot::handle` turns one inbound webhook event into exactly one
//! status payload. Events that are not answerable are ignored before any
//! outbound call; answerable ones run the full pipeline (memory session,
//! single completion, reply). Failures anywhere become an error payload
//! and never escape to the HTTP layer.

use std::collections::HashSet;

use tracing::{Instrument, debug, error, info, info_span, warn};

use recallbot_types::config::AgentSettings;
use recallbot_types::llm::{CompletionRequest, LlmError, Message};
use recallbot_types::memory::{MemoryError, SessionRole};
use recallbot_types::messaging::{MessagingError, SendMessageRequest};
use recallbot_types::webhook::{WebhookEvent, WebhookResponse};

use crate::agent::prompt::support_prompt;
use crate::llm::box_provider::BoxLlmProvider;
use crate::memory::client::MemoryClient;
use crate::memory::session::{ensure_user, open_session};
use crate::messaging::client::MessagingClient;
use crate::messaging::dedup::already_answered;

pub const REASON_NOT_INCOMING: &str = "not an incoming message";
pub const REASON_NOT_ALLOWED: &str = "phone number not allowed";
pub const REASON_DUPLICATE: &str = "message already processed";
pub const REASON_MISSING_FIELDS: &str = "missing required fields";

/// Errors from the reply pipeline. Reported in the webhook payload.
#[derive(Debug, thiserror::Error)]
pub enum SupportError {
    #[error("memory service error: {0}")]
    Memory(#[from] MemoryError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("model returned an empty reply")]
    EmptyReply,
}

/// Answers inbound WhatsApp messages from allow-listed contacts.
pub struct SupportBot<M: MemoryClient, S: MessagingClient> {
    provider: BoxLlmProvider,
    memory: M,
    messaging: S,
    allowed_phone_numbers: HashSet<String>,
    settings: AgentSettings,
}

impl<M: MemoryClient, S: MessagingClient> SupportBot<M, S> {
    pub fn new(
        provider: BoxLlmProvider,
        memory: M,
        messaging: S,
        allowed_phone_numbers: impl IntoIterator<Item = String>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            provider,
            memory,
            messaging,
            allowed_phone_numbers: allowed_phone_numbers.into_iter().collect(),
            settings,
        }
    }

    /// Memory user id for a WhatsApp contact.
    pub fn memory_user_id(&self, phone_number: &str) -> String {
        format!(
            "whatsapp_{phone_number}_{}",
            self.settings.memory_user_namespace
        )
    }

    /// Handle one webhook event.
    pub async fn handle(&self, event: &WebhookEvent) -> WebhookResponse {
        if !event.is_incoming_message() {
            debug!(
                event_type = event.event_type.as_deref().unwrap_or("-"),
                owner = ?event.owner,
                "Skipping webhook event"
            );
            return WebhookResponse::ignored(REASON_NOT_INCOMING);
        }

        let phone_number = event.wa_id.as_deref().filter(|p| !p.is_empty());

        if let Some(phone) = phone_number {
            if !self.allowed_phone_numbers.contains(phone) {
                info!(phone, "Ignoring message from phone number outside the allow-list");
                return WebhookResponse::ignored(REASON_NOT_ALLOWED);
            }

            match already_answered(
                &self.messaging,
                phone,
                &event.message_ids(),
                self.settings.history_page_size,
                self.settings.history_max_pages,
            )
            .await
            {
                Ok(true) => {
                    info!(phone, message_id = ?event.id, "Duplicate delivery, already answered");
                    return WebhookResponse::ignored(REASON_DUPLICATE);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(phone, error = %e, "Duplicate check failed, processing anyway");
                }
            }
        }

        let (Some(phone), Some(text)) = (phone_number, event.message_text()) else {
            warn!(
                phone = ?phone_number,
                message_type = ?event.message_type,
                "Missing phone number or message text"
            );
            return WebhookResponse::ignored(REASON_MISSING_FIELDS);
        };

        let span = info_span!("support.reply", phone);
        match self
            .reply(phone, &text, event.whatsapp_message_id.as_deref())
            .instrument(span)
            .await
        {
            Ok(reply) => {
                let reason = format!("Assistant [{phone}]: {reply}");
                info!("{reason}");
                WebhookResponse::success(reply, reason)
            }
            Err(e) => {
                error!(phone, error = %e, "Failed to answer webhook message");
                WebhookResponse::error(e.to_string())
            }
        }
    }

    /// Run the reply pipeline for one inbound message and return the text
    /// that was sent back.
    async fn reply(
        &self,
        phone_number: &str,
        text: &str,
        reply_context_id: Option<&str>,
    ) -> Result<String, SupportError> {
        let user_id = self.memory_user_id(phone_number);
        ensure_user(&self.memory, &user_id).await?;

        let session = open_session(
            &self.memory,
            &user_id,
            self.settings.auto_process_after_minutes,
        )
        .await?;
        let session_id = session.session_id.as_str();

        self.memory
            .add_message(&user_id, session_id, SessionRole::User, text)
            .await?;

        let previous = self.memory.get_messages(&user_id, session_id).await?;
        let context = self.memory.get_context(&user_id, session_id).await?;

        let messages: Vec<Message> = previous
            .into_iter()
            .map(|m| match m.role {
                SessionRole::User => Message::user(m.content),
                SessionRole::Assistant => Message::assistant(m.content),
            })
            .collect();

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            system: Some(support_prompt(
                self.settings.persona_prompt.as_deref(),
                &context.context,
            )),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
            stream: false,
            tools: Vec::new(),
        };

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = false,
        );
        let response = self.provider.complete(&request).instrument(span).await?;

        let reply = response.content.trim().to_string();
        if reply.is_empty() {
            return Err(SupportError::EmptyReply);
        }

        self.memory
            .add_message(&user_id, session_id, SessionRole::Assistant, &reply)
            .await?;

        let sent = self
            .messaging
            .send_session_message(&SendMessageRequest {
                phone_number: phone_number.to_string(),
                message_text: reply.clone(),
                reply_context_id: reply_context_id.map(str::to_string),
            })
            .await?;
        if !sent.ok {
            return Err(MessagingError::Rejected(
                sent.result.unwrap_or_else(|| "send not acknowledged".to_string()),
            )
            .into());
        }

        Ok(reply)
    }
}
