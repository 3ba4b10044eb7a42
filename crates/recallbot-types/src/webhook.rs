//! Inbound WhatsApp webhook payloads and the handler's response shape.
//!
//! The messaging provider posts one JSON document per event. Every field is
//! optional; the handler decides from `eventType`, `owner` and `waId`
//! whether the event deserves a reply.

use serde::{Deserialize, Serialize};

/// Event type the provider uses for chat messages.
pub const MESSAGE_EVENT: &str = "message";

/// An inbound webhook event from the messaging provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub id: Option<String>,
    pub created: Option<String>,
    pub whatsapp_message_id: Option<String>,
    pub conversation_id: Option<String>,
    pub ticket_id: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub data: Option<serde_json::Value>,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub timestamp: Option<String>,
    pub owner: Option<bool>,
    pub event_type: Option<String>,
    pub status_string: Option<String>,
    pub avatar_url: Option<String>,
    pub assigned_id: Option<String>,
    pub operator_name: Option<String>,
    pub operator_email: Option<String>,
    pub wa_id: Option<String>,
    pub message_contact: Option<serde_json::Value>,
    pub sender_name: Option<String>,
    pub list_reply: Option<serde_json::Value>,
    pub interactive_button_reply: Option<serde_json::Value>,
    pub button_reply: Option<serde_json::Value>,
    pub reply_context_id: Option<String>,
    pub source_type: Option<i64>,
    pub frequently_forwarded: Option<bool>,
    pub forwarded: Option<bool>,
}

impl WebhookEvent {
    /// An event authored by a customer (not by us) carrying a chat message.
    pub fn is_incoming_message(&self) -> bool {
        self.event_type.as_deref() == Some(MESSAGE_EVENT) && self.owner == Some(false)
    }

    /// Extract the message text according to the declared message type.
    ///
    /// Button replies carry their label under `text`, list replies under
    /// `title`. Only empty strings count as missing; whitespace is passed on
    /// as sent.
    pub fn message_text(&self) -> Option<String> {
        let text = match self.message_type.as_deref()? {
            "text" => self.text.clone(),
            "button" => reply_field(self.button_reply.as_ref(), "text"),
            "list" => reply_field(self.list_reply.as_ref(), "title"),
            "interactive" => reply_field(self.interactive_button_reply.as_ref(), "title"),
            _ => None,
        }?;

        if text.is_empty() { None } else { Some(text) }
    }

    /// Identifiers under which this message may appear in the provider's history.
    pub fn message_ids(&self) -> Vec<&str> {
        [self.id.as_deref(), self.whatsapp_message_id.as_deref()]
            .into_iter()
            .flatten()
            .filter(|id| !id.is_empty())
            .collect()
    }
}

fn reply_field(reply: Option<&serde_json::Value>, field: &str) -> Option<String> {
    reply?.get(field)?.as_str().map(str::to_string)
}

/// Outcome of handling one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Success,
    Ignored,
    Error,
}

/// JSON body returned to the messaging provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: WebhookStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WebhookResponse {
    pub fn success(reply: String, reason: String) -> Self {
        Self {
            status: WebhookStatus::Success,
            response: Some(reply),
            reason: Some(reason),
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            status: WebhookStatus::Ignored,
            response: None,
            reason: Some(reason.into()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: WebhookStatus::Error,
            response: None,
            reason: Some(reason.into()),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
