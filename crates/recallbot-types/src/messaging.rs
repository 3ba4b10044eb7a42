//! Outbound messaging provider types (WhatsApp via WATI).

use serde::{Deserialize, Serialize};

/// One entry of a contact's message history, newest first in a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub whatsapp_message_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// `true` when the message was sent by us (operator or bot).
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default, rename = "type")]
    pub message_type: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

impl HistoryMessage {
    /// Whether this entry is the message identified by any of `ids`.
    pub fn matches_any(&self, ids: &[&str]) -> bool {
        [self.id.as_deref(), self.whatsapp_message_id.as_deref()]
            .into_iter()
            .flatten()
            .any(|own| ids.contains(&own))
    }
}

/// One page of a contact's message history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryPage {
    pub items: Vec<HistoryMessage>,
    pub total: u64,
    pub page_number: u32,
    pub page_size: u32,
}

impl HistoryPage {
    /// Whether pages beyond this one may hold older entries.
    pub fn has_more(&self) -> bool {
        !self.items.is_empty()
            && (self.page_number as u64) * (self.page_size as u64) < self.total
    }
}

/// A session message to deliver to a WhatsApp contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub phone_number: String,
    pub message_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_context_id: Option<String>,
}

/// The provider's acknowledgement of a sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

/// Errors from messaging provider operations.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("messaging transport error: {0}")]
    Transport(String),

    #[error("messaging provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("messaging provider rejected the message: {0}")]
    Rejected(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}
