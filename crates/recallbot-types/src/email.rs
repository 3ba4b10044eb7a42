//! Outbound email types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A plain-text email handed once to the email provider.
///
/// Deserializes from the `send_email` tool arguments, where the recipient
/// field is named `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    #[serde(rename = "email")]
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivery status of an email send operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl EmailStatus {
    /// Whether the provider will not change this status any further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EmailStatus::Succeeded | EmailStatus::Failed | EmailStatus::Canceled
        )
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailStatus::NotStarted => write!(f, "NotStarted"),
            EmailStatus::Running => write!(f, "Running"),
            EmailStatus::Succeeded => write!(f, "Succeeded"),
            EmailStatus::Failed => write!(f, "Failed"),
            EmailStatus::Canceled => write!(f, "Canceled"),
            EmailStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Final outcome of a send operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDelivery {
    pub operation_id: String,
    pub status: EmailStatus,
}

impl EmailDelivery {
    pub fn succeeded(&self) -> bool {
        self.status == EmailStatus::Succeeded
    }
}

/// Errors from email provider operations.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email transport error: {0}")]
    Transport(String),

    #[error("email provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("email operation {operation_id} did not finish after {attempts} polls")]
    Timeout { operation_id: String, attempts: u32 },
}
