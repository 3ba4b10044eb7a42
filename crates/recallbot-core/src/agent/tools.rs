//! Local tools the chat agent exposes to the model.
//!
//! Only `send_email` exists. Every failure mode of a tool call (unknown
//! name, undecodable arguments, a failed send) becomes the text of the
//! tool result so the model can explain it to the user; none of them
//! aborts the turn.

use tracing::{info, warn};

use recallbot_types::email::OutboundEmail;
use recallbot_types::llm::{ToolCall, ToolDefinition};

use crate::email::sender::EmailSender;

pub const SEND_EMAIL_TOOL: &str = "send_email";

/// JSON-schema definition of the `send_email` tool.
pub fn send_email_tool() -> ToolDefinition {
    ToolDefinition {
        name: SEND_EMAIL_TOOL.to_string(),
        description: "Send a plain-text email to a single recipient.".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "email": {
                    "type": "string",
                    "description": "Recipient email address"
                },
                "subject": {
                    "type": "string",
                    "description": "Subject line"
                },
                "body": {
                    "type": "string",
                    "description": "Plain-text body of the email"
                }
            },
            "required": ["email", "subject", "body"],
            "additionalProperties": false
        }),
    }
}

/// Result of one tool invocation, fed back to the model as a tool turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub content: String,
    pub succeeded: bool,
}

impl ToolOutcome {
    fn ok(content: String) -> Self {
        Self {
            content,
            succeeded: true,
        }
    }

    fn failed(content: String) -> Self {
        Self {
            content,
            succeeded: false,
        }
    }
}

/// Executes tool calls against the local side-effecting services.
pub struct ToolDispatcher<'a, E: EmailSender> {
    email: &'a E,
}

impl<'a, E: EmailSender> ToolDispatcher<'a, E> {
    pub fn new(email: &'a E) -> Self {
        Self { email }
    }

    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        match call.name.as_str() {
            SEND_EMAIL_TOOL => self.send_email(call).await,
            other => {
                warn!(tool = other, call_id = %call.id, "Model requested an unknown tool");
                ToolOutcome::failed(format!("Unknown function: {other}"))
            }
        }
    }

    async fn send_email(&self, call: &ToolCall) -> ToolOutcome {
        let email: OutboundEmail = match call.parse_arguments() {
            Ok(email) => email,
            Err(e) => {
                warn!(call_id = %call.id, error = %e, "Undecodable send_email arguments");
                return ToolOutcome::failed(format!("Invalid arguments for send_email: {e}"));
            }
        };

        match self.email.send(&email).await {
            Ok(delivery) if delivery.succeeded() => {
                info!(
                    recipient = %email.recipient,
                    operation_id = %delivery.operation_id,
                    "Email sent"
                );
                ToolOutcome::ok(format!("Email sent successfully to {}", email.recipient))
            }
            Ok(delivery) => {
                warn!(
                    recipient = %email.recipient,
                    operation_id = %delivery.operation_id,
                    status = %delivery.status,
                    "Email was not delivered"
                );
                ToolOutcome::failed(format!(
                    "Email to {} was not sent (status: {})",
                    email.recipient, delivery.status
                ))
            }
            Err(e) => {
                warn!(recipient = %email.recipient, error = %e, "Email send failed");
                ToolOutcome::failed(format!("Failed to send email: {e}"))
            }
        }
    }
}
