//! EmailSender trait definition.

use recallbot_types::email::{EmailDelivery, EmailError, OutboundEmail};

/// Port for the email provider.
///
/// Implementations live in recallbot-infra (e.g., `AcsEmailSender`).
pub trait EmailSender: Send + Sync {
    /// Submit an email and wait until the provider reports a terminal
    /// status for it.
    ///
    /// A delivered `EmailDelivery` may still carry a failed status; only
    /// transport, protocol, or polling problems are errors.
    fn send(
        &self,
        email: &OutboundEmail,
    ) -> impl std::future::Future<Output = Result<EmailDelivery, EmailError>> + Send;
}
