//! MessagingClient trait definition.

use recallbot_types::messaging::{
    HistoryPage, MessagingError, SendMessageRequest, SendMessageResponse,
};

/// Port for the WhatsApp messaging provider.
///
/// Implementations live in recallbot-infra (e.g., `WatiClient`).
pub trait MessagingClient: Send + Sync {
    /// Send a free-form session message, optionally as a reply to an
    /// earlier message.
    fn send_session_message(
        &self,
        request: &SendMessageRequest,
    ) -> impl std::future::Future<Output = Result<SendMessageResponse, MessagingError>> + Send;

    /// One page of a contact's message history, newest first.
    /// Page numbers start at 1.
    fn get_messages(
        &self,
        phone_number: &str,
        page_size: u32,
        page_number: u32,
    ) -> impl std::future::Future<Output = Result<HistoryPage, MessagingError>> + Send;
}
