//! MemoryClient trait definition.
//!
//! The memory service owns users, their sessions, and the context it
//! derives from processed sessions. This trait covers exactly the calls
//! the agents make against it.

use recallbot_types::memory::{
    ContextSummary, MemoryError, MemorySession, MemoryUser, SessionMessage, SessionPage,
    SessionRole,
};

/// Port for the long-term memory service.
///
/// Implementations live in recallbot-infra (e.g., `RecallrClient`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait MemoryClient: Send + Sync {
    /// Look up a user. Returns `Ok(None)` if the user does not exist.
    fn get_user(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<MemoryUser>, MemoryError>> + Send;

    /// Create a user with the given metadata.
    fn create_user(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<MemoryUser, MemoryError>> + Send;

    /// List a user's sessions, newest first.
    fn list_sessions(
        &self,
        user_id: &str,
        offset: u32,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<SessionPage, MemoryError>> + Send;

    /// Create a session the service processes on its own after
    /// `auto_process_after_minutes` of inactivity.
    fn create_session(
        &self,
        user_id: &str,
        auto_process_after_minutes: u32,
    ) -> impl std::future::Future<Output = Result<MemorySession, MemoryError>> + Send;

    /// Fetch a session by id. Returns `Ok(None)` if it does not exist.
    fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<MemorySession>, MemoryError>> + Send;

    /// Append a message to an open session.
    ///
    /// Fails with [`MemoryError::InvalidSessionState`] once the session has
    /// left the pending state.
    fn add_message(
        &self,
        user_id: &str,
        session_id: &str,
        role: SessionRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<(), MemoryError>> + Send;

    /// All messages of a session, oldest first.
    fn get_messages(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<SessionMessage>, MemoryError>> + Send;

    /// The context summary for a session's user.
    fn get_context(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<ContextSummary, MemoryError>> + Send;

    /// Ask the service to process a session now instead of waiting for
    /// the inactivity timeout.
    fn process_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), MemoryError>> + Send;
}
