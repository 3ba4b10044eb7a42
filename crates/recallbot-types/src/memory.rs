//! Long-term memory service types.
//!
//! The memory provider owns users, sessions and their lifecycle; these are
//! request-scoped copies of what it returns. A session moves through
//! `Pending -> Processing -> Processed` on the provider side. The only
//! obligation on our side is to append ongoing turns to at most one
//! `Pending` session per user.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a memory session, as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Processing,
    Processed,
    InsufficientBalance,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// Whether new turns may still be appended to the session.
    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::Pending)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Processing => write!(f, "processing"),
            SessionStatus::Processed => write!(f, "processed"),
            SessionStatus::InsufficientBalance => write!(f, "insufficient_balance"),
            SessionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// A user known to the memory provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUser {
    pub user_id: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_active_at: Option<DateTime<Utc>>,
}

/// A provider-managed container of conversation turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySession {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of sessions, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPage {
    pub sessions: Vec<MemorySession>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub has_more: bool,
}

/// Who authored a turn stored in a memory session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    User,
    Assistant,
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionRole::User => write!(f, "user"),
            SessionRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A turn stored in a memory session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: SessionRole,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Context the provider derived from the user's past sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSummary {
    #[serde(default)]
    pub context: String,
}

/// Errors from memory service operations.
///
/// Absent users and sessions are not errors at lookup time; lookups return
/// `Ok(None)`. `UserNotFound`/`SessionNotFound` are raised only when an
/// operation addresses an entity that must exist.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("memory user not found")]
    UserNotFound,

    #[error("memory session not found")]
    SessionNotFound,

    #[error("invalid session state: {0}")]
    InvalidSessionState(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("memory service transport error: {0}")]
    Transport(String),

    #[error("memory service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_serde() {
        let status: SessionStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, SessionStatus::Pending);
        assert!(status.is_open());

        let status: SessionStatus = serde_json::from_str("\"processed\"").unwrap();
        assert!(!status.is_open());
    }

    #[test]
    fn test_session_status_unknown_value() {
        let status: SessionStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(status, SessionStatus::Unknown);
        assert!(!status.is_open());
    }

    #[test]
    fn test_session_page_defaults() {
        let page: SessionPage = serde_json::from_str(
            r#"{"sessions":[{"session_id":"s1","status":"processing"}]}"#,
        )
        .unwrap();
        assert_eq!(page.sessions.len(), 1);
        assert_eq!(page.sessions[0].status, SessionStatus::Processing);
        assert!(!page.has_more);
    }

    #[test]
    fn test_memory_error_display() {
        let err = MemoryError::Api {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "memory service returned HTTP 502: bad gateway");
    }
}
