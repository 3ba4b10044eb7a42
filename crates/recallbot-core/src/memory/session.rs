//! User bootstrap and session reuse.
//!
//! Both agents append to at most one open session per user: the newest
//! session is reused while the memory service still reports it as pending,
//! otherwise a fresh one is created.

use tracing::{debug, info};

use recallbot_types::memory::{MemoryError, MemorySession, MemoryUser, SessionStatus};

use super::client::MemoryClient;

/// Fetch a memory user, creating it with empty metadata if it is absent.
pub async fn ensure_user<M: MemoryClient>(
    client: &M,
    user_id: &str,
) -> Result<MemoryUser, MemoryError> {
    if let Some(user) = client.get_user(user_id).await? {
        return Ok(user);
    }

    info!(user_id, "Memory user not found, creating it");
    match client.create_user(user_id, serde_json::json!({})).await {
        Ok(user) => Ok(user),
        // Another request created the user in the meantime
        Err(MemoryError::Conflict(_)) => client
            .get_user(user_id)
            .await?
            .ok_or(MemoryError::UserNotFound),
        Err(e) => Err(e),
    }
}

/// Return the session new messages should be appended to.
///
/// Looks at the newest session only. A pending session is re-fetched by id
/// and reused; if it vanished in between, or the newest session is already
/// processing or processed, a new session is created.
pub async fn open_session<M: MemoryClient>(
    client: &M,
    user_id: &str,
    auto_process_after_minutes: u32,
) -> Result<MemorySession, MemoryError> {
    let page = client.list_sessions(user_id, 0, 1).await?;

    if let Some(newest) = page.sessions.first() {
        if newest.status == SessionStatus::Pending {
            if let Some(session) = client.get_session(user_id, &newest.session_id).await? {
                debug!(user_id, session_id = %session.session_id, "Reusing pending session");
                return Ok(session);
            }
            debug!(
                user_id,
                session_id = %newest.session_id,
                "Pending session disappeared before reuse"
            );
        } else {
            debug!(
                user_id,
                session_id = %newest.session_id,
                status = %newest.status,
                "Newest session is no longer open"
            );
        }
    }

    let session = client
        .create_session(user_id, auto_process_after_minutes)
        .await?;
    info!(user_id, session_id = %session.session_id, "Created memory session");
    Ok(session)
}
