//! Duplicate-delivery guard.
//!
//! The messaging provider retries webhooks it considers undelivered, so the
//! same inbound message can arrive more than once. Before answering, the
//! sender's history is scanned for the inbound message; if anything we sent
//! (an `owner` message) is newer than it, the message was already answered.

use tracing::debug;

use recallbot_types::messaging::{HistoryMessage, MessagingError};

use super::client::MessagingClient;

/// Whether the inbound message identified by any of `message_ids` already
/// has a reply in the sender's history.
///
/// History is paged newest-first, at most `max_pages` pages of `page_size`.
/// A message that is not found within those pages counts as unanswered.
pub async fn already_answered<C: MessagingClient>(
    client: &C,
    phone_number: &str,
    message_ids: &[&str],
    page_size: u32,
    max_pages: u32,
) -> Result<bool, MessagingError> {
    if message_ids.is_empty() {
        return Ok(false);
    }

    let mut items: Vec<HistoryMessage> = Vec::new();
    for page_number in 1..=max_pages.max(1) {
        let page = client
            .get_messages(phone_number, page_size, page_number)
            .await?;
        let has_more = page.has_more();
        items.extend(page.items);

        if let Some(answered) = answered_in(&items, message_ids) {
            debug!(
                phone_number,
                pages = page_number,
                answered,
                "Located inbound message in history"
            );
            return Ok(answered);
        }
        if !has_more {
            break;
        }
    }

    debug!(phone_number, scanned = items.len(), "Inbound message not in history");
    Ok(false)
}

/// `Some(answered)` once the inbound message is among `items` (newest first),
/// `None` while it has not been seen yet.
fn answered_in(items: &[HistoryMessage], message_ids: &[&str]) -> Option<bool> {
    let position = items.iter().position(|m| m.matches_any(message_ids))?;
    Some(items[..position].iter().any(|m| m.owner))
}
