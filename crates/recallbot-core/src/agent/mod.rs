//! The interactive email agent.
//!
//! - `ChatAgent`: runs a conversation turn (memory session, streamed
//!   completion, tool round trip) over UI-owned `ConversationState`
//! - `ToolDispatcher`: executes the `send_email` tool
//! - `prompt`: system prompts for both agents

pub mod chat;
pub mod prompt;
pub mod tools;
