//! Shared domain types for recallbot.
//!
//! Request-scoped copies of what the external services own: conversation
//! turns and tool calls, memory sessions, webhook events, message history,
//! outbound email, plus configuration values and per-domain error enums.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod email;
pub mod llm;
pub mod memory;
pub mod messaging;
pub mod webhook;
