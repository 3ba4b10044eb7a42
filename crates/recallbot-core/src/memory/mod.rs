//! Long-term memory service usage.
//!
//! `MemoryClient` is the port the memory service adapter implements;
//! `session` holds the user bootstrap and session reuse rules both agents
//! share.

pub mod client;
pub mod session;
