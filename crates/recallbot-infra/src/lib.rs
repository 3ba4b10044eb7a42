//! Infrastructure layer for recallbot.
//!
//! Contains the HTTP implementations of the service ports defined in
//! `recallbot-core`: the OpenAI-compatible LLM provider, the RecallrAI memory
//! client, the WATI WhatsApp client, and the Azure Communication Services
//! email sender. Also hosts the configuration loader.

pub mod config;
pub mod email;
pub mod llm;
pub mod memory;
pub mod messaging;
