//! HTTP layer for the webhook server.
//!
//! Axum router with the messaging provider's webhook endpoint and a health
//! check.

pub mod handlers;
pub mod router;
