//! Outbound email.

pub mod sender;
