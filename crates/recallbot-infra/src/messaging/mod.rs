//! Messaging provider adapters.

pub mod wati;

pub use wati::WatiClient;
