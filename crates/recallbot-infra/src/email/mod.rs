//! Email provider adapters.

pub mod acs;

pub use acs::AcsEmailSender;
