//! Memory service adapters.

pub mod recallr;

pub use recallr::RecallrClient;
