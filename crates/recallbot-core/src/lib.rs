//! Agent logic and service port definitions for recallbot.
//!
//! This crate defines the "ports" (client traits) that the infrastructure
//! layer implements, plus every decision the two agents make. It depends
//! only on `recallbot-types` -- never on `recallbot-infra` or any HTTP crate.

pub mod agent;
pub mod email;
pub mod llm;
pub mod memory;
pub mod messaging;
pub mod support;

#[cfg(test)]
pub(crate) mod testing;
