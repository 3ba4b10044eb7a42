//! LLM provider abstractions for recallbot.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `ToolCallAccumulator`: reassembly of streamed tool-call fragments

pub mod accumulator;
pub mod box_provider;
pub mod provider;
