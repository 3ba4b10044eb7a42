//! Interactive terminal chat with the email agent.
//!
//! Streams LLM output behind a spinner, renders the final reply as
//! markdown, and handles slash commands. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
