//! Main chat loop orchestration.
//!
//! Coordinates the conversation lifecycle: agent wiring, welcome banner,
//! input loop with streamed turns, slash commands, and closing the memory
//! session on `/new` and on exit.

use std::time::Instant;

use console::style;
use tracing::{info, warn};

use recallbot_core::agent::chat::{ChatError, ChatEvent, ConversationState};
use recallbot_types::config::AppConfig;

use crate::state::{ConcreteChatAgent, build_chat_agent};

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{ChatRenderer, streaming_preview};

/// Run the interactive chat loop until `/exit` or Ctrl+D.
pub async fn run_chat_loop(config: &AppConfig) -> anyhow::Result<()> {
    let agent = build_chat_agent(config)?;
    let renderer = ChatRenderer::new();

    let spinner = renderer.spinner("connecting to memory...");
    let started = agent.start().await;
    spinner.finish_and_clear();
    started?;

    print_welcome_banner(agent.user_id(), agent.model());

    let mut state = ConversationState::new();
    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match cmd {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::Clear => chat_input.clear(),
                        ChatCommand::History => renderer.print_history(&state.history),
                        ChatCommand::Exit => break,
                        ChatCommand::New => {
                            close_session(&agent, &mut state, &renderer).await;
                            renderer.print_notice("Started a new conversation.");
                        }
                        ChatCommand::Unknown(name) => renderer.print_warning(&format!(
                            "Unknown command: {}. Type /help for available commands.",
                            style(name).dim()
                        )),
                    }
                    continue;
                }

                run_turn(&agent, &mut state, &text, &renderer).await;
            }
        }
    }

    close_session(&agent, &mut state, &renderer).await;
    println!("\n  {}", style("Session ended.").dim());
    Ok(())
}

/// Run one turn, reporting progress on the spinner. Errors are printed
/// inline and never end the loop.
async fn run_turn(
    agent: &ConcreteChatAgent,
    state: &mut ConversationState,
    input: &str,
    renderer: &ChatRenderer,
) {
    let spinner = renderer.spinner("thinking...");
    let start = Instant::now();
    let mut streamed = String::new();

    let result = agent
        .run_turn(state, input, |event| match event {
            ChatEvent::SessionOpened { session_id } => {
                info!(session_id = %session_id, "Memory session opened");
            }
            ChatEvent::Token(delta) => {
                streamed.push_str(&delta);
                spinner.set_message(streaming_preview(&streamed));
            }
            ChatEvent::ToolStarted { name } => {
                streamed.clear();
                spinner.set_message(format!("running {name}..."));
            }
            ChatEvent::ToolFinished {
                name,
                result,
                succeeded,
            } => {
                let mark = if succeeded {
                    style("✓").green()
                } else {
                    style("✗").red()
                };
                spinner.println(format!("  {mark} {name}: {}", style(result).dim()));
                spinner.set_message("thinking...");
            }
        })
        .await;

    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            renderer.print_reply(&outcome.reply);
            renderer.print_stats_footer(
                start.elapsed().as_millis() as u64,
                outcome.tool_calls,
                agent.model(),
            );
        }
        Err(ChatError::SessionExpired) => {
            renderer.print_warning(&ChatError::SessionExpired.to_string());
        }
        Err(e) => renderer.print_error(&e.to_string()),
    }
}

/// Hand the current memory session to the memory service for processing
/// and reset the conversation.
async fn close_session(
    agent: &ConcreteChatAgent,
    state: &mut ConversationState,
    renderer: &ChatRenderer,
) {
    if state.session_id.is_none() {
        state.history.clear();
        return;
    }

    let spinner = renderer.spinner("saving conversation to memory...");
    let closed = agent.end_conversation(state).await;
    spinner.finish_and_clear();

    if let Err(e) = closed {
        warn!(error = %e, "Failed to process memory session");
    }
}
