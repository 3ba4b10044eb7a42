//! Interactive email agent.
//!
//! `ChatAgent` runs one conversation turn at a time against the memory
//! service and the LLM. The conversation itself (current session id and
//! message history) lives in a `ConversationState` owned by the UI and
//! passed in by `&mut`; the agent keeps no per-conversation state.

use futures_util::StreamExt;
use tracing::{Instrument, debug, info, info_span, warn};

use recallbot_types::config::AgentSettings;
use recallbot_types::llm::{CompletionRequest, LlmError, Message, StreamEvent, ToolCall};
use recallbot_types::memory::{MemoryError, SessionRole};

use crate::email::sender::EmailSender;
use crate::llm::box_provider::BoxLlmProvider;
use crate::memory::client::MemoryClient;
use crate::memory::session::{ensure_user, open_session};

use super::prompt::email_agent_prompt;
use super::tools::{ToolDispatcher, send_email_tool};

/// Progress notifications emitted while a turn runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A memory session was opened for this conversation.
    SessionOpened { session_id: String },
    /// A piece of the assistant reply.
    Token(String),
    /// The model asked for a tool; it is about to run.
    ToolStarted { name: String },
    /// A tool finished; `result` is what the model will see.
    ToolFinished {
        name: String,
        result: String,
        succeeded: bool,
    },
}

/// Errors that end a turn early.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The memory session stopped accepting messages (it was processed).
    /// The conversation has to be restarted with a new session.
    #[error("the memory session has expired; start a new session with /new")]
    SessionExpired,

    #[error("memory service error: {0}")]
    Memory(#[from] MemoryError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// The UI-owned state of one conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub session_id: Option<String>,
    /// Turns sent to the model, oldest first. Excludes the system prompt.
    pub history: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub tool_calls: usize,
}

/// Text and tool calls collected from one streamed completion.
#[derive(Debug, Default)]
struct StreamedReply {
    text: String,
    tool_calls: Vec<ToolCall>,
}

/// The email-sending chat agent.
///
/// Generic over the memory and email ports so tests can run it against
/// in-process fakes.
pub struct ChatAgent<M: MemoryClient, E: EmailSender> {
    provider: BoxLlmProvider,
    memory: M,
    email: E,
    user_id: String,
    settings: AgentSettings,
}

impl<M: MemoryClient, E: EmailSender> ChatAgent<M, E> {
    pub fn new(
        provider: BoxLlmProvider,
        memory: M,
        email: E,
        user_id: impl Into<String>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            provider,
            memory,
            email,
            user_id: user_id.into(),
            settings,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Make sure the memory user exists. Called once before the first turn.
    pub async fn start(&self) -> Result<(), ChatError> {
        ensure_user(&self.memory, &self.user_id).await?;
        Ok(())
    }

    /// Run one user turn to completion.
    ///
    /// `on_event` receives streamed tokens and tool progress as they happen.
    /// On success the user message, any tool-call turns, and the assistant
    /// reply have been appended to `state.history`.
    pub async fn run_turn<F>(
        &self,
        state: &mut ConversationState,
        input: &str,
        mut on_event: F,
    ) -> Result<TurnOutcome, ChatError>
    where
        F: FnMut(ChatEvent) + Send,
    {
        let session_id = match &state.session_id {
            Some(id) => id.clone(),
            None => {
                let session = open_session(
                    &self.memory,
                    &self.user_id,
                    self.settings.auto_process_after_minutes,
                )
                .await?;
                on_event(ChatEvent::SessionOpened {
                    session_id: session.session_id.clone(),
                });
                state.session_id = Some(session.session_id.clone());
                session.session_id
            }
        };

        match self
            .memory
            .add_message(&self.user_id, &session_id, SessionRole::User, input)
            .await
        {
            Ok(()) => {}
            Err(MemoryError::InvalidSessionState(reason)) => {
                warn!(session_id = %session_id, %reason, "Memory session no longer accepts messages");
                return Err(ChatError::SessionExpired);
            }
            Err(e) => return Err(e.into()),
        }

        let context = self
            .memory
            .get_context(&self.user_id, &session_id)
            .await?;
        let system_prompt = email_agent_prompt(&context.context);

        // The user message and tool turns join the history only once the
        // whole turn succeeded
        let mut turn = vec![Message::user(input)];
        let first = self
            .stream_completion(&system_prompt, &state.history, &turn, true, &mut on_event)
            .await?;

        let tool_calls = first.tool_calls.len();
        let reply = if first.tool_calls.is_empty() {
            first.text
        } else {
            turn.push(Message::assistant_tool_calls(
                first.text,
                first.tool_calls.clone(),
            ));

            let dispatcher = ToolDispatcher::new(&self.email);
            for call in &first.tool_calls {
                on_event(ChatEvent::ToolStarted {
                    name: call.name.clone(),
                });
                let outcome = dispatcher.dispatch(call).await;
                on_event(ChatEvent::ToolFinished {
                    name: call.name.clone(),
                    result: outcome.content.clone(),
                    succeeded: outcome.succeeded,
                });
                turn.push(Message::tool_result(&call.id, outcome.content));
            }

            let follow_up = self
                .stream_completion(&system_prompt, &state.history, &turn, false, &mut on_event)
                .await?;
            if !follow_up.tool_calls.is_empty() {
                warn!(
                    count = follow_up.tool_calls.len(),
                    "Ignoring tool calls requested in the follow-up completion"
                );
            }
            follow_up.text
        };

        if reply.trim().is_empty() {
            warn!(session_id = %session_id, "Model returned an empty reply; not storing it");
        } else {
            self.memory
                .add_message(&self.user_id, &session_id, SessionRole::Assistant, &reply)
                .await?;
        }

        state.history.extend(turn);
        state.history.push(Message::assistant(reply.clone()));

        info!(
            session_id = %session_id,
            tool_calls,
            reply_len = reply.len(),
            "Chat turn complete"
        );
        Ok(TurnOutcome { reply, tool_calls })
    }

    /// Close the conversation: ask the memory service to process the
    /// session now and reset the state for a fresh conversation.
    pub async fn end_conversation(&self, state: &mut ConversationState) -> Result<(), ChatError> {
        state.history.clear();
        if let Some(session_id) = state.session_id.take() {
            self.memory
                .process_session(&self.user_id, &session_id)
                .await?;
            info!(session_id = %session_id, "Memory session submitted for processing");
        }
        Ok(())
    }

    /// Stream one completion over `history` followed by the in-progress
    /// `turn`, forwarding text deltas to `on_event`.
    async fn stream_completion<F>(
        &self,
        system_prompt: &str,
        history: &[Message],
        turn: &[Message],
        offer_tools: bool,
        on_event: &mut F,
    ) -> Result<StreamedReply, ChatError>
    where
        F: FnMut(ChatEvent) + Send,
    {
        let mut messages = Vec::with_capacity(history.len() + turn.len());
        messages.extend_from_slice(history);
        messages.extend_from_slice(turn);

        // The follow-up after tool results has to answer in text.
        let tools = if offer_tools {
            vec![send_email_tool()]
        } else {
            Vec::new()
        };

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            system: Some(system_prompt.to_string()),
            max_tokens: self.settings.chat_max_tokens,
            temperature: Some(self.settings.temperature),
            stream: true,
            tools,
        };

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.tools = request.tools.len(),
        );

        let mut stream = self.provider.stream(request);
        async move {
            let mut reply = StreamedReply::default();
            while let Some(event) = stream.next().await {
                match event? {
                    StreamEvent::TextDelta { text } => {
                        reply.text.push_str(&text);
                        on_event(ChatEvent::Token(text));
                    }
                    StreamEvent::ToolCallComplete(call) => reply.tool_calls.push(call),
                    StreamEvent::Usage(usage) => debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "Completion usage"
                    ),
                    StreamEvent::Done => break,
                    StreamEvent::Connected | StreamEvent::MessageDelta { .. } => {}
                }
            }
            Ok::<_, ChatError>(reply)
        }
        .instrument(span)
        .await
    }
}
