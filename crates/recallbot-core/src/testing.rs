//! In-process fakes of every port, shared by the unit tests.
//!
//! Each fake keeps its state behind an `Arc<Mutex<_>>`, so a test can hand
//! a clone to the code under test and inspect the original afterwards.

use std::collections::{HashMap, HashSet, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures_util::Stream;

use recallbot_types::email::{EmailDelivery, EmailError, EmailStatus, OutboundEmail};
use recallbot_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};
use recallbot_types::memory::{
    ContextSummary, MemoryError, MemorySession, MemoryUser, SessionMessage, SessionPage,
    SessionRole, SessionStatus,
};
use recallbot_types::messaging::{
    HistoryMessage, HistoryPage, MessagingError, SendMessageRequest, SendMessageResponse,
};

use crate::email::sender::EmailSender;
use crate::llm::provider::LlmProvider;
use crate::memory::client::MemoryClient;
use crate::messaging::client::MessagingClient;

// --- LLM ---

#[derive(Default)]
struct LlmState {
    completions: VecDeque<String>,
    streams: VecDeque<Vec<Result<StreamEvent, LlmError>>>,
    requests: Vec<CompletionRequest>,
    failing: bool,
}

/// Scripted LLM: replays queued completions and streams in order.
#[derive(Clone, Default)]
pub struct MockLlm {
    state: Arc<Mutex<LlmState>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completion(self, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .completions
            .push_back(text.to_string());
        self
    }

    pub fn with_stream(self, events: Vec<StreamEvent>) -> Self {
        self.state
            .lock()
            .unwrap()
            .streams
            .push_back(events.into_iter().map(Ok).collect());
        self
    }

    /// Queue a stream that fails with `message` before producing any event.
    pub fn with_stream_error(self, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .streams
            .push_back(vec![Err(LlmError::Stream(message.to_string()))]);
        self
    }

    pub fn failing(self) -> Self {
        self.state.lock().unwrap().failing = true;
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        if state.failing {
            return Err(LlmError::Provider {
                message: "mock failure".to_string(),
            });
        }
        let content = state.completions.pop_front().unwrap_or_default();
        Ok(CompletionResponse {
            id: "resp-1".to_string(),
            content,
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            tool_calls: Vec::new(),
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request);
        let items: Vec<Result<StreamEvent, LlmError>> = if state.failing {
            vec![Err(LlmError::Stream("mock failure".to_string()))]
        } else {
            state.streams.pop_front().unwrap_or_default()
        };
        Box::pin(futures_util::stream::iter(items))
    }
}

// --- Memory ---

#[derive(Default)]
struct MemoryState {
    users: HashSet<String>,
    /// Oldest first.
    sessions: Vec<MemorySession>,
    messages: HashMap<String, Vec<SessionMessage>>,
    context: String,
    calls: Vec<String>,
    hide_session_lookups: bool,
    next_id: u32,
}

/// In-memory stand-in for the memory service.
#[derive(Clone, Default)]
pub struct MockMemory {
    state: Arc<Mutex<MemoryState>>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: &str) -> Self {
        self.state.lock().unwrap().users.insert(user_id.to_string());
        self
    }

    /// Append a session; the last one added is the newest.
    pub fn with_session(self, session_id: &str, status: SessionStatus) -> Self {
        self.state.lock().unwrap().sessions.push(MemorySession {
            session_id: session_id.to_string(),
            status,
            created_at: None,
        });
        self
    }

    pub fn with_context(self, context: &str) -> Self {
        self.state.lock().unwrap().context = context.to_string();
        self
    }

    /// Make `get_session` report every session as gone.
    pub fn hide_session_lookups(self) -> Self {
        self.state.lock().unwrap().hide_session_lookups = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.state.lock().unwrap().users.contains(user_id)
    }

    pub fn messages(&self, session_id: &str) -> Vec<SessionMessage> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn status(&self, session_id: &str) -> Option<SessionStatus> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .map(|s| s.status)
    }

    fn record(&self, call: &str) -> std::sync::MutexGuard<'_, MemoryState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        state
    }
}

fn user(user_id: &str) -> MemoryUser {
    MemoryUser {
        user_id: user_id.to_string(),
        metadata: serde_json::json!({}),
        created_at: None,
        last_active_at: None,
    }
}

impl MemoryClient for MockMemory {
    async fn get_user(&self, user_id: &str) -> Result<Option<MemoryUser>, MemoryError> {
        let state = self.record("get_user");
        Ok(state.users.contains(user_id).then(|| user(user_id)))
    }

    async fn create_user(
        &self,
        user_id: &str,
        _metadata: serde_json::Value,
    ) -> Result<MemoryUser, MemoryError> {
        let mut state = self.record("create_user");
        if !state.users.insert(user_id.to_string()) {
            return Err(MemoryError::Conflict(format!("user {user_id} exists")));
        }
        Ok(user(user_id))
    }

    async fn list_sessions(
        &self,
        _user_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<SessionPage, MemoryError> {
        let state = self.record("list_sessions");
        let newest_first: Vec<MemorySession> = state.sessions.iter().rev().cloned().collect();
        let total = newest_first.len() as u64;
        let sessions: Vec<MemorySession> = newest_first
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        let has_more = u64::from(offset) + (sessions.len() as u64) < total;
        Ok(SessionPage {
            sessions,
            total,
            has_more,
        })
    }

    async fn create_session(
        &self,
        _user_id: &str,
        _auto_process_after_minutes: u32,
    ) -> Result<MemorySession, MemoryError> {
        let mut state = self.record("create_session");
        state.next_id += 1;
        let session = MemorySession {
            session_id: format!("s-new-{}", state.next_id),
            status: SessionStatus::Pending,
            created_at: None,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn get_session(
        &self,
        _user_id: &str,
        session_id: &str,
    ) -> Result<Option<MemorySession>, MemoryError> {
        let state = self.record("get_session");
        if state.hide_session_lookups {
            return Ok(None);
        }
        Ok(state
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    async fn add_message(
        &self,
        _user_id: &str,
        session_id: &str,
        role: SessionRole,
        content: &str,
    ) -> Result<(), MemoryError> {
        let mut state = self.record("add_message");
        let status = state
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .map(|s| s.status)
            .ok_or(MemoryError::SessionNotFound)?;
        if !status.is_open() {
            return Err(MemoryError::InvalidSessionState(format!(
                "session {session_id} is {status}"
            )));
        }
        state
            .messages
            .entry(session_id.to_string())
            .or_default()
            .push(SessionMessage {
                role,
                content: content.to_string(),
                timestamp: None,
            });
        Ok(())
    }

    async fn get_messages(
        &self,
        _user_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionMessage>, MemoryError> {
        let state = self.record("get_messages");
        Ok(state.messages.get(session_id).cloned().unwrap_or_default())
    }

    async fn get_context(
        &self,
        _user_id: &str,
        _session_id: &str,
    ) -> Result<ContextSummary, MemoryError> {
        let state = self.record("get_context");
        Ok(ContextSummary {
            context: state.context.clone(),
        })
    }

    async fn process_session(&self, _user_id: &str, session_id: &str) -> Result<(), MemoryError> {
        let mut state = self.record("process_session");
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or(MemoryError::SessionNotFound)?;
        session.status = SessionStatus::Processed;
        Ok(())
    }
}

// --- Messaging ---

#[derive(Default)]
struct MessagingState {
    /// Newest first, as the provider returns it.
    history: Vec<HistoryMessage>,
    sent: Vec<SendMessageRequest>,
    history_calls: usize,
    failing_history: bool,
    rejecting_sends: bool,
}

/// In-memory stand-in for the WhatsApp provider.
#[derive(Clone, Default)]
pub struct MockMessaging {
    state: Arc<Mutex<MessagingState>>,
}

impl MockMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, history: Vec<HistoryMessage>) -> Self {
        self.state.lock().unwrap().history = history;
        self
    }

    pub fn failing_history(self) -> Self {
        self.state.lock().unwrap().failing_history = true;
        self
    }

    pub fn rejecting_sends(self) -> Self {
        self.state.lock().unwrap().rejecting_sends = true;
        self
    }

    pub fn sent(&self) -> Vec<SendMessageRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn history_calls(&self) -> usize {
        self.state.lock().unwrap().history_calls
    }
}

/// A history entry with the given id, authored by us when `owner`.
pub fn history_item(id: &str, owner: bool) -> HistoryMessage {
    HistoryMessage {
        id: Some(id.to_string()),
        text: Some(format!("text of {id}")),
        owner,
        event_type: Some("message".to_string()),
        message_type: Some("text".to_string()),
        ..Default::default()
    }
}

impl MessagingClient for MockMessaging {
    async fn send_session_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, MessagingError> {
        let mut state = self.state.lock().unwrap();
        if state.rejecting_sends {
            return Ok(SendMessageResponse {
                ok: false,
                result: Some("session window closed".to_string()),
                message: None,
            });
        }
        state.sent.push(request.clone());
        Ok(SendMessageResponse {
            ok: true,
            result: Some("success".to_string()),
            message: None,
        })
    }

    async fn get_messages(
        &self,
        _phone_number: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<HistoryPage, MessagingError> {
        let mut state = self.state.lock().unwrap();
        state.history_calls += 1;
        if state.failing_history {
            return Err(MessagingError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }
        let start = (page_number.saturating_sub(1) * page_size) as usize;
        let items = state
            .history
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(HistoryPage {
            items,
            total: state.history.len() as u64,
            page_number,
            page_size,
        })
    }
}

// --- Email ---

struct EmailState {
    sent: Vec<OutboundEmail>,
    status: EmailStatus,
    failing: bool,
}

/// Records emails instead of sending them.
#[derive(Clone)]
pub struct MockEmail {
    state: Arc<Mutex<EmailState>>,
}

impl MockEmail {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EmailState {
                sent: Vec::new(),
                status: EmailStatus::Succeeded,
                failing: false,
            })),
        }
    }

    pub fn with_status(self, status: EmailStatus) -> Self {
        self.state.lock().unwrap().status = status;
        self
    }

    pub fn failing(self) -> Self {
        self.state.lock().unwrap().failing = true;
        self
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.state.lock().unwrap().sent.clone()
    }
}

impl EmailSender for MockEmail {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailDelivery, EmailError> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(EmailError::Transport("connection refused".to_string()));
        }
        state.sent.push(email.clone());
        Ok(EmailDelivery {
            operation_id: format!("op-{}", state.sent.len()),
            status: state.status,
        })
    }
}
