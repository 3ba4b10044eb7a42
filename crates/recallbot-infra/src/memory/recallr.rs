//! RecallrClient -- [`MemoryClient`] implementation for the RecallrAI REST API.
//!
//! Every request carries the `X-Recallr-Api-Key` and `X-Recallr-Project-Id`
//! headers. Lookups of absent users and sessions return `Ok(None)`; an
//! append to a session that is no longer pending comes back as HTTP 400 and
//! is mapped to [`MemoryError::InvalidSessionState`].

use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use recallbot_core::memory::client::MemoryClient;
use recallbot_types::memory::{
    ContextSummary, MemoryError, MemorySession, MemoryUser, SessionMessage, SessionPage,
    SessionRole, SessionStatus,
};

const API_KEY_HEADER: &str = "X-Recallr-Api-Key";
const PROJECT_ID_HEADER: &str = "X-Recallr-Project-Id";
const MESSAGES_PAGE_SIZE: u32 = 100;

/// RecallrAI memory service client.
///
/// Does NOT derive Debug; the API key never leaves the request headers.
pub struct RecallrClient {
    client: reqwest::Client,
    api_key: SecretString,
    project_id: String,
    base_url: String,
}

/// Some endpoints wrap the object (`{"user": {...}}`), others return it bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    User { user: T },
    Session { session: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::User { user } => user,
            Envelope::Session { session } => session,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Session creation only guarantees the id.
#[derive(Deserialize)]
struct CreatedSession {
    session_id: String,
    #[serde(default)]
    status: Option<SessionStatus>,
}

#[derive(Deserialize)]
struct MessagePage {
    #[serde(default)]
    messages: Vec<SessionMessage>,
    #[serde(default)]
    has_more: bool,
}

impl RecallrClient {
    pub fn new(
        api_key: SecretString,
        project_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, MemoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MemoryError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            project_id: project_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/api/v1{path}", self.base_url))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(PROJECT_ID_HEADER, &self.project_id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, MemoryError> {
        request
            .send()
            .await
            .map_err(|e| MemoryError::Transport(e.to_string()))
    }

    /// Like [`Self::send`], but a 404 yields `Ok(None)`.
    async fn send_optional(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<reqwest::Response>, MemoryError> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response))
    }

    fn session_path(user_id: &str, session_id: &str) -> String {
        format!("/users/{user_id}/sessions/{session_id}")
    }
}

/// Decode a successful response body, mapping error statuses.
///
/// `not_found` is the error a 404 maps to for this call.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    not_found: MemoryError,
) -> Result<T, MemoryError> {
    let response = check_status(response, not_found).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| MemoryError::Deserialization(e.to_string()))
}

async fn check_status(
    response: reqwest::Response,
    not_found: MemoryError,
) -> Result<reqwest::Response, MemoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => not_found,
        StatusCode::BAD_REQUEST => MemoryError::InvalidSessionState(body),
        StatusCode::CONFLICT => MemoryError::Conflict(body),
        _ => MemoryError::Api {
            status: status.as_u16(),
            message: body,
        },
    })
}

impl MemoryClient for RecallrClient {
    async fn get_user(&self, user_id: &str) -> Result<Option<MemoryUser>, MemoryError> {
        let request = self.request(Method::GET, &format!("/users/{user_id}"));
        let Some(response) = self.send_optional(request).await? else {
            return Ok(None);
        };
        let user: Envelope<MemoryUser> = decode(response, MemoryError::UserNotFound).await?;
        Ok(Some(user.into_inner()))
    }

    async fn create_user(
        &self,
        user_id: &str,
        metadata: serde_json::Value,
    ) -> Result<MemoryUser, MemoryError> {
        let request = self
            .request(Method::POST, "/users")
            .json(&serde_json::json!({ "user_id": user_id, "metadata": metadata }));
        let response = self.send(request).await?;
        let user: Envelope<MemoryUser> = decode(response, MemoryError::UserNotFound).await?;
        Ok(user.into_inner())
    }

    async fn list_sessions(
        &self,
        user_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<SessionPage, MemoryError> {
        let request = self
            .request(Method::GET, &format!("/users/{user_id}/sessions"))
            .query(&[("offset", offset), ("limit", limit)]);
        let response = self.send(request).await?;
        decode(response, MemoryError::UserNotFound).await
    }

    async fn create_session(
        &self,
        user_id: &str,
        auto_process_after_minutes: u32,
    ) -> Result<MemorySession, MemoryError> {
        let request = self
            .request(Method::POST, &format!("/users/{user_id}/sessions"))
            .json(&serde_json::json!({
                "auto_process_after_minutes": auto_process_after_minutes
            }));
        let response = self.send(request).await?;
        let created: Envelope<CreatedSession> =
            decode(response, MemoryError::UserNotFound).await?;
        let created = created.into_inner();

        debug!(user_id, session_id = %created.session_id, "Session created");
        Ok(MemorySession {
            session_id: created.session_id,
            status: created.status.unwrap_or(SessionStatus::Pending),
            created_at: None,
        })
    }

    async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<MemorySession>, MemoryError> {
        let request = self.request(Method::GET, &Self::session_path(user_id, session_id));
        let Some(response) = self.send_optional(request).await? else {
            return Ok(None);
        };
        let session: Envelope<MemorySession> =
            decode(response, MemoryError::SessionNotFound).await?;
        Ok(Some(session.into_inner()))
    }

    async fn add_message(
        &self,
        user_id: &str,
        session_id: &str,
        role: SessionRole,
        content: &str,
    ) -> Result<(), MemoryError> {
        let path = format!("{}/add-message", Self::session_path(user_id, session_id));
        let request = self
            .request(Method::POST, &path)
            .json(&serde_json::json!({ "role": role, "message": content }));
        let response = self.send(request).await?;
        check_status(response, MemoryError::SessionNotFound).await?;
        Ok(())
    }

    async fn get_messages(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<SessionMessage>, MemoryError> {
        let path = format!("{}/messages", Self::session_path(user_id, session_id));
        let mut messages = Vec::new();
        let mut offset = 0;

        loop {
            let request = self
                .request(Method::GET, &path)
                .query(&[("offset", offset), ("limit", MESSAGES_PAGE_SIZE)]);
            let response = self.send(request).await?;
            let page: MessagePage = decode(response, MemoryError::SessionNotFound).await?;

            let fetched = page.messages.len() as u32;
            messages.extend(page.messages);
            if !page.has_more || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        Ok(messages)
    }

    async fn get_context(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<ContextSummary, MemoryError> {
        let path = format!("{}/context", Self::session_path(user_id, session_id));
        let response = self.send(self.request(Method::GET, &path)).await?;
        decode(response, MemoryError::SessionNotFound).await
    }

    async fn process_session(&self, user_id: &str, session_id: &str) -> Result<(), MemoryError> {
        let path = format!("{}/process", Self::session_path(user_id, session_id));
        let response = self.send(self.request(Method::POST, &path)).await?;
        check_status(response, MemoryError::SessionNotFound).await?;
        Ok(())
    }
}
