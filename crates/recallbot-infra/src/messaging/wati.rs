//! WatiClient -- [`MessagingClient`] implementation for the WATI WhatsApp API.
//!
//! `base_url` is the tenant API root including `/api/v1`. The token is sent
//! in the `Authorization` header; tokens copied from the WATI dashboard
//! already carry the `Bearer ` prefix, bare tokens get it added.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use recallbot_core::messaging::client::MessagingClient;
use recallbot_types::messaging::{
    HistoryPage, MessagingError, SendMessageRequest, SendMessageResponse,
};

const BEARER_PREFIX: &str = "Bearer ";

/// WATI API client.
///
/// Does NOT derive Debug; the token never leaves the request headers.
pub struct WatiClient {
    client: reqwest::Client,
    authorization: SecretString,
    base_url: String,
}

/// Envelope of `GET /getMessages/{phone}`.
#[derive(Deserialize)]
struct MessagesEnvelope {
    #[serde(default)]
    result: Option<String>,
    messages: Option<HistoryPage>,
}

impl WatiClient {
    pub fn new(api_token: &str, base_url: impl Into<String>) -> Result<Self, MessagingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MessagingError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            authorization: SecretString::from(authorization_value(api_token)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, MessagingError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, self.authorization.expose_secret())
            .send()
            .await
            .map_err(|e| MessagingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// The `Authorization` header value for a configured token.
fn authorization_value(api_token: &str) -> String {
    let token = api_token.trim();
    if token.starts_with(BEARER_PREFIX) {
        token.to_string()
    } else {
        format!("{BEARER_PREFIX}{token}")
    }
}

impl MessagingClient for WatiClient {
    async fn send_session_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, MessagingError> {
        let url = format!("{}/sendSessionMessage/{}", self.base_url, request.phone_number);

        let mut query = vec![("messageText", request.message_text.as_str())];
        if let Some(reply_context_id) = request.reply_context_id.as_deref() {
            query.push(("replyContextId", reply_context_id));
        }

        let response = self.send(self.client.post(url).query(&query)).await?;
        let sent: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| MessagingError::Deserialization(e.to_string()))?;

        debug!(
            phone_number = %request.phone_number,
            ok = sent.ok,
            result = sent.result.as_deref().unwrap_or("-"),
            "WATI send response"
        );
        Ok(sent)
    }

    async fn get_messages(
        &self,
        phone_number: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<HistoryPage, MessagingError> {
        let url = format!("{}/getMessages/{phone_number}", self.base_url);
        let request = self
            .client
            .get(url)
            .query(&[("pageSize", page_size), ("pageNumber", page_number)]);

        let envelope: MessagesEnvelope = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| MessagingError::Deserialization(e.to_string()))?;

        match envelope.result.as_deref() {
            Some("success") | None => Ok(envelope.messages.unwrap_or_default()),
            Some(other) => Err(MessagingError::Rejected(other.to_string())),
        }
    }
}
