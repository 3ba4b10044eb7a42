//! AcsEmailSender -- [`EmailSender`] implementation for Azure Communication
//! Services Email.
//!
//! Provides:
//! - `sign_request()` -- HMAC-SHA256 request signing with the resource access key
//! - `AcsEmailSender` -- submits `emails:send` and polls the returned
//!   operation until it reaches a terminal status

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use recallbot_core::email::sender::EmailSender;
use recallbot_types::email::{EmailDelivery, EmailError, EmailStatus, OutboundEmail};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2023-03-31";
const OPERATION_LOCATION: &str = "operation-location";

// ---------------------------------------------------------------------------
// Request signing
// ---------------------------------------------------------------------------

/// Headers that authenticate one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub date: String,
    pub content_hash: String,
    pub authorization: String,
}

/// The `host` component of the string to sign: host plus any explicit port.
fn signing_host(url: &Url) -> Result<String, EmailError> {
    let host = url
        .host_str()
        .ok_or_else(|| EmailError::Signing(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

/// Canonical string covered by the signature.
pub fn string_to_sign(method: &Method, url: &Url, date: &str, content_hash: &str) -> Result<String, EmailError> {
    Ok(format!(
        "{method}\n{}\n{date};{};{content_hash}",
        path_and_query(url),
        signing_host(url)?
    ))
}

/// Sign a request with the base64-encoded resource access key.
///
/// `date` must be an RFC 1123 timestamp in GMT; it is sent as `x-ms-date`.
pub fn sign_request(
    access_key: &str,
    method: &Method,
    url: &Url,
    body: &[u8],
    date: &str,
) -> Result<SignedHeaders, EmailError> {
    let key = STANDARD
        .decode(access_key.trim())
        .map_err(|e| EmailError::Signing(format!("access key is not valid base64: {e}")))?;

    let content_hash = STANDARD.encode(Sha256::digest(body));
    let to_sign = string_to_sign(method, url, date, &content_hash)?;

    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|e| EmailError::Signing(e.to_string()))?;
    mac.update(to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(SignedHeaders {
        date: date.to_string(),
        content_hash,
        authorization: format!(
            "HMAC-SHA256 SignedHeaders=x-ms-date;host;x-ms-content-sha256&Signature={signature}"
        ),
    })
}

fn rfc1123_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Status document of a send operation.
#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    id: Option<String>,
    status: EmailStatus,
}

/// Azure Communication Services email sender.
pub struct AcsEmailSender {
    client: reqwest::Client,
    endpoint: String,
    sender_address: String,
    access_key: SecretString,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl AcsEmailSender {
    pub fn new(
        endpoint: impl Into<String>,
        sender_address: impl Into<String>,
        access_key: SecretString,
    ) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EmailError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            sender_address: sender_address.into(),
            access_key,
            poll_interval: Duration::from_secs(1),
            poll_max_attempts: 60,
        })
    }

    /// Override how often and how many times the operation is polled.
    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_max_attempts = max_attempts;
        self
    }

    async fn signed(
        &self,
        method: Method,
        url: Url,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, EmailError> {
        let headers = sign_request(
            self.access_key.expose_secret(),
            &method,
            &url,
            &body,
            &rfc1123_now(),
        )?;

        let mut request = self
            .client
            .request(method, url)
            .header("x-ms-date", headers.date)
            .header("x-ms-content-sha256", headers.content_hash)
            .header(reqwest::header::AUTHORIZATION, headers.authorization);
        if !body.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn send_url(&self) -> Result<Url, EmailError> {
        Url::parse(&format!(
            "{}/emails:send?api-version={API_VERSION}",
            self.endpoint
        ))
        .map_err(|e| EmailError::Signing(format!("invalid endpoint: {e}")))
    }

    async fn poll(&self, url: Url, operation_id: String) -> Result<EmailDelivery, EmailError> {
        for attempt in 1..=self.poll_max_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = self.signed(Method::GET, url.clone(), Vec::new()).await?;
            let operation: OperationStatus = response
                .json()
                .await
                .map_err(|e| EmailError::Deserialization(e.to_string()))?;

            debug!(operation_id = %operation_id, attempt, status = %operation.status, "Polled email operation");
            if operation.status.is_terminal() {
                return Ok(EmailDelivery {
                    operation_id,
                    status: operation.status,
                });
            }
        }

        Err(EmailError::Timeout {
            operation_id,
            attempts: self.poll_max_attempts,
        })
    }
}

impl EmailSender for AcsEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<EmailDelivery, EmailError> {
        let body = serde_json::to_vec(&serde_json::json!({
            "senderAddress": self.sender_address,
            "recipients": {
                "to": [{ "address": email.recipient }]
            },
            "content": {
                "subject": email.subject,
                "plainText": email.body,
            }
        }))
        .map_err(|e| EmailError::Deserialization(e.to_string()))?;

        let response = self.signed(Method::POST, self.send_url()?, body).await?;

        let location = response
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let accepted: OperationStatus = response
            .json()
            .await
            .map_err(|e| EmailError::Deserialization(e.to_string()))?;
        let operation_id = accepted.id.unwrap_or_default();

        info!(
            recipient = %email.recipient,
            operation_id = %operation_id,
            status = %accepted.status,
            "Email submitted"
        );

        if accepted.status.is_terminal() {
            return Ok(EmailDelivery {
                operation_id,
                status: accepted.status,
            });
        }

        let location = location.ok_or_else(|| EmailError::Api {
            status: 202,
            body: "accepted without an Operation-Location header".to_string(),
        })?;
        let url = Url::parse(&location)
            .map_err(|e| EmailError::Deserialization(format!("invalid Operation-Location: {e}")))?;

        self.poll(url, operation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // base64("secret-key")
    const KEY: &str = "c2VjcmV0LWtleQ==";

    fn sender(server: &MockServer) -> AcsEmailSender {
        AcsEmailSender::new(
            server.uri(),
            "DoNotReply@example.com",
            SecretString::from(KEY.to_string()),
        )
        .unwrap()
        .with_polling(Duration::from_millis(5), 3)
    }

    fn email() -> OutboundEmail {
        OutboundEmail {
            recipient: "a@b.com".to_string(),
            subject: "hi".to_string(),
            body: "x".to_string(),
        }
    }

    #[test]
    fn test_string_to_sign_layout() {
        let url = Url::parse(
            "https://res.communication.azure.com/emails:send?api-version=2023-03-31",
        )
        .unwrap();
        let s = string_to_sign(&Method::POST, &url, "Mon, 01 Jan 2024 00:00:00 GMT", "HASH").unwrap();
        assert_eq!(
            s,
            "POST\n/emails:send?api-version=2023-03-31\nMon, 01 Jan 2024 00:00:00 GMT;res.communication.azure.com;HASH"
        );
    }

    #[test]
    fn test_signing_host_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/emails:send").unwrap();
        assert_eq!(signing_host(&url).unwrap(), "127.0.0.1:8080");
    }

    #[test]
    fn test_sign_request_is_verifiable() {
        let url = Url::parse("https://res.communication.azure.com/emails:send?api-version=2023-03-31").unwrap();
        let date = "Mon, 01 Jan 2024 00:00:00 GMT";
        let headers = sign_request(KEY, &Method::POST, &url, b"{}", date).unwrap();

        assert_eq!(headers.content_hash, STANDARD.encode(Sha256::digest(b"{}")));
        let signature = headers
            .authorization
            .strip_prefix("HMAC-SHA256 SignedHeaders=x-ms-date;host;x-ms-content-sha256&Signature=")
            .unwrap();

        let mut mac = HmacSha256::new_from_slice(b"secret-key").unwrap();
        mac.update(
            string_to_sign(&Method::POST, &url, date, &headers.content_hash)
                .unwrap()
                .as_bytes(),
        );
        mac.verify_slice(&STANDARD.decode(signature).unwrap()).unwrap();
    }

    #[test]
    fn test_invalid_key_is_signing_error() {
        let url = Url::parse("https://res.communication.azure.com/emails:send").unwrap();
        let err = sign_request("not base64!", &Method::POST, &url, b"", "date").unwrap_err();
        assert!(matches!(err, EmailError::Signing(_)));
    }

    #[tokio::test]
    async fn test_send_polls_until_succeeded() {
        let server = MockServer::start().await;
        let location = format!("{}/emails/operations/op-1?api-version=2023-03-31", server.uri());

        Mock::given(method("POST"))
            .and(path("/emails:send"))
            .and(query_param("api-version", "2023-03-31"))
            .and(header_exists("x-ms-date"))
            .and(header_exists("x-ms-content-sha256"))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({
                "senderAddress": "DoNotReply@example.com",
                "recipients": {"to": [{"address": "a@b.com"}]},
                "content": {"subject": "hi", "plainText": "x"}
            })))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Operation-Location", location.as_str())
                    .set_body_json(json!({"id": "op-1", "status": "Running"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/emails/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "op-1", "status": "Running"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/emails/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "op-1", "status": "Succeeded"})))
            .mount(&server)
            .await;

        let delivery = sender(&server).send(&email()).await.unwrap();
        assert!(delivery.succeeded());
        assert_eq!(delivery.operation_id, "op-1");
    }

    #[tokio::test]
    async fn test_send_reports_failed_status() {
        let server = MockServer::start().await;
        let location = format!("{}/emails/operations/op-2", server.uri());
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Operation-Location", location.as_str())
                    .set_body_json(json!({"id": "op-2", "status": "NotStarted"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "op-2", "status": "Failed"})))
            .mount(&server)
            .await;

        let delivery = sender(&server).send(&email()).await.unwrap();
        assert!(!delivery.succeeded());
        assert_eq!(delivery.status, EmailStatus::Failed);
    }

    #[tokio::test]
    async fn test_send_times_out_after_max_polls() {
        let server = MockServer::start().await;
        let location = format!("{}/emails/operations/op-3", server.uri());
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Operation-Location", location.as_str())
                    .set_body_json(json!({"id": "op-3", "status": "Running"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "op-3", "status": "Running"})))
            .expect(3)
            .mount(&server)
            .await;

        let err = sender(&server).send(&email()).await.unwrap_err();
        assert!(matches!(err, EmailError::Timeout { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_rejected_submission_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Denied"))
            .mount(&server)
            .await;

        let err = sender(&server).send(&email()).await.unwrap_err();
        assert!(matches!(err, EmailError::Api { status: 401, .. }));
    }
}
