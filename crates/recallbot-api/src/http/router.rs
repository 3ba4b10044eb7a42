//! Axum router configuration with middleware.
//!
//! Routes: `POST /webhook`, `GET /health`. Middleware: request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use recallbot_types::webhook::HealthResponse;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handlers::webhook::receive_webhook))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness check.
async fn health_check() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use recallbot_core::support::handler::SupportBot;
    use recallbot_infra::llm::create_provider;
    use recallbot_infra::memory::RecallrClient;
    use recallbot_infra::messaging::WatiClient;
    use recallbot_types::config::{AgentSettings, OpenAiSettings};

    use super::*;

    // Every upstream points at a closed port: tests using `state()` only
    // cover paths that must not make outbound calls.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn state() -> AppState {
        state_with(UNREACHABLE, UNREACHABLE, UNREACHABLE)
    }

    fn state_with(openai_url: &str, memory_url: &str, wati_url: &str) -> AppState {
        let provider = create_provider(&OpenAiSettings {
            api_key: "sk-test".to_string(),
            base_url: openai_url.to_string(),
        })
        .unwrap();
        let memory =
            RecallrClient::new(SecretString::from("rk".to_string()), "proj", memory_url).unwrap();
        let messaging = WatiClient::new("tok", wati_url).unwrap();

        AppState {
            support: Arc::new(SupportBot::new(
                provider,
                memory,
                messaging,
                vec!["15550001".to_string()],
                AgentSettings::default(),
            )),
        }
    }

    async fn post_webhook(body: Body) -> (StatusCode, Value) {
        post_webhook_to(state(), body).await
    }

    async fn post_webhook_to(state: AppState, body: Body) -> (StatusCode, Value) {
        let response = build_router(state)
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = build_router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn outgoing_message_is_ignored() {
        let event = json!({"eventType": "message", "owner": true, "waId": "15550001", "type": "text", "text": "hi"});
        let (status, body) = post_webhook(Body::from(event.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ignored");
    }

    #[tokio::test]
    async fn unknown_sender_is_ignored() {
        let event = json!({"eventType": "message", "owner": false, "waId": "19990000", "type": "text", "text": "hi"});
        let (status, body) = post_webhook(Body::from(event.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ignored");
        assert_eq!(body["reason"], "phone number not allowed");
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let (status, body) = post_webhook(Body::from("{not json")).await;
        assert!(status.is_client_error());
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = build_router(state())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn incoming_message_is_answered_end_to_end() {
        let openai = MockServer::start().await;
        let memory = MockServer::start().await;
        let wati = MockServer::start().await;
        let user = "/api/v1/users/whatsapp_15550001_prod";

        Mock::given(method("GET"))
            .and(path("/api/v1/getMessages/15550001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "success",
                "messages": {"items": [], "total": 0, "pageNumber": 1, "pageSize": 100}
            })))
            .mount(&wati)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sendSessionMessage/15550001"))
            .and(query_param("messageText", "Hello from recallbot"))
            .and(query_param("replyContextId", "wamid.1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": "success"})),
            )
            .expect(1)
            .mount(&wati)
            .await;

        Mock::given(method("GET"))
            .and(path(user))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"user_id": "whatsapp_15550001_prod", "metadata": {}}
            })))
            .mount(&memory)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{user}/sessions")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sessions": [], "total": 0, "has_more": false
            })))
            .mount(&memory)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{user}/sessions")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"session_id": "s1", "status": "pending"})),
            )
            .expect(1)
            .mount(&memory)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{user}/sessions/s1/add-message")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(2)
            .mount(&memory)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{user}/sessions/s1/messages")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"role": "user", "content": "Hi there"}],
                "has_more": false
            })))
            .mount(&memory)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{user}/sessions/s1/context")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"context": "Prefers short answers"})),
            )
            .mount(&memory)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello from recallbot"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24}
            })))
            .expect(1)
            .mount(&openai)
            .await;

        let state = state_with(
            &format!("{}/v1", openai.uri()),
            &memory.uri(),
            &format!("{}/api/v1", wati.uri()),
        );
        let event = json!({
            "id": "in-1",
            "whatsappMessageId": "wamid.1",
            "eventType": "message",
            "owner": false,
            "waId": "15550001",
            "type": "text",
            "text": "Hi there"
        });
        let (status, body) = post_webhook_to(state, Body::from(event.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["response"], "Hello from recallbot");

        let sends = wati
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path().starts_with("/api/v1/sendSessionMessage/"))
            .count();
        assert_eq!(sends, 1);
    }
}
