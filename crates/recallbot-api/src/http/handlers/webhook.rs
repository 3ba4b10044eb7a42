//! Webhook receiver for WhatsApp events.
//!
//! The provider retries deliveries that do not get a 2xx, so every outcome
//! the support bot produces (including errors) is answered with `200 OK`
//! and a [`WebhookResponse`] body. Only undecodable payloads are rejected.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use tracing::{Instrument, info_span, warn};

use recallbot_types::webhook::{WebhookEvent, WebhookResponse};

use crate::state::AppState;

/// POST /webhook - Handle one event from the messaging provider.
pub async fn receive_webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookEvent>, JsonRejection>,
) -> (StatusCode, Json<WebhookResponse>) {
    let Json(event) = match payload {
        Ok(event) => event,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected webhook payload");
            return (
                rejection.status(),
                Json(WebhookResponse::error(rejection.body_text())),
            );
        }
    };

    let span = info_span!(
        "webhook",
        message_id = event.id.as_deref().unwrap_or("-"),
        wa_id = event.wa_id.as_deref().unwrap_or("-"),
    );
    let response = state.support.handle(&event).instrument(span).await;

    (StatusCode::OK, Json(response))
}
