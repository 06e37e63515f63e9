//! # Webhook Module
//!
//! HTTP surface for the assistant: Meta webhook verification, inbound
//! message intake, and the Google authorization callback.
//!
//! Inbound handling never surfaces an error to Meta; anything that goes
//! wrong is logged and the endpoint still answers ok, otherwise the platform
//! retries the delivery.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info, warn};
use serde::Deserialize;

use crate::command_handler::CommandHandler;
use crate::features::calendar::auth::{identity_from_state, redirect_uri};
use crate::features::calendar::GoogleCalendarClient;
use crate::features::whatsapp::OutboundSender;

/// Shared state for the webhook routes.
pub struct AppState {
    pub handler: CommandHandler,
    pub google: GoogleCalendarClient,
    pub sender: Arc<dyn OutboundSender>,
    pub verify_token: String,
    pub base_url: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", get(verify_subscription).post(receive_webhook))
        .route("/auth/callback", get(auth_callback))
        .layer(Extension(state))
}

// ============================================================================
// Webhook verification handshake
// ============================================================================

async fn verify_subscription(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match verification_reply(&state.verify_token, &params) {
        Some(challenge) => {
            info!("✅ Webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        None => {
            warn!("❌ Webhook verification failed: token or mode mismatch");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Echo the challenge only for a `subscribe` request carrying our token.
fn verification_reply(
    verify_token: &str,
    params: &HashMap<String, String>,
) -> Option<String> {
    let mode = params.get("hub.mode")?;
    let token = params.get("hub.verify_token")?;
    let challenge = params.get("hub.challenge")?;
    (mode == "subscribe" && token == verify_token).then(|| challenge.clone())
}

// ============================================================================
// Inbound messages
// ============================================================================

// Meta webhook payload, reduced to the fields the assistant reads.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
struct WebhookChange {
    value: ChangeValue,
}

#[derive(Debug, Deserialize)]
struct ChangeValue {
    /// Absent on delivery/read status callbacks, which are ignored.
    #[serde(default)]
    messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    from: String,
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    body: String,
}

async fn receive_webhook(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    match serde_json::from_value::<WebhookPayload>(payload) {
        Ok(payload) => {
            if let Some((from, body)) = first_text_message(&payload) {
                state.handler.handle_text(from, body).await;
            }
        }
        Err(e) => warn!("Ignoring unparseable webhook payload: {e}"),
    }
    Json(serde_json::json!({ "ok": true }))
}

/// The first text message in the payload, if any. Non-text messages and
/// status callbacks yield nothing.
fn first_text_message(payload: &WebhookPayload) -> Option<(&str, &str)> {
    let message = payload
        .entry
        .first()?
        .changes
        .first()?
        .value
        .messages
        .first()?;
    let text = message.text.as_ref()?;
    Some((message.from.as_str(), text.body.as_str()))
}

// ============================================================================
// Authorization callback
// ============================================================================

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: String,
    state: String,
}

async fn auth_callback(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let Some(identity) = identity_from_state(&params.state) else {
        warn!("Authorization callback with malformed state");
        return (
            StatusCode::BAD_REQUEST,
            "This link looks invalid. Head back to WhatsApp and send 'link calendar' again."
                .to_string(),
        );
    };

    let redirect = redirect_uri(&state.base_url);
    match state.google.exchange_code(&params.code, &redirect).await {
        Ok(grant) => match grant.refresh_token {
            Some(refresh_token) => {
                if let Err(e) = state
                    .handler
                    .on_credential_obtained(identity, &refresh_token)
                    .await
                {
                    error!("Failed to store credential for {identity}: {e}");
                    return (
                        StatusCode::OK,
                        "Something went wrong while linking. Please try 'link calendar' again."
                            .to_string(),
                    );
                }
                info!("🔗 Calendar linked for {identity}");
                (
                    StatusCode::OK,
                    "You can close this tab and return to WhatsApp ✅".to_string(),
                )
            }
            None => {
                // Happens when consent was granted previously without the
                // offline prompt; the user has to go through the link again.
                let nudge = "Linked, but Google did not return a refresh token. Send 'link calendar' again and accept permissions.";
                if let Err(e) = state.sender.send(identity, nudge).await {
                    error!("Failed to send relink nudge to {identity}: {e}");
                }
                (
                    StatusCode::OK,
                    "You can close this tab and return to WhatsApp ✅".to_string(),
                )
            }
        },
        Err(e) => {
            error!("Code exchange failed for {identity}: {e}");
            (
                StatusCode::OK,
                "Something went wrong while linking your calendar. Head back to WhatsApp and try 'link calendar' again."
                    .to_string(),
            )
        }
    }
}
