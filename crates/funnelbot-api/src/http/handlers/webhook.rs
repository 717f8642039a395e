//! Inbound webhook: the chat gateway posts every received message here.
//!
//! When `FUNNELBOT_WEBHOOK_SECRET` is set, the raw body must carry a valid
//! HMAC-SHA256 signature in `x-funnelbot-signature`. Accepted messages are
//! queued to the funnel run loop and answered with 202.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use funnelbot_infra::webhook::{SIGNATURE_HEADER, verify};
use funnelbot_types::message::{InboundMessage, TransportEvent};
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InboundAccepted {
    pub user_id: String,
    /// False for echoes, groups and broadcasts, which are dropped unanswered.
    pub dispatchable: bool,
}

/// POST /api/v1/webhook/inbound
#[tracing::instrument(name = "funnel.webhook", skip_all)]
pub async fn receive_inbound(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<InboundAccepted>, AppError> {
    let start = Instant::now();

    if let Some(secret) = &state.webhook_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        verify(secret.expose_secret().as_bytes(), &body, signature).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected unsigned or mis-signed webhook");
        })?;
    }

    let message: InboundMessage =
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(format!("invalid inbound message: {e}")))?;
    if message.user_id.trim().is_empty() {
        return Err(AppError::Validation("userId must not be empty".into()));
    }

    let accepted = InboundAccepted {
        user_id: message.user_id.clone(),
        dispatchable: message.is_dispatchable(),
    };

    state
        .inbound
        .try_send(TransportEvent::Message(message))
        .map_err(|e| match e {
            TrySendError::Full(_) => AppError::Busy("inbound queue is full, retry later".into()),
            TrySendError::Closed(_) => AppError::Internal("funnel service is not running".into()),
        })?;

    tracing::debug!(user_id = %accepted.user_id, "inbound message queued");
    Ok(ApiResponse::accepted(accepted, start))
}
