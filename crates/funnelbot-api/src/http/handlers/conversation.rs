//! Conversation inspection and takeover release.

use std::time::Instant;

use axum::extract::{Path, State};
use funnelbot_types::conversation::{ConversationState, Stage};
use serde::Serialize;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/conversations/{user_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<ConversationState>, AppError> {
    let start = Instant::now();
    let conversation = state
        .service
        .snapshot(&user_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("no conversation with {user_id}")))?;

    Ok(ApiResponse::success(conversation, start)
        .with_link("release", &format!("/api/v1/conversations/{user_id}/release")))
}

#[derive(Debug, Serialize)]
pub struct Released {
    pub user_id: String,
    pub resumed: Stage,
}

/// POST /api/v1/conversations/{user_id}/release
///
/// Clears the human takeover flag; the bot resumes in the stage it held
/// before the escalation.
pub async fn release_conversation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Released>, AppError> {
    let start = Instant::now();
    let resumed = state
        .service
        .release(&user_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("{user_id} is not under human takeover")))?;

    Ok(ApiResponse::success(Released { user_id, resumed }, start))
}
