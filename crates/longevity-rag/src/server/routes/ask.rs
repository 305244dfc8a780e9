//! Question answering endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse};

/// POST /ask - answer a nutrition question from the indexed documents
pub async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>> {
    let Json(request) = payload.map_err(|e| Error::validation(e.body_text()))?;
    request.validate()?;

    let start = Instant::now();
    tracing::info!(
        "Question ({} chars, profile: {})",
        request.question.chars().count(),
        request.user_data.is_some()
    );

    let answer = state
        .composer()
        .answer(&request.question, request.user_data.as_ref())
        .await?;

    tracing::info!(
        "Answered from {} passages in {:?}",
        answer.passages_used,
        start.elapsed()
    );

    Ok(Json(AskResponse {
        answer: answer.text,
    }))
}
