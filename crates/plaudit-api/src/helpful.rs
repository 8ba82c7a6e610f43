use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    response::IntoResponse,
};

use plaudit_types::api::{HelpfulRequest, HelpfulResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/reviews/{review_id}/helpful: votes are not tracked per voter.
/// An empty body counts as `isHelpful: false`.
pub async fn mark_helpful(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body?;
    let req: HelpfulRequest = if body.iter().all(|b| b.is_ascii_whitespace()) {
        HelpfulRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?
    };

    let helpful_count = state.service.set_helpful(&review_id, req.is_helpful)?;
    Ok(Json(HelpfulResponse {
        success: true,
        helpful_count,
    }))
}
