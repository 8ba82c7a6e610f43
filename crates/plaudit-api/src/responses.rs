use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use plaudit_types::api::AddResponseRequest;

use crate::error::ApiError;
use crate::service::NewResponse;
use crate::state::AppState;

/// POST /api/reviews/{review_id}/responses: returns the whole review with
/// the new response appended.
pub async fn add_response(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    payload: Result<Json<AddResponseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let response = NewResponse::try_from(req)?;
    let review = state.service.add_response(&review_id, response)?;
    debug!(
        "Review {} now has {} responses",
        review.id,
        review.responses.len()
    );
    Ok((StatusCode::CREATED, Json(review)))
}
