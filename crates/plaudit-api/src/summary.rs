use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn rating_summary(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.rating_summary(&item_id)?))
}
