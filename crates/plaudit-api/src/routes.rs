use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::images::MAX_REQUEST_BODY;
use crate::state::AppState;
use crate::{helpful, responses, reviews, summary};

/// All JSON and multipart routes. Static image serving is mounted by the
/// server binary, which knows the upload directory.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route("/api/reviews/check", get(reviews::check_reviewed))
        .route(
            "/api/reviews/{review_id}",
            get(reviews::get_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route(
            "/api/reviews/{review_id}/responses",
            post(responses::add_response),
        )
        .route("/api/reviews/{review_id}/helpful", post(helpful::mark_helpful))
        .route("/api/items/{item_id}/rating-summary", get(summary::rating_summary))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
