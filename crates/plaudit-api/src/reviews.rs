use std::fmt;
use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, Request, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Deserializer, de};
use tracing::info;

use plaudit_db::listing::{DEFAULT_LIMIT, DEFAULT_PAGE, ListParams, SortField, SortOrder};
use plaudit_types::api::{
    HasReviewedResponse, ReviewListResponse, SubmitReviewRequest, SuccessResponse,
    UpdateReviewRequest,
};

use crate::error::ApiError;
use crate::images::read_review_body;
use crate::service::NewReview;
use crate::state::AppState;

/// Query values where `key=` means the same as leaving the key out.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map(Some).map_err(de::Error::custom)
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub item_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_rating: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_rating: Option<f64>,
}

impl From<ListReviewsQuery> for ListParams {
    fn from(query: ListReviewsQuery) -> Self {
        Self {
            item_id: query.item_id.unwrap_or_default(),
            page: query.page.unwrap_or(DEFAULT_PAGE),
            limit: query.limit.unwrap_or(DEFAULT_LIMIT),
            sort_by: match query.sort_by.as_deref() {
                Some(name) => SortField::from_name(name),
                None => Some(SortField::default()),
            },
            sort_order: query
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
            min_rating: query.min_rating,
            max_rating: query.max_rating,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReviewQuery {
    pub item_id: Option<String>,
    pub user_id: Option<String>,
}

/// GET /api/reviews?itemId=…&page=…&limit=…&sortBy=…&sortOrder=…&minRating=…&maxRating=…
pub async fn list_reviews(
    State(state): State<AppState>,
    query: Result<Query<ListReviewsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let page = state.service.list(&query.into())?;
    Ok(Json(ReviewListResponse {
        reviews: page.reviews,
        total_count: page.total_count,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
    }))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get(&review_id)?))
}

/// POST /api/reviews: multipart with a `review` JSON part and optional
/// `images` parts, or a plain JSON review without images. Stored images are
/// removed again if the review is rejected.
pub async fn create_review(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_review_body::<SubmitReviewRequest>(request).await?;
    let new_review = NewReview::try_from(form.review)?;
    let image_urls = state.images.save(&new_review.item_id, form.images).await?;

    match state.service.submit(new_review, image_urls.clone()) {
        Ok(review) => {
            info!(
                "Review {} created for item {} by {}",
                review.id, review.item_id, review.user_id
            );
            Ok((StatusCode::CREATED, Json(review)))
        }
        Err(e) => {
            state.images.remove_urls(&image_urls).await;
            Err(e)
        }
    }
}

/// PUT /api/reviews/{review_id}: same body shape as create. New images
/// replace the old set, whose files are then deleted.
pub async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_review_body::<UpdateReviewRequest>(request).await?;
    let existing = state.service.get(&review_id)?;

    let new_urls = if form.images.is_empty() {
        None
    } else {
        Some(state.images.save(&existing.item_id, form.images).await?)
    };

    match state.service.update(&review_id, form.review, new_urls.clone()) {
        Ok(updated) => {
            state.images.remove_urls(&updated.replaced_images).await;
            Ok(Json(updated.review))
        }
        Err(e) => {
            if let Some(urls) = &new_urls {
                state.images.remove_urls(urls).await;
            }
            Err(e)
        }
    }
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.service.delete(&review_id)?;
    state.images.remove_urls(&removed.image_urls).await;
    info!("Review {} deleted from item {}", removed.id, removed.item_id);
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/reviews/check?itemId=…&userId=…
pub async fn check_reviewed(
    State(state): State<AppState>,
    query: Result<Query<CheckReviewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let (Some(item_id), Some(user_id)) = (
        query.item_id.filter(|v| !v.is_empty()),
        query.user_id.filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::MissingParameter(
            "itemId and userId are required".into(),
        ));
    };

    let has_reviewed = state.service.has_reviewed(&item_id, &user_id)?;
    Ok(Json(HasReviewedResponse { has_reviewed }))
}
