use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use plaudit_db::Database;
use plaudit_db::listing::{self, ListParams, ReviewPage};
use plaudit_types::api::{AddResponseRequest, SubmitReviewRequest, UpdateReviewRequest};
use plaudit_types::models::{RatingSummary, Review, ReviewResponse};

use crate::error::{ApiError, REVIEW_NOT_FOUND};

const MISSING_FIELDS: &str = "Missing required fields";

/// Empty strings count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn not_found() -> ApiError {
    ApiError::NotFound(REVIEW_NOT_FOUND.into())
}

/// A create request with every required field present.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub id: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub user_image_url: Option<String>,
    pub item_id: String,
    pub rating: f64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl TryFrom<SubmitReviewRequest> for NewReview {
    type Error = ApiError;

    fn try_from(req: SubmitReviewRequest) -> Result<Self, Self::Error> {
        let missing = || ApiError::Validation(MISSING_FIELDS.into());
        Ok(Self {
            id: non_empty(req.id),
            user_id: non_empty(req.user_id).ok_or_else(missing)?,
            user_name: non_empty(req.user_name).ok_or_else(missing)?,
            user_image_url: req.user_image_url,
            item_id: non_empty(req.item_id).ok_or_else(missing)?,
            rating: req.rating.filter(|r| *r != 0.0).ok_or_else(missing)?,
            title: req.title,
            content: req.content,
            metadata: req.metadata,
        })
    }
}

/// An add-response request with every required field present.
#[derive(Debug, Clone)]
pub struct NewResponse {
    pub id: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub user_image_url: Option<String>,
    pub content: String,
    pub is_official: bool,
}

impl TryFrom<AddResponseRequest> for NewResponse {
    type Error = ApiError;

    fn try_from(req: AddResponseRequest) -> Result<Self, Self::Error> {
        let missing = || ApiError::Validation(MISSING_FIELDS.into());
        Ok(Self {
            id: non_empty(req.id),
            user_id: non_empty(req.user_id).ok_or_else(missing)?,
            user_name: non_empty(req.user_name).ok_or_else(missing)?,
            user_image_url: req.user_image_url,
            content: non_empty(req.content).ok_or_else(missing)?,
            is_official: req.is_official.unwrap_or(false),
        })
    }
}

/// Result of an update: the stored review plus the image references it no
/// longer points at.
#[derive(Debug, Clone)]
pub struct UpdatedReview {
    pub review: Review,
    pub replaced_images: Vec<String>,
}

/// Review operations over the shared in-memory database.
///
/// Each operation holds the database lock for its whole read-modify-write,
/// including the summary recompute.
#[derive(Debug, Default)]
pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get(&self, review_id: &str) -> Result<Review, ApiError> {
        self.db.with_state(|state| {
            state
                .reviews
                .find_by_id(review_id)
                .cloned()
                .ok_or_else(not_found)
        })
    }

    pub fn list(&self, params: &ListParams) -> Result<ReviewPage, ApiError> {
        self.db
            .with_state(|state| Ok(listing::query(state.reviews.iter(), params)?))
    }

    pub fn submit(&self, new: NewReview, image_urls: Vec<String>) -> Result<Review, ApiError> {
        self.db.with_state(|state| {
            if state
                .reviews
                .find_by_item_and_author(&new.item_id, &new.user_id)
                .is_some()
            {
                return Err(ApiError::Conflict(
                    "User has already reviewed this item".into(),
                ));
            }

            let now = Utc::now();
            let review = Review {
                id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                user_id: new.user_id,
                user_name: new.user_name,
                user_image_url: new.user_image_url,
                item_id: new.item_id,
                rating: new.rating,
                title: new.title,
                content: new.content,
                image_urls,
                created_at: now,
                updated_at: now,
                is_verified: false,
                responses: vec![],
                helpful_count: 0,
                metadata: new.metadata,
            };

            state.reviews.insert(review.clone());
            state.refresh_summary(&review.item_id);
            Ok(review)
        })
    }

    /// Merge `req` into the stored review. `image_urls` of `Some` replaces the
    /// whole image list; `None` keeps it.
    pub fn update(
        &self,
        review_id: &str,
        req: UpdateReviewRequest,
        image_urls: Option<Vec<String>>,
    ) -> Result<UpdatedReview, ApiError> {
        self.db.with_state(|state| {
            let mut review = state
                .reviews
                .find_by_id(review_id)
                .cloned()
                .ok_or_else(not_found)?;

            if req.user_id.as_deref().unwrap_or_default() != review.user_id {
                return Err(ApiError::Forbidden("User does not own this review".into()));
            }

            if let Some(name) = non_empty(req.user_name) {
                review.user_name = name;
            }
            if let Some(url) = non_empty(req.user_image_url) {
                review.user_image_url = Some(url);
            }
            if let Some(rating) = req.rating.filter(|r| *r != 0.0) {
                review.rating = rating;
            }
            if let Some(title) = req.title {
                review.title = title;
            }
            if let Some(content) = non_empty(req.content) {
                review.content = Some(content);
            }
            if let Some(metadata) = req.metadata {
                review.metadata = Some(metadata);
            }
            let replaced_images = match image_urls {
                Some(urls) => std::mem::replace(&mut review.image_urls, urls),
                None => Vec::new(),
            };
            review.updated_at = Utc::now();

            state.reviews.replace(review_id, review.clone())?;
            state.refresh_summary(&review.item_id);
            Ok(UpdatedReview {
                review,
                replaced_images,
            })
        })
    }

    /// Remove a review and return it so the caller can release its images.
    pub fn delete(&self, review_id: &str) -> Result<Review, ApiError> {
        self.db.with_state(|state| {
            let removed = state.reviews.remove(review_id)?;
            state.refresh_summary(&removed.item_id);
            Ok(removed)
        })
    }

    pub fn add_response(&self, review_id: &str, new: NewResponse) -> Result<Review, ApiError> {
        self.db.with_state(|state| {
            let review = state
                .reviews
                .find_by_id_mut(review_id)
                .ok_or_else(not_found)?;

            let now = Utc::now();
            review.responses.push(ReviewResponse {
                id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                user_id: new.user_id,
                user_name: new.user_name,
                user_image_url: new.user_image_url,
                content: new.content,
                created_at: now,
                is_official: new.is_official,
            });
            review.updated_at = now;
            Ok(review.clone())
        })
    }

    /// Apply one helpful vote (or retract one) and return the new count.
    /// The count never drops below zero.
    pub fn set_helpful(&self, review_id: &str, is_helpful: bool) -> Result<u64, ApiError> {
        self.db.with_state(|state| {
            let review = state
                .reviews
                .find_by_id_mut(review_id)
                .ok_or_else(not_found)?;
            review.helpful_count = if is_helpful {
                review.helpful_count + 1
            } else {
                review.helpful_count.saturating_sub(1)
            };
            Ok(review.helpful_count)
        })
    }

    pub fn rating_summary(&self, item_id: &str) -> Result<RatingSummary, ApiError> {
        self.db.with_state(|state| {
            Ok(state
                .summaries
                .get_or_compute(item_id, &state.reviews)
                .clone())
        })
    }

    pub fn has_reviewed(&self, item_id: &str, user_id: &str) -> Result<bool, ApiError> {
        self.db.with_state(|state| {
            Ok(state
                .reviews
                .find_by_item_and_author(item_id, user_id)
                .is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn submit_request(user_id: &str, item_id: &str, rating: f64) -> SubmitReviewRequest {
        SubmitReviewRequest {
            user_id: Some(user_id.into()),
            user_name: Some(format!("name-{}", user_id)),
            item_id: Some(item_id.into()),
            rating: Some(rating),
            ..Default::default()
        }
    }

    fn submit(service: &ReviewService, user_id: &str, item_id: &str, rating: f64) -> Review {
        let new = NewReview::try_from(submit_request(user_id, item_id, rating)).unwrap();
        service.submit(new, vec![]).unwrap()
    }

    fn update_request(user_id: &str) -> UpdateReviewRequest {
        UpdateReviewRequest {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    #[test]
    fn submit_sets_initial_state() {
        let service = ReviewService::default();
        let review = submit(&service, "u1", "p1", 4.0);

        assert!(!review.id.is_empty());
        assert!(!review.is_verified);
        assert_eq!(review.helpful_count, 0);
        assert!(review.responses.is_empty());
        assert_eq!(review.created_at, review.updated_at);
        assert_eq!(service.get(&review.id).unwrap(), review);
    }

    #[test]
    fn submit_honours_caller_supplied_id() {
        let service = ReviewService::default();
        let mut req = submit_request("u1", "p1", 5.0);
        req.id = Some("fixed-id".into());
        let review = service
            .submit(NewReview::try_from(req).unwrap(), vec!["/uploads/p1/a.png".into()])
            .unwrap();

        assert_eq!(review.id, "fixed-id");
        assert_eq!(review.image_urls, vec!["/uploads/p1/a.png".to_string()]);
    }

    #[test]
    fn submit_requires_fields() {
        let mut req = submit_request("u1", "p1", 4.0);
        req.user_name = None;
        assert!(matches!(NewReview::try_from(req), Err(ApiError::Validation(_))));

        let req = submit_request("", "p1", 4.0);
        assert!(matches!(NewReview::try_from(req), Err(ApiError::Validation(_))));

        let req = submit_request("u1", "p1", 0.0);
        assert!(matches!(NewReview::try_from(req), Err(ApiError::Validation(_))));
    }

    #[test]
    fn second_review_by_same_author_conflicts() {
        let service = ReviewService::default();
        submit(&service, "u1", "p1", 4.0);

        let again = NewReview::try_from(submit_request("u1", "p1", 2.0)).unwrap();
        assert!(matches!(service.submit(again, vec![]), Err(ApiError::Conflict(_))));

        // Same author, different item is fine.
        submit(&service, "u1", "p2", 2.0);
        assert!(service.has_reviewed("p1", "u1").unwrap());
        assert!(service.has_reviewed("p2", "u1").unwrap());
        assert!(!service.has_reviewed("p1", "u2").unwrap());
    }

    #[test]
    fn update_title_absent_keeps_and_empty_clears() {
        let service = ReviewService::default();
        let mut req = submit_request("u1", "p1", 4.0);
        req.title = Some("Solid".into());
        let review = service.submit(NewReview::try_from(req).unwrap(), vec![]).unwrap();

        let kept = service.update(&review.id, update_request("u1"), None).unwrap();
        assert_eq!(kept.review.title.as_deref(), Some("Solid"));

        let mut clear = update_request("u1");
        clear.title = Some(Some(String::new()));
        let cleared = service.update(&review.id, clear, None).unwrap();
        assert_eq!(cleared.review.title.as_deref(), Some(""));

        let mut null = update_request("u1");
        null.title = Some(None);
        let removed = service.update(&review.id, null, None).unwrap();
        assert_eq!(removed.review.title, None);
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let service = ReviewService::default();
        let mut req = submit_request("u1", "p1", 4.0);
        req.content = Some("original".into());
        let review = service.submit(NewReview::try_from(req).unwrap(), vec![]).unwrap();

        let mut update = update_request("u1");
        update.user_name = Some(String::new());
        update.content = Some(String::new());
        update.rating = Some(0.0);
        let same = service.update(&review.id, update, None).unwrap().review;
        assert_eq!(same.user_name, review.user_name);
        assert_eq!(same.content.as_deref(), Some("original"));
        assert_eq!(same.rating, 4.0);

        let mut update = update_request("u1");
        update.user_name = Some("Renamed".into());
        update.content = Some("revised".into());
        update.rating = Some(2.0);
        let changed = service.update(&review.id, update, None).unwrap().review;
        assert_eq!(changed.user_name, "Renamed");
        assert_eq!(changed.content.as_deref(), Some("revised"));
        assert_eq!(changed.rating, 2.0);
        assert_eq!(changed.created_at, review.created_at);
        assert!(changed.updated_at >= review.updated_at);
    }

    #[test]
    fn update_checks_existence_then_ownership() {
        let service = ReviewService::default();
        let review = submit(&service, "u1", "p1", 4.0);

        assert!(matches!(
            service.update("missing", update_request("u1"), None),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            service.update(&review.id, update_request("u2"), None),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            service.update(&review.id, UpdateReviewRequest::default(), None),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn update_images_replace_or_keep() {
        let service = ReviewService::default();
        let new = NewReview::try_from(submit_request("u1", "p1", 4.0)).unwrap();
        let review = service.submit(new, vec!["/uploads/p1/old.png".into()]).unwrap();

        let kept = service.update(&review.id, update_request("u1"), None).unwrap();
        assert_eq!(kept.review.image_urls, vec!["/uploads/p1/old.png".to_string()]);
        assert!(kept.replaced_images.is_empty());

        let replaced = service
            .update(
                &review.id,
                update_request("u1"),
                Some(vec!["/uploads/p1/new.png".into()]),
            )
            .unwrap();
        assert_eq!(replaced.review.image_urls, vec!["/uploads/p1/new.png".to_string()]);
        assert_eq!(replaced.replaced_images, vec!["/uploads/p1/old.png".to_string()]);
    }

    #[test]
    fn add_response_appends_and_touches_review() {
        let service = ReviewService::default();
        let review = submit(&service, "u1", "p1", 4.0);
        sleep(Duration::from_millis(5));

        let response = NewResponse::try_from(AddResponseRequest {
            user_id: Some("u2".into()),
            user_name: Some("Bob".into()),
            content: Some("thanks".into()),
            ..Default::default()
        })
        .unwrap();
        let updated = service.add_response(&review.id, response).unwrap();

        assert_eq!(updated.responses.len(), 1);
        assert_eq!(updated.responses[0].content, "thanks");
        assert!(!updated.responses[0].is_official);
        assert!(updated.updated_at > review.updated_at);
        assert_eq!(updated.updated_at, updated.responses[0].created_at);
    }

    #[test]
    fn add_response_validation_and_missing_review() {
        let missing_content = AddResponseRequest {
            user_id: Some("u2".into()),
            user_name: Some("Bob".into()),
            ..Default::default()
        };
        assert!(matches!(
            NewResponse::try_from(missing_content),
            Err(ApiError::Validation(_))
        ));

        let service = ReviewService::default();
        let response = NewResponse::try_from(AddResponseRequest {
            user_id: Some("u2".into()),
            user_name: Some("Bob".into()),
            content: Some("hi".into()),
            is_official: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert!(response.is_official);
        assert!(matches!(
            service.add_response("missing", response),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn helpful_count_never_goes_negative() {
        let service = ReviewService::default();
        let review = submit(&service, "u1", "p1", 4.0);

        for _ in 0..3 {
            assert_eq!(service.set_helpful(&review.id, false).unwrap(), 0);
        }
        assert_eq!(service.set_helpful(&review.id, true).unwrap(), 1);
        assert_eq!(service.set_helpful(&review.id, true).unwrap(), 2);
        assert_eq!(service.set_helpful(&review.id, false).unwrap(), 1);
        assert!(matches!(
            service.set_helpful("missing", true),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn summary_tracks_submit_update_and_delete() {
        let service = ReviewService::default();
        let review = submit(&service, "u1", "p1", 4.0);

        let summary = service.rating_summary("p1").unwrap();
        assert_eq!(summary.average_rating, 4.0);
        assert_eq!(summary.total_reviews, 1);
        assert_eq!(summary.rating_counts["4"], 1);

        let mut update = update_request("u1");
        update.rating = Some(2.0);
        service.update(&review.id, update, None).unwrap();
        let summary = service.rating_summary("p1").unwrap();
        assert_eq!(summary.average_rating, 2.0);
        assert_eq!(summary.rating_counts["4"], 0);
        assert_eq!(summary.rating_counts["2"], 1);

        service.delete(&review.id).unwrap();
        let summary = service.rating_summary("p1").unwrap();
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.total_reviews, 0);

        assert!(matches!(service.delete(&review.id), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn list_pages_through_item_reviews() {
        let service = ReviewService::default();
        for i in 0..15 {
            submit(&service, &format!("u{}", i), "X", 3.0);
        }
        submit(&service, "u0", "Y", 3.0);

        let mut params = ListParams::for_item("X");
        params.page = 2;
        let page = service.list(&params).unwrap();
        assert_eq!(page.reviews.len(), 5);
        assert_eq!(page.total_count, 15);
        assert_eq!(page.total_pages, 2);

        assert!(matches!(
            service.list(&ListParams::for_item("")),
            Err(ApiError::MissingParameter(_))
        ));
    }
}
