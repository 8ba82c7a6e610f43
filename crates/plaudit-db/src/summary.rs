use std::collections::HashMap;

use plaudit_types::models::{RatingSummary, Review};

use crate::store::RecordStore;

/// Histogram bucket for a rating: nearest integer, halves rounding up.
///
/// Ratings outside 1..=5 get their own bucket rather than being clamped.
pub fn star_bucket(rating: f64) -> String {
    let floor = rating.floor();
    let rounded = if rating - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    };
    // `+ 0.0` turns -0 into 0
    (rounded + 0.0).to_string()
}

/// Average, count and star histogram over `reviews`.
///
/// The caller is responsible for passing only the reviews of `item_id`.
pub fn compute_summary<'a, I>(item_id: &str, reviews: I) -> RatingSummary
where
    I: IntoIterator<Item = &'a Review>,
{
    let mut summary = RatingSummary::empty(item_id);
    let mut sum = 0.0;

    for review in reviews {
        sum += review.rating;
        summary.total_reviews += 1;
        *summary
            .rating_counts
            .entry(star_bucket(review.rating))
            .or_insert(0) += 1;
    }

    if summary.total_reviews > 0 {
        summary.average_rating = sum / summary.total_reviews as f64;
    }
    summary
}

/// Per-item summaries, recomputed on every write that touches an item's ratings
/// and filled on read when missing.
#[derive(Debug, Default)]
pub struct SummaryCache {
    entries: HashMap<String, RatingSummary>,
}

impl SummaryCache {
    pub fn get(&self, item_id: &str) -> Option<&RatingSummary> {
        self.entries.get(item_id)
    }

    pub fn invalidate(&mut self, item_id: &str) {
        self.entries.remove(item_id);
    }

    /// Drop any cached value for `item_id` and store a fresh one.
    pub fn refresh(&mut self, item_id: &str, store: &RecordStore) -> &RatingSummary {
        self.invalidate(item_id);
        self.get_or_compute(item_id, store)
    }

    /// Cached summary, computing and caching it on a miss.
    pub fn get_or_compute(&mut self, item_id: &str, store: &RecordStore) -> &RatingSummary {
        self.entries
            .entry(item_id.to_string())
            .or_insert_with(|| compute_summary(item_id, store.find_by_item(item_id)))
    }
}
