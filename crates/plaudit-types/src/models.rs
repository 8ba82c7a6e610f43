use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Star values that always appear in a summary histogram, even when empty.
pub const STAR_KEYS: [&str; 5] = ["1", "2", "3", "4", "5"];

/// A user's rated opinion of one item.
///
/// Serialized with the camelCase field names the storefront client expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_image_url: Option<String>,
    pub item_id: String,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Never set by any write path; reserved for purchase verification.
    pub is_verified: bool,
    #[serde(default)]
    pub responses: Vec<ReviewResponse>,
    pub helpful_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// A reply attached to a review. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_image_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_official: bool,
}

/// Aggregate rating statistics for every review of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub item_id: String,
    pub average_rating: f64,
    pub total_reviews: u64,
    /// Rounded star value -> number of reviews. Keys "1".."5" are always present.
    pub rating_counts: BTreeMap<String, u64>,
}

impl RatingSummary {
    /// Summary of an item with no reviews.
    pub fn empty(item_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            average_rating: 0.0,
            total_reviews: 0,
            rating_counts: STAR_KEYS.iter().map(|k| (k.to_string(), 0)).collect(),
        }
    }
}
