use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value};

use crate::models::Review;

/// Marks a field as present whenever its key appears, even with a `null` value.
/// Paired with `#[serde(default)]` on an `Option<Option<T>>` so a missing key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accepts a rating sent as a number or as a numeric string (`"4"`).
/// A blank string counts as not supplied.
fn number_or_text<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            match text.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(de::Error::custom(format!(
                    "rating is not a number: {:?}",
                    text
                ))),
            }
        }
    }
}

// -- Reviews --

/// The `review` JSON blob of a create request. Every field is optional on the
/// wire; required ones are checked before anything is stored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub id: Option<String>,
    #[serde(alias = "authorId")]
    pub user_id: Option<String>,
    #[serde(alias = "authorName")]
    pub user_name: Option<String>,
    #[serde(alias = "authorImageUrl")]
    pub user_image_url: Option<String>,
    pub item_id: Option<String>,
    #[serde(default, deserialize_with = "number_or_text")]
    pub rating: Option<f64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// The `review` JSON blob of an update request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    #[serde(alias = "authorId")]
    pub user_id: Option<String>,
    #[serde(alias = "authorName")]
    pub user_name: Option<String>,
    #[serde(alias = "authorImageUrl")]
    pub user_image_url: Option<String>,
    #[serde(default, deserialize_with = "number_or_text")]
    pub rating: Option<f64>,
    /// Outer `None`: key absent. `Some(None)`: explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListResponse {
    pub reviews: Vec<Review>,
    pub total_count: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HasReviewedResponse {
    pub has_reviewed: bool,
}

// -- Responses --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddResponseRequest {
    pub id: Option<String>,
    #[serde(alias = "authorId")]
    pub user_id: Option<String>,
    #[serde(alias = "authorName")]
    pub user_name: Option<String>,
    #[serde(alias = "authorImageUrl")]
    pub user_image_url: Option<String>,
    pub content: Option<String>,
    pub is_official: Option<bool>,
}

// -- Helpful votes --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpfulRequest {
    #[serde(default)]
    pub is_helpful: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpfulResponse {
    pub success: bool,
    pub helpful_count: u64,
}
