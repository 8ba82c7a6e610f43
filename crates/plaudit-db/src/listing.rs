use std::cmp::Ordering;

use plaudit_types::models::Review;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ListError {
    #[error("itemId is required")]
    MissingItemId,
    #[error("limit must be at least 1")]
    ZeroLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Only an exact `"desc"` sorts descending; any other value sorts ascending.
    pub fn parse(value: &str) -> Self {
        if value == "desc" { Self::Desc } else { Self::Asc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    UserId,
    UserName,
    ItemId,
    Rating,
    Title,
    Content,
    #[default]
    CreatedAt,
    UpdatedAt,
    HelpfulCount,
    IsVerified,
}

impl SortField {
    /// Resolve a wire field name. Unknown names yield `None`, which leaves the
    /// filtered order untouched.
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "id" => Self::Id,
            "userId" => Self::UserId,
            "userName" => Self::UserName,
            "itemId" => Self::ItemId,
            "rating" => Self::Rating,
            "title" => Self::Title,
            "content" => Self::Content,
            "createdAt" => Self::CreatedAt,
            "updatedAt" => Self::UpdatedAt,
            "helpfulCount" => Self::HelpfulCount,
            "isVerified" => Self::IsVerified,
            _ => return None,
        };
        Some(field)
    }

    fn compare(self, a: &Review, b: &Review) -> Ordering {
        match self {
            Self::Id => collate(&a.id, &b.id),
            Self::UserId => collate(&a.user_id, &b.user_id),
            Self::UserName => collate(&a.user_name, &b.user_name),
            Self::ItemId => collate(&a.item_id, &b.item_id),
            Self::Rating => a.rating.total_cmp(&b.rating),
            Self::Title => collate_optional(a.title.as_deref(), b.title.as_deref()),
            Self::Content => collate_optional(a.content.as_deref(), b.content.as_deref()),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            Self::HelpfulCount => a.helpful_count.cmp(&b.helpful_count),
            Self::IsVerified => a.is_verified.cmp(&b.is_verified),
        }
    }
}

/// Case-insensitive text ordering; among strings equal ignoring case,
/// lowercase sorts first.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

fn collate_optional(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => collate(a, b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

#[derive(Debug, Clone)]
pub struct ListParams {
    pub item_id: String,
    pub page: u32,
    pub limit: u32,
    /// `None` keeps the filtered order.
    pub sort_by: Option<SortField>,
    pub sort_order: SortOrder,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

impl ListParams {
    pub fn for_item(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort_by: Some(SortField::default()),
            sort_order: SortOrder::default(),
            min_rating: None,
            max_rating: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub total_count: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Filter, sort and paginate `reviews`.
///
/// Pages are 1-indexed. A page past the end (or page 0) is empty, not an error.
/// The sort is stable, so reviews with equal keys keep their insertion order
/// in both directions.
pub fn query<'a, I>(reviews: I, params: &ListParams) -> Result<ReviewPage, ListError>
where
    I: IntoIterator<Item = &'a Review>,
{
    if params.item_id.is_empty() {
        return Err(ListError::MissingItemId);
    }
    if params.limit == 0 {
        return Err(ListError::ZeroLimit);
    }

    let mut matched: Vec<&Review> = reviews
        .into_iter()
        .filter(|r| r.item_id == params.item_id)
        .filter(|r| params.min_rating.is_none_or(|min| r.rating >= min))
        .filter(|r| params.max_rating.is_none_or(|max| r.rating <= max))
        .collect();

    if let Some(field) = params.sort_by {
        matched.sort_by(|a, b| match params.sort_order {
            SortOrder::Asc => field.compare(a, b),
            SortOrder::Desc => field.compare(b, a),
        });
    }

    let total_count = matched.len();
    let limit = params.limit as usize;
    let page = match params.page {
        0 => Vec::new(),
        n => matched
            .into_iter()
            .skip((n as usize - 1).saturating_mul(limit))
            .take(limit)
            .cloned()
            .collect(),
    };

    Ok(ReviewPage {
        reviews: page,
        total_count,
        page: params.page,
        limit: params.limit,
        total_pages: total_count.div_ceil(limit) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::review;
    use chrono::{Duration, Utc};

    fn fifteen_reviews() -> Vec<Review> {
        let base = Utc::now();
        (0..15)
            .map(|i| {
                let mut r = review(&format!("r{}", i), "X", &format!("u{}", i), (i % 5 + 1) as f64);
                r.created_at = base + Duration::seconds(i);
                r
            })
            .collect()
    }

    fn ids(page: &ReviewPage) -> Vec<&str> {
        page.reviews.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn second_page_holds_the_remainder() {
        let reviews = fifteen_reviews();
        let mut params = ListParams::for_item("X");
        params.page = 2;

        let page = query(&reviews, &params).unwrap();
        assert_eq!(page.reviews.len(), 5);
        assert_eq!(page.total_count, 15);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 10);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let reviews = fifteen_reviews();
        let mut params = ListParams::for_item("X");
        params.page = 3;

        let page = query(&reviews, &params).unwrap();
        assert!(page.reviews.is_empty());
        assert_eq!(page.total_pages, 2);

        params.page = 0;
        assert!(query(&reviews, &params).unwrap().reviews.is_empty());
    }

    #[test]
    fn defaults_sort_newest_first() {
        let reviews = fifteen_reviews();
        let page = query(&reviews, &ListParams::for_item("X")).unwrap();
        assert_eq!(page.reviews[0].id, "r14");
        assert_eq!(page.reviews[9].id, "r5");
    }

    #[test]
    fn filters_by_item_and_rating_bounds() {
        let mut reviews = fifteen_reviews();
        reviews.push(review("other", "Y", "u1", 3.0));

        let mut params = ListParams::for_item("X");
        params.min_rating = Some(2.0);
        params.max_rating = Some(3.0);
        params.limit = 50;

        let page = query(&reviews, &params).unwrap();
        assert_eq!(page.total_count, 6);
        assert!(page.reviews.iter().all(|r| r.item_id == "X"));
        assert!(page.reviews.iter().all(|r| (2.0..=3.0).contains(&r.rating)));
    }

    #[test]
    fn missing_item_id_and_zero_limit_are_errors() {
        let reviews = fifteen_reviews();
        assert_eq!(
            query(&reviews, &ListParams::for_item("")).unwrap_err(),
            ListError::MissingItemId
        );

        let mut params = ListParams::for_item("X");
        params.limit = 0;
        assert_eq!(query(&reviews, &params).unwrap_err(), ListError::ZeroLimit);
    }

    #[test]
    fn equal_keys_keep_insertion_order_both_ways() {
        let now = Utc::now();
        let mut reviews: Vec<Review> = ["a", "b", "c"]
            .iter()
            .map(|id| review(id, "X", id, 4.0))
            .collect();
        for r in &mut reviews {
            r.created_at = now;
        }

        let mut params = ListParams::for_item("X");
        assert_eq!(ids(&query(&reviews, &params).unwrap()), vec!["a", "b", "c"]);

        params.sort_order = SortOrder::Asc;
        params.sort_by = SortField::from_name("rating");
        assert_eq!(ids(&query(&reviews, &params).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn text_fields_sort_case_insensitively() {
        let mut reviews = vec![
            review("1", "X", "u1", 1.0),
            review("2", "X", "u2", 1.0),
            review("3", "X", "u3", 1.0),
        ];
        reviews[0].user_name = "carol".into();
        reviews[1].user_name = "Bob".into();
        reviews[2].user_name = "alice".into();

        let mut params = ListParams::for_item("X");
        params.sort_by = SortField::from_name("userName");
        params.sort_order = SortOrder::parse("asc");
        assert_eq!(ids(&query(&reviews, &params).unwrap()), vec!["3", "2", "1"]);

        params.sort_order = SortOrder::parse("desc");
        assert_eq!(ids(&query(&reviews, &params).unwrap()), vec!["1", "2", "3"]);
    }

    #[test]
    fn unknown_sort_field_keeps_filtered_order() {
        let reviews = fifteen_reviews();
        let mut params = ListParams::for_item("X");
        params.sort_by = SortField::from_name("nonsense");
        assert_eq!(params.sort_by, None);

        let page = query(&reviews, &params).unwrap();
        assert_eq!(page.reviews[0].id, "r0");
    }

    #[test]
    fn collation_breaks_case_ties_lowercase_first() {
        assert_eq!(collate("a", "A"), Ordering::Less);
        assert_eq!(collate("Apple", "banana"), Ordering::Less);
        assert_eq!(collate("same", "same"), Ordering::Equal);
    }

    #[test]
    fn absent_titles_sort_first_ascending() {
        let mut reviews = vec![review("1", "X", "u1", 1.0), review("2", "X", "u2", 1.0)];
        reviews[0].title = Some("Great".into());

        let mut params = ListParams::for_item("X");
        params.sort_by = Some(SortField::Title);
        params.sort_order = SortOrder::Asc;
        assert_eq!(ids(&query(&reviews, &params).unwrap()), vec!["2", "1"]);
    }
}
