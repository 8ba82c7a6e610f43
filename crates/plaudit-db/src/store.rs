use plaudit_types::models::Review;

use crate::StoreError;

/// Review records in insertion order.
///
/// The store does not check identifier uniqueness on insert; lookups return
/// the first record with a matching id.
#[derive(Debug, Default)]
pub struct RecordStore {
    reviews: Vec<Review>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, review: Review) {
        self.reviews.push(review);
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Review> {
        self.reviews.iter().find(|r| r.id == id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Review> {
        self.reviews.iter_mut().find(|r| r.id == id)
    }

    pub fn find_by_item<'a>(&'a self, item_id: &'a str) -> impl Iterator<Item = &'a Review> + 'a {
        self.reviews.iter().filter(move |r| r.item_id == item_id)
    }

    pub fn find_by_item_and_author(&self, item_id: &str, user_id: &str) -> Option<&Review> {
        self.reviews
            .iter()
            .find(|r| r.item_id == item_id && r.user_id == user_id)
    }

    pub fn replace(&mut self, id: &str, review: Review) -> Result<(), StoreError> {
        let slot = self
            .find_by_id_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = review;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Review, StoreError> {
        let index = self
            .reviews
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(self.reviews.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Review> {
        self.reviews.iter()
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}
