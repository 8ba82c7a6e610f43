use std::sync::Arc;

use crate::images::ImageStore;
use crate::service::ReviewService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: ReviewService,
    pub images: ImageStore,
}
