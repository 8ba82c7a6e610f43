pub mod error;
pub mod helpful;
pub mod images;
pub mod responses;
pub mod reviews;
pub mod routes;
pub mod service;
pub mod state;
pub mod summary;

pub use routes::router;
