pub mod review_service;

pub use review_service::{ResponseInput, ReviewService};
