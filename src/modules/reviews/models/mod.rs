pub mod review;

pub use review::{ProjectReview, ReviewInput};
