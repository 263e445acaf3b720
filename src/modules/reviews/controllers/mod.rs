pub mod review_controller;

pub use review_controller::configure;
