pub mod gateways;
pub mod health;
pub mod installations;
pub mod payments;
pub mod projects;
pub mod reviews;
