//! SolarTrust project lifecycle and BNPL payment orchestrator.
//!
//! Turns approved contractor quotes into projects and carries them through payment,
//! installation, OTP-verified handover and review.

pub mod app;
pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

// Re-export commonly used types
pub use modules::gateways;
pub use modules::installations;
pub use modules::payments;
pub use modules::projects;
pub use modules::reviews;
