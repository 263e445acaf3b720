pub mod auth;
pub mod error_handler;
pub mod rate_limit;
pub mod request_id;

pub use auth::{hash_api_key, sign_identity, verify_api_key, IdentityAuth, ServiceKeyAuth};
pub use error_handler::{json_error_handler, path_error_handler, query_error_handler, ErrorLogger};
pub use rate_limit::RateLimiter;
pub use request_id::{RequestId, RequestIdValue};
