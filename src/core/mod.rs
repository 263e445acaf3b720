pub mod caller;
pub mod error;
pub mod money;
pub mod time;

pub use caller::{Caller, Role};
pub use error::{AppError, ErrorKind, Result};
pub use time::{Clock, FixedClock, SystemClock};
