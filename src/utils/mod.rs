//! Shared utilities
//!
//! Error types and the monotonic clock abstraction used across the crate.

pub mod clock;
pub mod error;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{AppError, AppResult, ErrorResponse};
