//! Backend-agnostic pieces: the error type and the bounded-retry helper
//! the Postgres connector builds on.

pub mod error;
pub mod retry;

pub use error::{DatabaseError, DatabaseResult};
pub use retry::{retry, retry_with_backoff, RetryConfig};
