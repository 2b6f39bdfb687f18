pub mod retry;

pub use retry::{retry_with_backoff, RetryConfig, RetryExecutor, RetryExhausted, DEFAULT_MAX_ATTEMPTS};
