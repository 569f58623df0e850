// digitall-api: resilient HTTP fetch primitive for the Digitall subscription API

pub mod error;
pub mod http;
pub mod retry;
pub mod transport;

pub use error::Error;
pub use http::{HttpClient, HttpResponse, HttpSend};
pub use retry::{AttemptHook, RetryOptions, backoff_delay, fetch_with_retry, is_retryable_status};
pub use transport::TransportConfig;
