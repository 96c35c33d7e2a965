use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::warn;

/// Retry settings shared by both outbound gateways. The default never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(250),
        }
    }
}

pub fn build_client(timeout: Option<Duration>) -> reqwest::Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Sends the request built by `make_request`, retrying connect/timeout failures and
/// 5xx responses up to `policy.max_retries` extra times. The last response or error
/// is returned unchanged.
pub async fn send_with_retry<F>(policy: RetryPolicy, make_request: F) -> reqwest::Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let result = make_request().send().await;
        let retryable = match &result {
            Ok(response) => response.status().is_server_error(),
            Err(err) => is_retryable_error(err),
        };

        if !retryable || attempt >= policy.max_retries {
            return result;
        }

        attempt += 1;
        warn!(attempt, max_retries = policy.max_retries, "Outbound request failed, retrying.");
        tokio::time::sleep(policy.backoff * attempt).await;
    }
}
