// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

use crate::error::Result;
use crate::models::HttpConfig;
use crate::utils::retry::RetryPolicy;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a request, retrying transport errors and retryable statuses.
///
/// `build` is called once per attempt. The final response is returned
/// whatever its status; callers decide what a failure means for them.
pub async fn send_with_retry<F>(policy: &RetryPolicy, label: &str, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let outcome = build().send().await;
        let retry_reason = match &outcome {
            Ok(resp) if RetryPolicy::is_retryable_status(resp.status()) => {
                Some(format!("HTTP {}", resp.status()))
            }
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };

        match retry_reason {
            Some(reason) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt, &mut rand::thread_rng());
                log::warn!(
                    "{} failed ({}), retry {}/{} in {:?}",
                    label,
                    reason,
                    attempt + 1,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            _ => return Ok(outcome?),
        }
    }
}

/// GET a URL with retries.
pub async fn get_with_retry(client: &Client, policy: &RetryPolicy, url: &str) -> Result<Response> {
    send_with_retry(policy, url, || client.get(url)).await
}
