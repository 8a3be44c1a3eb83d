use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::time::sleep;
use tracing::warn;

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

pub(crate) fn build_http_client(provider: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("compliance-guard/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .with_context(|| format!("failed to build {provider} HTTP client"))
}

/// Send the request built by `request`, retrying transport failures and
/// retryable statuses up to `max_retries` times with exponential backoff.
pub(crate) async fn send_with_retry<F>(
    provider: &str,
    max_retries: u32,
    mut request: F,
) -> Result<Response>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0u32;
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match request().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                if !is_retryable(status) || attempt >= max_retries {
                    let body = response.text().await.unwrap_or_default();
                    bail!("{provider} API error ({status}): {body}");
                }
                warn!(%status, attempt, "{provider} request rejected; retrying");
            }
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err).with_context(|| format!("failed to call {provider} API"));
                }
                warn!(error = %err, attempt, "{provider} request failed; retrying");
            }
        }
        sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
        attempt += 1;
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}
