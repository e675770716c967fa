//! Retrying HTTP layer shared by all remote clients.
//!
//! Every call is bounded by the client timeout and retried with exponential
//! backoff on transport failures, rate limiting and 5xx responses. Auth
//! failures, 404s and GraphQL `errors` are returned immediately.

use std::future::Future;
use std::time::Duration;

use depgauge_config::HttpConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Ceiling for the doubling backoff delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Backoff delay following `current`.
fn next_delay(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_RETRY_DELAY)
}

/// GraphQL request body
#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

/// HTTP client with timeout and retry policy.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("depgauge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay(),
        })
    }

    /// POST a GraphQL query and decode its `data` member.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let variables = &variables;
        self.with_retry(url, || async move {
            let body = GraphQlRequest {
                query,
                variables: variables.clone(),
            };
            let mut request = self.client.post(url).json(&body);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = send(request, url).await?;
            let envelope: GraphQlResponse<T> = response
                .json()
                .await
                .map_err(|e| PipelineError::invalid_response(url, e))?;

            if !envelope.errors.is_empty() {
                let messages: Vec<String> =
                    envelope.errors.into_iter().map(|e| e.message).collect();
                return Err(PipelineError::GraphQl(messages.join("; ")));
            }

            envelope
                .data
                .ok_or_else(|| PipelineError::invalid_response(url, "response has no data"))
        })
        .await
    }

    /// GET a URL and return its body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.with_retry(url, || async move {
            let response = send(self.client.get(url), url).await?;
            response
                .text()
                .await
                .map_err(|e| PipelineError::invalid_response(url, e))
        })
        .await
    }

    /// Run `op` until it succeeds, fails permanently or retries run out.
    async fn with_retry<T, F, Fut>(&self, url: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry_delay = self.retry_base_delay;

        for attempt in 0..=self.max_retries {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = match &e {
                        PipelineError::RateLimited {
                            retry_after: Some(secs),
                            ..
                        } => Duration::from_secs(*secs).max(retry_delay),
                        _ => retry_delay,
                    };
                    warn!(
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying request: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    retry_delay = next_delay(retry_delay);
                }
                Err(e) => return Err(e),
            }
        }

        Err(PipelineError::transport(url, "request failed after retries"))
    }
}

/// Send one request and map the status to an error where needed.
async fn send(request: RequestBuilder, url: &str) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            PipelineError::transport(url, "request timed out")
        } else if e.is_connect() {
            PipelineError::transport(url, format!("connection failed: {}", e))
        } else {
            PipelineError::transport(url, e)
        }
    })?;

    let status = response.status();
    debug!(url, status = status.as_u16(), "HTTP response");

    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            Err(PipelineError::Auth {
                url: url.to_string(),
                message: body,
            })
        }
        StatusCode::NOT_FOUND => Err(PipelineError::NotFound(url.to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            Err(PipelineError::RateLimited {
                url: url.to_string(),
                retry_after,
            })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(PipelineError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}
