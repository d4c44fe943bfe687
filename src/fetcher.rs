//! Follower count fetcher for the X API
//!
//! Issues a single authenticated user lookup and extracts the follower count
//! from the public metrics. The call is retried once after a fixed delay;
//! there is deliberately no backoff or jitter beyond that.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, instrument, warn};

const DEFAULT_API_BASE: &str = "https://api.twitter.com";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: usize = 2;

/// Errors that can occur while fetching the follower count
#[derive(Debug)]
pub enum FetchError {
    /// The request never produced a response
    Transport(String),

    /// The API answered with a non-success status
    Api {
        /// HTTP status code of the last attempt
        status: u16,
        /// Response body, as far as it could be read
        message: String,
    },

    /// The response decoded but did not contain the metric field
    MalformedBody(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "request failed: {msg}"),
            FetchError::Api { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            FetchError::MalformedBody(msg) => write!(f, "malformed response body: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Deserialize)]
struct UserLookupResponse {
    data: UserData,
}

#[derive(Debug, Deserialize)]
struct UserData {
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    followers_count: u64,
}

/// Client for the follower count lookup
///
/// The client is purely a reader: a fetch has no side effect beyond the
/// network call itself.
pub struct FollowerFetcher {
    client: Client,
    api_base: String,
    bearer_token: String,
    username: String,
    retry_delay: Duration,
}

impl FollowerFetcher {
    pub fn new(bearer_token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_base: DEFAULT_API_BASE.to_string(),
            bearer_token: bearer_token.into(),
            username: username.into(),
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override the API base URL (tests point this at a mock server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the fixed delay between the two attempts
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Fetch the current follower count
    ///
    /// Any failed attempt (transport error, non-200 status, or a body
    /// without the metric field) is retried once after the fixed delay. The
    /// error of the final attempt is returned when the budget is exhausted.
    #[instrument(skip(self), fields(username = %self.username))]
    pub async fn fetch(&self) -> Result<u64, FetchError> {
        let mut attempt = 1;
        loop {
            match self.request_count().await {
                Ok(count) => {
                    info!("successfully fetched follower count: {count}");
                    return Ok(count);
                }
                Err(e) => {
                    warn!("fetch attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                    if attempt >= MAX_ATTEMPTS {
                        return Err(e);
                    }
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn request_count(&self) -> Result<u64, FetchError> {
        let url = format!(
            "{}/2/users/by/username/{}?user.fields=public_metrics",
            self.api_base, self.username
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: UserLookupResponse = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedBody(e.to_string()))?;

        Ok(body.data.public_metrics.followers_count)
    }
}
