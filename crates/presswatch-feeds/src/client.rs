use std::time::Duration;

use presswatch_core::RawHit;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};

use crate::error::FeedError;
use crate::parse::parse_feed;
use crate::rate_limit::retry_with_backoff;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; PressWatch/1.0)";
const ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";

/// Downloads alert feeds and turns them into raw hits.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl FeedFetcher {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetcher with a 30 second timeout and two retries.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn with_defaults() -> Result<Self, FeedError> {
        Self::new(Duration::from_secs(30), DEFAULT_USER_AGENT, 2, 1_000)
    }

    /// Fetches `url` and parses it as RSS or Atom.
    ///
    /// # Errors
    ///
    /// - [`FeedError::RateLimited`]: HTTP 429 after all retries.
    /// - [`FeedError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`FeedError::Http`]: network failure after all retries.
    /// - [`FeedError::Xml`]: the body is not well-formed XML.
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<RawHit>, FeedError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(FeedError::RateLimited {
                    url: url.to_string(),
                });
            }
            if !status.is_success() {
                return Err(FeedError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            Ok(response.text().await?)
        })
        .await?;

        let hits = parse_feed(&body)?;
        tracing::debug!(url, entries = hits.len(), "parsed feed");
        Ok(hits)
    }
}
