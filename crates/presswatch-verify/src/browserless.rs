//! [`Browser`] backed by a Browserless instance's `/content` endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::browser::{Browser, BrowserLauncher, BrowserPage, NavigationOptions};
use crate::error::{BrowserError, VerifyError};

/// Slack on top of navigation timeout and settle delay for the HTTP round trip.
const REQUEST_OVERHEAD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Endpoint {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl Endpoint {
    /// `path` is appended to the base path; the token, if any, is the only
    /// query parameter.
    fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}{path}", self.base_url.path().trim_end_matches('/'));
        url.set_path(&joined);
        url.set_query(None);
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        url
    }
}

/// Checks that the Browserless service answers before handing out a browser.
#[derive(Debug, Clone)]
pub struct BrowserlessLauncher {
    endpoint: Endpoint,
}

impl BrowserlessLauncher {
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidServiceUrl`] if `base_url` does not parse,
    /// or [`VerifyError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, VerifyError> {
        let parsed = Url::parse(base_url).map_err(|source| VerifyError::InvalidServiceUrl {
            url: base_url.to_string(),
            source,
        })?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            endpoint: Endpoint {
                client,
                base_url: parsed,
                token: token.map(String::from),
            },
        })
    }
}

#[async_trait]
impl BrowserLauncher for BrowserlessLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>, BrowserError> {
        let response = self
            .endpoint
            .client
            .get(self.endpoint.url("/json/version"))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Launch(format!(
                "browserless responded with HTTP {}",
                status.as_u16()
            )));
        }

        tracing::info!(base_url = %self.endpoint.base_url, "connected to browserless");
        Ok(Arc::new(BrowserlessBrowser {
            endpoint: self.endpoint.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct BrowserlessBrowser {
    endpoint: Endpoint,
}

#[async_trait]
impl Browser for BrowserlessBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Ok(Box::new(BrowserlessPage {
            endpoint: self.endpoint.clone(),
            html: None,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        // Sessions live for a single /content call; nothing to release.
        Ok(())
    }
}

/// One render. `goto` performs the whole navigation remotely and keeps the
/// resulting HTML for `content`.
#[derive(Debug)]
pub struct BrowserlessPage {
    endpoint: Endpoint,
    html: Option<String>,
}

fn content_request(url: &str, options: &NavigationOptions) -> serde_json::Value {
    let timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX);
    let settle_ms = u64::try_from(options.settle_delay.as_millis()).unwrap_or(u64::MAX);
    serde_json::json!({
        "url": url,
        "gotoOptions": {
            "waitUntil": "domcontentloaded",
            "timeout": timeout_ms,
        },
        "waitForTimeout": settle_ms,
        "viewport": {
            "width": options.viewport.0,
            "height": options.viewport.1,
        },
        "setExtraHTTPHeaders": {
            "User-Agent": options.user_agent,
            "Accept-Language": "en-US,en;q=0.9",
        },
    })
}

#[async_trait]
impl BrowserPage for BrowserlessPage {
    async fn goto(&mut self, url: &str, options: &NavigationOptions) -> Result<(), BrowserError> {
        let response = self
            .endpoint
            .client
            .post(self.endpoint.url("/content"))
            .timeout(options.timeout + options.settle_delay + REQUEST_OVERHEAD)
            .json(&content_request(url, options))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BrowserError::Api {
                status: status.as_u16(),
                message,
            });
        }

        self.html = Some(response.text().await?);
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.html.clone().ok_or(BrowserError::PageClosed)
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        Ok(())
    }
}
