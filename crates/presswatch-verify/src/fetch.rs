//! Direct HTTP verification of a mention's link.

use std::sync::Arc;
use std::time::Duration;

use presswatch_core::{MentionForVerification, VerificationRules, VerificationSettings};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, Response, StatusCode};

use crate::browser::{BrowserProvider, BrowserVerifier, NavigationOptions};
use crate::content::{classify_content_type, extract_text_from_html, ContentKind, ContentRules};
use crate::error::VerifyError;
use crate::outcome::{Outcome, Reason, VerificationResult};
use crate::url_guard::validate_url;

const MAX_REDIRECTS: usize = 10;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Statuses that usually mean bot protection rather than a missing page.
const BLOCKED_STATUSES: [u16; 3] = [401, 403, 429];

/// Runs one verification attempt: fetch, optional browser fallback, and
/// snippet fallback when the page cannot be read.
#[derive(Debug, Clone)]
pub struct FetchVerifier {
    client: Client,
    content: ContentRules,
    browser: BrowserVerifier,
    browser_fallback_statuses: Vec<u16>,
    allow_private_hosts: bool,
}

#[derive(Debug, Clone)]
pub struct FetchVerifierBuilder {
    settings: VerificationSettings,
    rules: Arc<VerificationRules>,
    allow_private_hosts: bool,
}

impl FetchVerifierBuilder {
    /// Permit loopback and private-network hosts. Only for local test servers.
    #[must_use]
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// # Errors
    ///
    /// Returns [`VerifyError::Http`] if the HTTP client cannot be built.
    pub fn build(self) -> Result<FetchVerifier, VerifyError> {
        let allow_private_hosts = self.allow_private_hosts;
        let redirect_policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if validate_url(attempt.url().as_str(), allow_private_hosts).is_none() {
                attempt.error("redirect to a disallowed URL")
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .timeout(self.settings.fetch_timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(self.settings.user_agent.as_str())
            .default_headers(default_headers())
            .redirect(redirect_policy)
            .build()?;

        let content = ContentRules::new(
            self.rules.name_variants.clone(),
            self.settings.min_content_length,
        );
        let browser = BrowserVerifier::new(
            Arc::clone(&self.rules),
            content.clone(),
            NavigationOptions::from_settings(&self.settings),
        );

        Ok(FetchVerifier {
            client,
            content,
            browser,
            browser_fallback_statuses: self.settings.browser_fallback_statuses,
            allow_private_hosts,
        })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

impl FetchVerifier {
    #[must_use]
    pub fn builder(
        settings: &VerificationSettings,
        rules: Arc<VerificationRules>,
    ) -> FetchVerifierBuilder {
        FetchVerifierBuilder {
            settings: settings.clone(),
            rules,
            allow_private_hosts: false,
        }
    }

    /// # Errors
    ///
    /// Returns [`VerifyError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: &VerificationSettings,
        rules: Arc<VerificationRules>,
    ) -> Result<Self, VerifyError> {
        Self::builder(settings, rules).build()
    }

    #[must_use]
    pub fn browser_verifier(&self) -> &BrowserVerifier {
        &self.browser
    }

    /// One pass through the fetch state machine. Never fails: every problem
    /// becomes a [`VerificationResult`].
    pub async fn verify_once(
        &self,
        mention: &MentionForVerification,
        browsers: Option<&dyn BrowserProvider>,
    ) -> VerificationResult {
        let result = |outcome, reason| {
            VerificationResult::new(mention.id, mention.client_id, outcome, reason)
        };

        let Some(link) = mention.link.as_deref() else {
            return result(Outcome::Rejected, Reason::NoUrl);
        };

        let Some(url) = validate_url(link, self.allow_private_hosts) else {
            return result(Outcome::Rejected, Reason::InvalidUrl)
                .with_error(format!("Invalid or disallowed URL: {link}"));
        };

        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => return self.request_failed(mention, &e),
        };

        let status = response.status();
        let code = status.as_u16();

        if self.browser_fallback_statuses.contains(&code) {
            if let Some(browsers) = browsers {
                if let Some(browser) = browsers.browser().await {
                    tracing::debug!(
                        mention_id = mention.id,
                        status = code,
                        "falling back to headless browser"
                    );
                    return self.browser.verify(mention, browser.as_ref()).await;
                }
            }
        }

        if BLOCKED_STATUSES.contains(&code) {
            return self.snippet_fallback(mention).unwrap_or_else(|| {
                result(Outcome::NeedsReview, Reason::Blocked)
                    .with_error(format!("HTTP {code} - needs manual review"))
            });
        }

        if status.is_client_error() {
            return result(Outcome::Rejected, Reason::HttpError4xx)
                .with_error(format!("HTTP {code}"));
        }

        if status.is_server_error() {
            return self.snippet_fallback(mention).unwrap_or_else(|| {
                result(Outcome::NeedsReview, Reason::HttpError5xx)
                    .with_error(format!("HTTP {code} - needs manual review"))
            });
        }

        if !status.is_success() {
            return result(Outcome::Rejected, Reason::HttpError).with_error(format!("HTTP {code}"));
        }

        self.classify_body(mention, response, status).await
    }

    async fn classify_body(
        &self,
        mention: &MentionForVerification,
        response: Response,
        status: StatusCode,
    ) -> VerificationResult {
        let result = |outcome, reason| {
            VerificationResult::new(mention.id, mention.client_id, outcome, reason)
        };

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        match classify_content_type(&content_type) {
            ContentKind::Document => {
                let context = format!(
                    "{} {}",
                    mention.title,
                    mention.subject.as_deref().unwrap_or_default()
                );
                if self.content.contains_client_name(&context, &mention.client_name) {
                    result(Outcome::Confirmed, Reason::VerifiedDocumentTitle)
                } else {
                    result(Outcome::NeedsReview, Reason::DocumentType)
                        .with_error(format!("Content-Type: {content_type} - needs manual review"))
                }
            }
            ContentKind::Other => result(Outcome::Rejected, Reason::NotHtml)
                .with_error(format!("Content-Type: {content_type}")),
            ContentKind::Html => match response.text().await {
                Ok(html) => {
                    let text = extract_text_from_html(&html);
                    if self.content.contains_client_name(&text, &mention.client_name) {
                        result(Outcome::Confirmed, Reason::Verified)
                    } else {
                        tracing::debug!(
                            mention_id = mention.id,
                            status = status.as_u16(),
                            "client name not found in page"
                        );
                        result(Outcome::Rejected, Reason::NameNotFound)
                    }
                }
                Err(e) => self.request_failed(mention, &e),
            },
        }
    }

    fn request_failed(
        &self,
        mention: &MentionForVerification,
        err: &reqwest::Error,
    ) -> VerificationResult {
        if let Some(result) = self.snippet_fallback(mention) {
            return result;
        }
        let reason = if err.is_timeout() {
            Reason::Timeout
        } else {
            Reason::FetchError
        };
        tracing::debug!(mention_id = mention.id, error = %err, "fetch failed");
        VerificationResult::new(mention.id, mention.client_id, Outcome::NeedsReview, reason)
            .with_error(format!("{err} - needs manual review"))
    }

    fn snippet_fallback(&self, mention: &MentionForVerification) -> Option<VerificationResult> {
        let snippet = mention.subject.as_deref()?;
        self.content
            .contains_client_name(snippet, &mention.client_name)
            .then(|| {
                VerificationResult::new(
                    mention.id,
                    mention.client_id,
                    Outcome::Confirmed,
                    Reason::VerifiedSnippet,
                )
            })
    }
}
