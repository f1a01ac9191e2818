//! Integration tests for `FetchVerifier` and the retry policy.
//!
//! Each test stands up a local `wiremock` server, so the verifier is built
//! with private hosts allowed.

use std::sync::Arc;

use async_trait::async_trait;
use presswatch_core::{
    MentionForVerification, NameVariant, Verification, VerificationRules, VerificationSettings,
};
use presswatch_verify::{
    verify_with_retry, Browser, BrowserError, BrowserPage, BrowserProvider, FetchVerifier,
    NavigationOptions, Outcome, Reason,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings() -> VerificationSettings {
    VerificationSettings {
        max_retries: 3,
        retry_delay_ms: 0,
        rate_limit_ms: 0,
        fetch_timeout_ms: 2_000,
        min_content_length: 20,
        user_agent: "presswatch-test/0.1".to_string(),
        ..VerificationSettings::default()
    }
}

fn test_rules() -> Arc<VerificationRules> {
    Arc::new(VerificationRules {
        name_variants: vec![NameVariant {
            from: "sweetpotato".to_string(),
            to: "sweet potato".to_string(),
        }],
        ..VerificationRules::default()
    })
}

/// Builds a verifier that may talk to the local mock server.
fn test_verifier(settings: &VerificationSettings) -> FetchVerifier {
    FetchVerifier::builder(settings, test_rules())
        .allow_private_hosts(true)
        .build()
        .expect("failed to build test FetchVerifier")
}

fn mention(link: String, snippet: Option<&str>) -> MentionForVerification {
    MentionForVerification {
        id: 42,
        title: "Industry roundup".to_string(),
        link: Some(link),
        subject: snippet.map(str::to_string),
        client_id: 7,
        client_name: "Acme Farms".to_string(),
        verification: Verification::Unresolved,
    }
}

fn html(body: &str) -> String {
    format!("<html><head><title>News</title></head><body>{body}</body></html>")
}

// ---- Fake browser ----------------------------------------------------------

struct StaticBrowser(String);

struct StaticPage(String);

#[async_trait]
impl Browser for StaticBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Ok(Box::new(StaticPage(self.0.clone())))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for StaticPage {
    async fn goto(&mut self, _url: &str, _options: &NavigationOptions) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        Ok(self.0.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        Ok(())
    }
}

struct StaticProvider(Option<Arc<dyn Browser>>);

#[async_trait]
impl BrowserProvider for StaticProvider {
    async fn browser(&self) -> Option<Arc<dyn Browser>> {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// Test 1 – 200 HTML containing the client name
// ---------------------------------------------------------------------------

#[tokio::test]
async fn html_page_with_name_is_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .and(header("accept-language", "en-US,en;q=0.9"))
        .and(header("user-agent", "presswatch-test/0.1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html("<p>ACME FARMS wins award</p>"), "text/html; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let verifier = test_verifier(&test_settings());
    let result = verifier
        .verify_once(&mention(format!("{}/article", server.uri()), None), None)
        .await;

    assert_eq!(result.outcome, Outcome::Confirmed);
    assert_eq!(result.reason, Reason::Verified);
    assert_eq!(result.mention_id, 42);
    assert_eq!(result.client_id, 7);
}

// ---------------------------------------------------------------------------
// Test 2 – 200 HTML without the client name
// ---------------------------------------------------------------------------

#[tokio::test]
async fn html_page_without_name_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html("<p>Someone else entirely</p>"), "text/html"),
        )
        .mount(&server)
        .await;

    let verifier = test_verifier(&test_settings());
    let result = verifier
        .verify_once(&mention(format!("{}/article", server.uri()), None), None)
        .await;

    assert_eq!(result.outcome, Outcome::Rejected);
    assert_eq!(result.reason, Reason::NameNotFound);
}

// ---------------------------------------------------------------------------
// Test 3 – 403 without a browser
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forbidden_without_browser_needs_review() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let verifier = test_verifier(&test_settings());
    let provider = StaticProvider(None);
    let result = verifier
        .verify_once(
            &mention(format!("{}/article", server.uri()), Some("unrelated snippet")),
            Some(&provider),
        )
        .await;

    assert_eq!(result.outcome, Outcome::NeedsReview);
    assert_eq!(result.reason, Reason::Blocked);
    assert_eq!(result.error.as_deref(), Some("HTTP 403 - needs manual review"));
}

// ---------------------------------------------------------------------------
// Test 4 – 403 falls back to the browser
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forbidden_with_browser_uses_rendered_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let rendered = html("<article>Acme Farms opens a new packing facility in Idaho.</article>");
    let provider = StaticProvider(Some(Arc::new(StaticBrowser(rendered))));

    let verifier = test_verifier(&test_settings());
    let result = verifier
        .verify_once(&mention(format!("{}/article", server.uri()), None), Some(&provider))
        .await;

    assert_eq!(result.outcome, Outcome::Confirmed);
    assert_eq!(result.reason, Reason::VerifiedBrowser);
}

// ---------------------------------------------------------------------------
// Test 5 – 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_is_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let settings = test_settings();
    let verifier = test_verifier(&settings);
    let result = verify_with_retry(
        &verifier,
        &mention(format!("{}/gone", server.uri()), None),
        None,
        &settings,
    )
    .await;

    assert_eq!(result.outcome, Outcome::Rejected);
    assert_eq!(result.reason, Reason::HttpError4xx);
    assert_eq!(result.error.as_deref(), Some("HTTP 404"));
}

// ---------------------------------------------------------------------------
// Test 6 – 429 with the name in the snippet
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rate_limited_with_snippet_match_is_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let verifier = test_verifier(&test_settings());
    let result = verifier
        .verify_once(
            &mention(
                format!("{}/article", server.uri()),
                Some("Acme Farms expands into organic produce"),
            ),
            None,
        )
        .await;

    assert_eq!(result.outcome, Outcome::Confirmed);
    assert_eq!(result.reason, Reason::VerifiedSnippet);
}

// ---------------------------------------------------------------------------
// Test 7 – 500
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_error_needs_review_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let settings = test_settings();
    let verifier = test_verifier(&settings);
    let result = verify_with_retry(
        &verifier,
        &mention(format!("{}/article", server.uri()), None),
        None,
        &settings,
    )
    .await;

    assert_eq!(result.outcome, Outcome::NeedsReview);
    assert_eq!(result.reason, Reason::HttpError5xx);
}

// ---------------------------------------------------------------------------
// Test 8 – 200 PDF
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pdf_is_confirmed_by_title_or_flagged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let verifier = test_verifier(&test_settings());
    let url = format!("{}/report.pdf", server.uri());

    let mut titled = mention(url.clone(), None);
    titled.title = "Acme Farms annual report".to_string();
    let result = verifier.verify_once(&titled, None).await;
    assert_eq!(result.outcome, Outcome::Confirmed);
    assert_eq!(result.reason, Reason::VerifiedDocumentTitle);

    let result = verifier.verify_once(&mention(url, None), None).await;
    assert_eq!(result.outcome, Outcome::NeedsReview);
    assert_eq!(result.reason, Reason::DocumentType);
    assert_eq!(
        result.error.as_deref(),
        Some("Content-Type: application/pdf - needs manual review")
    );
}

// ---------------------------------------------------------------------------
// Test 9 – non-HTML payloads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_payload_is_not_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let verifier = test_verifier(&test_settings());
    let result = verifier
        .verify_once(&mention(format!("{}/api", server.uri()), None), None)
        .await;

    assert_eq!(result.outcome, Outcome::Rejected);
    assert_eq!(result.reason, Reason::NotHtml);
}

// ---------------------------------------------------------------------------
// Test 10 – URL validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn private_and_missing_urls_are_rejected_by_default() {
    let verifier = FetchVerifier::new(&test_settings(), test_rules()).unwrap();

    let result = verifier
        .verify_once(&mention("http://127.0.0.1:9/admin".to_string(), None), None)
        .await;
    assert_eq!(result.reason, Reason::InvalidUrl);
    assert_eq!(result.outcome, Outcome::Rejected);

    let mut no_link = mention(String::new(), None);
    no_link.link = None;
    let result = verifier.verify_once(&no_link, None).await;
    assert_eq!(result.reason, Reason::NoUrl);
}

// ---------------------------------------------------------------------------
// Test 11 – timeouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html("Acme Farms"), "text/html")
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let settings = VerificationSettings {
        fetch_timeout_ms: 200,
        ..test_settings()
    };
    let verifier = test_verifier(&settings);
    let result = verifier
        .verify_once(&mention(format!("{}/slow", server.uri()), None), None)
        .await;

    assert_eq!(result.outcome, Outcome::NeedsReview);
    assert_eq!(result.reason, Reason::Timeout);
    assert!(result.error.unwrap().ends_with(" - needs manual review"));
}

// ---------------------------------------------------------------------------
// Test 12 – inconclusive responses are retried, then handed to a human
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unexpected_status_is_retried_until_exhausted() {
    let server = MockServer::start().await;
    // A 3xx without Location is not followed.
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(304))
        .expect(3)
        .mount(&server)
        .await;

    let settings = test_settings();
    let verifier = test_verifier(&settings);
    let result = verify_with_retry(
        &verifier,
        &mention(format!("{}/moved", server.uri()), None),
        None,
        &settings,
    )
    .await;

    assert_eq!(result.outcome, Outcome::NeedsReview);
    assert_eq!(result.reason, Reason::HttpError);
    assert_eq!(
        result.error.as_deref(),
        Some("HTTP 304 - needs manual review after retries")
    );
}

// ---------------------------------------------------------------------------
// Test 13 – name variants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn name_variant_matches_page_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html("<p>The Sweet Potato Council met today</p>"), "text/html"),
        )
        .mount(&server)
        .await;

    let verifier = test_verifier(&test_settings());
    let mut m = mention(format!("{}/article", server.uri()), None);
    m.client_name = "SweetPotato Council".to_string();
    let result = verifier.verify_once(&m, None).await;

    assert_eq!(result.reason, Reason::Verified);
}

// ---------------------------------------------------------------------------
// Test 14 – rate limits and timeouts go to review after one attempt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rate_limit_and_timeout_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html("Acme Farms"), "text/html")
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = VerificationSettings {
        fetch_timeout_ms: 200,
        ..test_settings()
    };
    let verifier = test_verifier(&settings);

    let limited = verify_with_retry(
        &verifier,
        &mention(format!("{}/limited", server.uri()), None),
        None,
        &settings,
    )
    .await;
    assert_eq!(limited.outcome, Outcome::NeedsReview);
    assert_eq!(limited.reason, Reason::Blocked);

    let slow = verify_with_retry(
        &verifier,
        &mention(format!("{}/slow", server.uri()), None),
        None,
        &settings,
    )
    .await;
    assert_eq!(slow.outcome, Outcome::NeedsReview);
    assert_eq!(slow.reason, Reason::Timeout);
}
