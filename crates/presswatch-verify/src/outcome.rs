//! Per-mention verification verdicts.

use std::fmt;

use presswatch_core::{DiscoveredArticle, Verification};
use serde::Serialize;

/// Tri-state verdict of one verification attempt.
///
/// `NeedsReview` is never persisted as such: the mention stays `unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Confirmed,
    Rejected,
    NeedsReview,
}

impl Outcome {
    /// Value written back to the mention's `verification` column.
    #[must_use]
    pub fn to_verification(self) -> Verification {
        match self {
            Self::Confirmed => Verification::Confirmed,
            Self::Rejected => Verification::Rejected,
            Self::NeedsReview => Verification::Unresolved,
        }
    }

    /// Whether the outcome leaves the mention unresolved.
    #[must_use]
    pub fn needs_review(self) -> bool {
        self == Self::NeedsReview
    }
}

/// Why a mention ended up with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Verified,
    VerifiedBrowser,
    VerifiedSnippet,
    VerifiedDocumentTitle,
    AlreadyVerified,
    NameNotFound,
    NoUrl,
    InvalidUrl,
    NotHtml,
    DocumentType,
    Blocked,
    BlockedPageDetected,
    BrowserError,
    Timeout,
    FetchError,
    #[serde(rename = "http_error_4xx")]
    HttpError4xx,
    #[serde(rename = "http_error_5xx")]
    HttpError5xx,
    HttpError,
    CardItemListingPage,
}

impl Reason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::VerifiedBrowser => "verified_browser",
            Self::VerifiedSnippet => "verified_snippet",
            Self::VerifiedDocumentTitle => "verified_document_title",
            Self::AlreadyVerified => "already_verified",
            Self::NameNotFound => "name_not_found",
            Self::NoUrl => "no_url",
            Self::InvalidUrl => "invalid_url",
            Self::NotHtml => "not_html",
            Self::DocumentType => "document_type",
            Self::Blocked => "blocked",
            Self::BlockedPageDetected => "blocked_page_detected",
            Self::BrowserError => "browser_error",
            Self::Timeout => "timeout",
            Self::FetchError => "fetch_error",
            Self::HttpError4xx => "http_error_4xx",
            Self::HttpError5xx => "http_error_5xx",
            Self::HttpError => "http_error",
            Self::CardItemListingPage => "card_item_listing_page",
        }
    }

    /// Reasons that another attempt cannot change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::NameNotFound
                | Self::NoUrl
                | Self::InvalidUrl
                | Self::NotHtml
                | Self::DocumentType
                | Self::HttpError4xx
                | Self::CardItemListingPage
        )
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub mention_id: i64,
    pub client_id: i64,
    pub outcome: Outcome,
    pub reason: Reason,
    pub error: Option<String>,
    pub discovered: Vec<DiscoveredArticle>,
}

impl VerificationResult {
    #[must_use]
    pub fn new(mention_id: i64, client_id: i64, outcome: Outcome, reason: Reason) -> Self {
        Self {
            mention_id,
            client_id,
            outcome,
            reason,
            error: None,
            discovered: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn with_discovered(mut self, discovered: Vec<DiscoveredArticle>) -> Self {
        self.discovered = discovered;
        self
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.outcome == Outcome::Confirmed
    }
}
