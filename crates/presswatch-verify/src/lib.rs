//! Mention verification: direct fetch, headless-browser fallback, snippet
//! fallback and bounded retries.

pub mod browser;
pub mod browserless;
pub mod cards;
pub mod content;
pub mod error;
pub mod fetch;
pub mod outcome;
pub mod retry;
pub mod url_guard;

pub use browser::{
    Browser, BrowserLauncher, BrowserPage, BrowserProvider, BrowserVerifier, NavigationOptions,
};
pub use browserless::{BrowserlessBrowser, BrowserlessLauncher};
pub use cards::{analyze_card_items, CardAnalysis, CardLink};
pub use content::{
    classify_content_type, extract_text_from_html, is_blocked_page, ContentKind, ContentRules,
};
pub use error::{BrowserError, VerifyError};
pub use fetch::{FetchVerifier, FetchVerifierBuilder};
pub use outcome::{Outcome, Reason, VerificationResult};
pub use retry::{retry_attempts, verify_with_retry};
pub use url_guard::validate_url;
