use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("invalid browserless URL {url:?}: {source}")]
    InvalidServiceUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Failures from the headless browser backend.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("navigation to {url} timed out")]
    Timeout { url: String },

    #[error("browser network error: {0}")]
    Network(String),

    #[error("page is closed")]
    PageClosed,
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        match err.url() {
            Some(url) if err.is_timeout() => BrowserError::Timeout {
                url: url.to_string(),
            },
            _ => BrowserError::Network(err.to_string()),
        }
    }
}
