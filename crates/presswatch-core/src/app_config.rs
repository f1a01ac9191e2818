use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Tunables for the verification pipeline.
///
/// Durations are stored in milliseconds to mirror the env-var surface; use the
/// accessor methods to get [`Duration`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSettings {
    /// Number of concurrent verification workers.
    pub concurrency: usize,
    /// Total attempts per mention (not additional retries).
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Pause each worker takes after finishing a mention.
    pub rate_limit_ms: u64,
    pub fetch_timeout_ms: u64,
    pub browser_timeout_ms: u64,
    /// Settle time after navigation so client-side rendering can finish.
    pub settle_delay_ms: u64,
    /// Pages with less visible text than this are treated as challenge pages.
    pub min_content_length: usize,
    /// Fetch statuses that hand off to the browser verifier when one is available.
    pub browser_fallback_statuses: Vec<u16>,
    pub user_agent: String,
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_retries: 3,
            retry_delay_ms: 2_000,
            rate_limit_ms: 500,
            fetch_timeout_ms: 15_000,
            browser_timeout_ms: 30_000,
            settle_delay_ms: 2_000,
            min_content_length: 1_000,
            browser_fallback_statuses: vec![403],
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl VerificationSettings {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    #[must_use]
    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_timeout_ms)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub rules_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub verification: VerificationSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("rules_path", &self.rules_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("browserless_url", &self.browserless_url)
            .field(
                "browserless_token",
                &self.browserless_token.as_ref().map(|_| "[redacted]"),
            )
            .field("verification", &self.verification)
            .finish()
    }
}
