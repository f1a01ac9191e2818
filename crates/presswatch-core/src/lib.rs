//! Shared domain types, configuration, and pure normalization logic for
//! presswatch.

pub mod app_config;
pub mod config;
pub mod mention;
pub mod normalize;
pub mod rules;
pub mod snippet;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, VerificationSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use mention::{
    Candidate, ClientRef, DiscoveredArticle, FeedClient, Mention, MentionForVerification,
    NewMention, Publication, RawHit, Sentiment, Verification,
};
pub use normalize::{
    dedupe_candidates, extract_domain, normalize_hit, normalize_title,
    normalize_url_for_comparison, tag_sentiment,
};
pub use rules::{load_rules, parse_rules, Blocklist, CardItemSite, NameVariant, VerificationRules};
pub use snippet::{clean_snippet, extract_date_from_snippet, resolve_mention_date};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read rules file {path}: {source}")]
    RulesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules file: {0}")]
    RulesFileParse(#[from] serde_yaml::Error),

    #[error("rules validation failed: {0}")]
    Validation(String),
}
