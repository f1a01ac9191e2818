use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted verification state of a mention.
///
/// A needs-review outcome is stored as `Unresolved`; only the orchestrator
/// moves a mention to `Confirmed` or `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    Unresolved,
    Confirmed,
    Rejected,
}

impl Verification {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Verification::Unresolved => "unresolved",
            Verification::Confirmed => "confirmed",
            Verification::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unresolved" => Ok(Verification::Unresolved),
            "confirmed" => Ok(Verification::Confirmed),
            "rejected" => Ok(Verification::Rejected),
            other => Err(format!("unknown verification state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment '{other}'")),
        }
    }
}

/// A hit as returned by a search provider or feed, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Provider-supplied timestamp, kept as text; it is only trusted if it parses.
    pub published_at: Option<String>,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: i64,
    pub name: String,
}

/// An unpersisted, normalized hit awaiting deduplication and recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub published_at: Option<String>,
    pub client_id: i64,
    pub client_name: String,
    pub provider: String,
    pub source_domain: Option<String>,
    pub sentiment: Sentiment,
    pub normalized_url: String,
    pub normalized_title: String,
}

/// Insert payload for a mention. Verification is always `Unresolved` on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMention {
    pub title: String,
    pub subject: String,
    pub mention_date: DateTime<Utc>,
    pub link: String,
    pub source: Option<String>,
    pub sentiment: Sentiment,
    pub status: String,
    pub client_id: i64,
    pub publication_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: i64,
    pub title: String,
    pub subject: Option<String>,
    pub mention_date: DateTime<Utc>,
    pub remention_date: Option<DateTime<Utc>>,
    pub link: String,
    pub source: Option<String>,
    pub sentiment: Sentiment,
    pub status: String,
    pub client_id: i64,
    pub publication_id: i64,
    pub press_release_id: Option<i64>,
    pub verification: Verification,
    pub created_at: DateTime<Utc>,
}

/// A mention joined with its client's name, as loaded for a verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionForVerification {
    pub id: i64,
    pub title: String,
    pub link: Option<String>,
    pub subject: Option<String>,
    pub client_id: i64,
    pub client_name: String,
    pub verification: Verification,
}

impl MentionForVerification {
    /// Builds the verification view of a freshly recorded mention.
    #[must_use]
    pub fn from_mention(mention: &Mention, client_name: &str) -> Self {
        Self {
            id: mention.id,
            title: mention.title.clone(),
            link: Some(mention.link.clone()).filter(|l| !l.trim().is_empty()),
            subject: mention.subject.clone(),
            client_id: mention.client_id,
            client_name: client_name.to_string(),
            verification: mention.verification,
        }
    }
}

/// An article link pulled out of a card on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredArticle {
    pub url: String,
    pub title: String,
    pub client_id: i64,
    pub client_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: i64,
    pub name: String,
    pub domain: Option<String>,
}

/// A client with a configured alerts feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedClient {
    pub id: i64,
    pub name: String,
    pub feed_url: String,
}

impl FeedClient {
    #[must_use]
    pub fn as_client_ref(&self) -> ClientRef {
        ClientRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}
