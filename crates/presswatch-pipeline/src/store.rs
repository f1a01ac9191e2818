//! Storage seam for the pipeline.
//!
//! [`PgMentionStore`] delegates to `presswatch-db`; [`MemoryStore`] keeps
//! everything in process and enforces the same per-client uniqueness rules,
//! which makes it suitable for tests and dry runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use presswatch_core::{
    normalize_title, normalize_url_for_comparison, FeedClient, Mention, MentionForVerification,
    NewMention, Publication, Sentiment, Verification,
};
use presswatch_db::{DbError, ExistingKey, UNKNOWN_SOURCE};
use sqlx::PgPool;

use crate::error::StoreError;

#[async_trait]
pub trait MentionStore: Send + Sync {
    /// Keys of persisted mentions of `client_id` matching any of `links`
    /// (canonical form) or `titles` (normalized form).
    async fn existing_keys(
        &self,
        client_id: i64,
        links: &[String],
        titles: &[String],
    ) -> Result<Vec<ExistingKey>, StoreError>;

    /// Inserts a mention. `Ok(None)` means a uniqueness rule rejected it.
    async fn insert_mention(&self, mention: &NewMention) -> Result<Option<Mention>, StoreError>;

    async fn list_mentions_for_verification(
        &self,
    ) -> Result<Vec<MentionForVerification>, StoreError>;

    async fn update_verification(
        &self,
        id: i64,
        verification: Verification,
    ) -> Result<(), StoreError>;

    async fn mention_exists_for_url(&self, client_id: i64, url: &str) -> Result<bool, StoreError>;

    async fn list_publications(&self) -> Result<Vec<Publication>, StoreError>;

    async fn unknown_source_publication_id(&self) -> Result<i64, StoreError>;

    async fn clients_with_feeds(&self) -> Result<Vec<FeedClient>, StoreError>;
}

// ---------------------------------------------------------------------------
// PgMentionStore
// ---------------------------------------------------------------------------

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgMentionStore {
    pool: PgPool,
}

impl PgMentionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MentionStore for PgMentionStore {
    async fn existing_keys(
        &self,
        client_id: i64,
        links: &[String],
        titles: &[String],
    ) -> Result<Vec<ExistingKey>, StoreError> {
        Ok(presswatch_db::existing_mention_keys(&self.pool, client_id, links, titles).await?)
    }

    async fn insert_mention(&self, mention: &NewMention) -> Result<Option<Mention>, StoreError> {
        Ok(presswatch_db::insert_mention(&self.pool, mention).await?)
    }

    async fn list_mentions_for_verification(
        &self,
    ) -> Result<Vec<MentionForVerification>, StoreError> {
        Ok(presswatch_db::list_mentions_for_verification(&self.pool).await?)
    }

    async fn update_verification(
        &self,
        id: i64,
        verification: Verification,
    ) -> Result<(), StoreError> {
        Ok(presswatch_db::update_verification(&self.pool, id, verification).await?)
    }

    async fn mention_exists_for_url(&self, client_id: i64, url: &str) -> Result<bool, StoreError> {
        Ok(presswatch_db::mention_exists_for_url(&self.pool, client_id, url).await?)
    }

    async fn list_publications(&self) -> Result<Vec<Publication>, StoreError> {
        let rows = presswatch_db::list_publications(&self.pool).await?;
        Ok(rows.into_iter().map(Publication::from).collect())
    }

    async fn unknown_source_publication_id(&self) -> Result<i64, StoreError> {
        Ok(presswatch_db::unknown_source_publication_id(&self.pool).await?)
    }

    async fn clients_with_feeds(&self) -> Result<Vec<FeedClient>, StoreError> {
        Ok(presswatch_db::list_clients_with_feeds(&self.pool).await?)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct MemoryClient {
    id: i64,
    name: String,
    feed_url: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    clients: Vec<MemoryClient>,
    publications: Vec<Publication>,
    mentions: Vec<Mention>,
    fail_loads: bool,
    fail_updates: bool,
}

impl MemoryState {
    fn client_name(&self, client_id: i64) -> Option<&str> {
        self.clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.name.as_str())
    }

    /// Blank titles never collide, matching the partial title index.
    fn conflicts(&self, mention: &NewMention) -> bool {
        let link = normalize_url_for_comparison(&mention.link);
        let title = normalize_title(&mention.title);
        self.mentions.iter().any(|m| {
            m.client_id == mention.client_id
                && (normalize_url_for_comparison(&m.link) == link
                    || (!title.is_empty() && normalize_title(&m.title) == title))
        })
    }
}

/// In-process store with the same uniqueness rules as the Postgres schema.
///
/// Starts with the "Unknown Source" publication as id 1.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let state = MemoryState {
            publications: vec![Publication {
                id: 1,
                name: UNKNOWN_SOURCE.to_string(),
                domain: None,
            }],
            ..MemoryState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a client and returns its id.
    pub fn add_client(&self, name: &str, feed_url: Option<&str>) -> i64 {
        let mut state = self.lock();
        let id = state.clients.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        state.clients.push(MemoryClient {
            id,
            name: name.to_string(),
            feed_url: feed_url.map(str::to_string),
        });
        id
    }

    /// Registers a publication and returns its id.
    pub fn add_publication(&self, name: &str, domain: Option<&str>) -> i64 {
        let mut state = self.lock();
        let id = state.publications.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        state.publications.push(Publication {
            id,
            name: name.to_string(),
            domain: domain.map(str::to_string),
        });
        id
    }

    /// Inserts an already-existing mention, bypassing the recorder.
    ///
    /// Returns `None` when it collides with a stored mention.
    pub fn seed_mention(
        &self,
        client_id: i64,
        title: &str,
        link: &str,
        verification: Verification,
    ) -> Option<i64> {
        let new = NewMention {
            title: title.to_string(),
            subject: String::new(),
            mention_date: Utc::now(),
            link: link.to_string(),
            source: None,
            sentiment: Sentiment::Neutral,
            status: "new".to_string(),
            client_id,
            publication_id: 1,
        };
        let mut state = self.lock();
        let id = insert_locked(&mut state, &new)?.id;
        if let Some(stored) = state.mentions.iter_mut().find(|m| m.id == id) {
            stored.verification = verification;
        }
        Some(id)
    }

    /// Snapshot of every stored mention, ordered by id.
    #[must_use]
    pub fn mentions(&self) -> Vec<Mention> {
        self.lock().mentions.clone()
    }

    #[must_use]
    pub fn verification_of(&self, id: i64) -> Option<Verification> {
        self.lock()
            .mentions
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.verification)
    }

    /// Makes `list_mentions_for_verification` fail.
    pub fn set_fail_loads(&self, fail: bool) {
        self.lock().fail_loads = fail;
    }

    /// Makes `update_verification` fail.
    pub fn set_fail_updates(&self, fail: bool) {
        self.lock().fail_updates = fail;
    }
}

fn insert_locked(state: &mut MemoryState, new: &NewMention) -> Option<Mention> {
    if state.conflicts(new) {
        return None;
    }
    let id = state.mentions.iter().map(|m| m.id).max().unwrap_or(0) + 1;
    let mention = Mention {
        id,
        title: new.title.clone(),
        subject: Some(new.subject.clone()).filter(|s| !s.is_empty()),
        mention_date: new.mention_date,
        remention_date: None,
        link: new.link.clone(),
        source: new.source.clone(),
        sentiment: new.sentiment,
        status: new.status.clone(),
        client_id: new.client_id,
        publication_id: new.publication_id,
        press_release_id: None,
        verification: Verification::Unresolved,
        created_at: Utc::now(),
    };
    state.mentions.push(mention.clone());
    Some(mention)
}

#[async_trait]
impl MentionStore for MemoryStore {
    async fn existing_keys(
        &self,
        client_id: i64,
        links: &[String],
        titles: &[String],
    ) -> Result<Vec<ExistingKey>, StoreError> {
        let state = self.lock();
        Ok(state
            .mentions
            .iter()
            .filter(|m| m.client_id == client_id)
            .map(|m| ExistingKey {
                normalized_link: normalize_url_for_comparison(&m.link),
                normalized_title: normalize_title(&m.title),
            })
            .filter(|k| links.contains(&k.normalized_link) || titles.contains(&k.normalized_title))
            .collect())
    }

    async fn insert_mention(&self, mention: &NewMention) -> Result<Option<Mention>, StoreError> {
        let mut state = self.lock();
        Ok(insert_locked(&mut state, mention))
    }

    async fn list_mentions_for_verification(
        &self,
    ) -> Result<Vec<MentionForVerification>, StoreError> {
        let state = self.lock();
        if state.fail_loads {
            return Err(StoreError::Unavailable("load failure injected".to_string()));
        }
        Ok(state
            .mentions
            .iter()
            .filter_map(|m| {
                let name = state.client_name(m.client_id)?;
                Some(MentionForVerification::from_mention(m, name))
            })
            .collect())
    }

    async fn update_verification(
        &self,
        id: i64,
        verification: Verification,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_updates {
            return Err(StoreError::Unavailable("update failure injected".to_string()));
        }
        let mention = state
            .mentions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::Db(DbError::NotFound))?;
        mention.verification = verification;
        Ok(())
    }

    async fn mention_exists_for_url(&self, client_id: i64, url: &str) -> Result<bool, StoreError> {
        let key = normalize_url_for_comparison(url);
        let state = self.lock();
        Ok(state.mentions.iter().any(|m| {
            m.client_id == client_id
                && (m.link == url || normalize_url_for_comparison(&m.link) == key)
        }))
    }

    async fn list_publications(&self) -> Result<Vec<Publication>, StoreError> {
        Ok(self.lock().publications.clone())
    }

    async fn unknown_source_publication_id(&self) -> Result<i64, StoreError> {
        let mut state = self.lock();
        if let Some(p) = state.publications.iter().find(|p| p.name == UNKNOWN_SOURCE) {
            return Ok(p.id);
        }
        let id = state.publications.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        state.publications.push(Publication {
            id,
            name: UNKNOWN_SOURCE.to_string(),
            domain: None,
        });
        Ok(id)
    }

    async fn clients_with_feeds(&self) -> Result<Vec<FeedClient>, StoreError> {
        let state = self.lock();
        Ok(state
            .clients
            .iter()
            .filter_map(|c| {
                let feed_url = c.feed_url.as_ref().filter(|u| !u.trim().is_empty())?;
                Some(FeedClient {
                    id: c.id,
                    name: c.name.clone(),
                    feed_url: feed_url.clone(),
                })
            })
            .collect())
    }
}
