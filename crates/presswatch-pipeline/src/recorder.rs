//! Persists normalized candidates as mentions.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use presswatch_core::{
    clean_snippet, resolve_mention_date, Blocklist, Candidate, Mention, NewMention, Publication,
};

use crate::error::StoreError;
use crate::events::{EventBus, PipelineEvent};
use crate::store::MentionStore;

#[derive(Debug, Default)]
struct ClientKeys {
    links: HashSet<String>,
    titles: HashSet<String>,
}

impl ClientKeys {
    fn contains(&self, candidate: &Candidate) -> bool {
        self.links.contains(&candidate.normalized_url)
            || (!candidate.normalized_title.is_empty()
                && self.titles.contains(&candidate.normalized_title))
    }

    fn insert(&mut self, candidate: &Candidate) {
        self.links.insert(candidate.normalized_url.clone());
        if !candidate.normalized_title.is_empty() {
            self.titles.insert(candidate.normalized_title.clone());
        }
    }
}

/// Lazily loaded publication table plus the cached "Unknown Source" id.
struct PublicationLookup<'a> {
    store: &'a dyn MentionStore,
    publications: Option<Vec<Publication>>,
    unknown_source: Option<i64>,
}

impl<'a> PublicationLookup<'a> {
    fn new(store: &'a dyn MentionStore) -> Self {
        Self {
            store,
            publications: None,
            unknown_source: None,
        }
    }

    async fn resolve(&mut self, source_domain: Option<&str>) -> Result<i64, StoreError> {
        if let Some(domain) = source_domain {
            if self.publications.is_none() {
                self.publications = Some(self.store.list_publications().await?);
            }
            let domain = domain.to_lowercase();
            let matched = self.publications.iter().flatten().find(|p| {
                p.domain
                    .as_deref()
                    .map(|d| d.trim().trim_start_matches("www.").to_lowercase())
                    .is_some_and(|d| !d.is_empty() && domain.contains(&d))
            });
            if let Some(publication) = matched {
                return Ok(publication.id);
            }
        }

        if let Some(id) = self.unknown_source {
            return Ok(id);
        }
        let id = self.store.unknown_source_publication_id().await?;
        self.unknown_source = Some(id);
        Ok(id)
    }
}

/// Inserts every candidate that is not blocklisted and not already known for
/// its client, publishing a `new_mention` event per insert.
///
/// Existing mentions are looked up with one query per client. Candidates
/// that collide with each other within `candidates` are inserted once. A
/// uniqueness conflict at insert time counts as "not created".
///
/// Returns the created mentions in input order.
///
/// # Errors
///
/// Returns [`StoreError`] if a lookup or insert fails; mentions inserted
/// before the failure stay persisted.
pub async fn record_mentions(
    store: &dyn MentionStore,
    events: &EventBus,
    blocklist: &Blocklist,
    candidates: &[Candidate],
    status: &str,
) -> Result<Vec<Mention>, StoreError> {
    let mut by_client: BTreeMap<i64, Vec<&Candidate>> = BTreeMap::new();
    for candidate in candidates {
        by_client.entry(candidate.client_id).or_default().push(candidate);
    }

    let mut known: BTreeMap<i64, ClientKeys> = BTreeMap::new();
    for (client_id, group) in &by_client {
        let links: Vec<String> = group.iter().map(|c| c.normalized_url.clone()).collect();
        let titles: Vec<String> = group
            .iter()
            .map(|c| c.normalized_title.clone())
            .filter(|t| !t.is_empty())
            .collect();
        let existing = store.existing_keys(*client_id, &links, &titles).await?;

        let keys = known.entry(*client_id).or_default();
        for key in existing {
            keys.links.insert(key.normalized_link);
            keys.titles.insert(key.normalized_title);
        }
    }

    let mut publications = PublicationLookup::new(store);
    let mut created = Vec::new();
    let now = Utc::now();

    for candidate in candidates {
        if blocklist.is_blocked(&candidate.url, candidate.source_domain.as_deref()) {
            tracing::debug!(url = %candidate.url, "skipping blocklisted candidate");
            continue;
        }

        let keys = known.entry(candidate.client_id).or_default();
        if keys.contains(candidate) {
            tracing::debug!(
                client_id = candidate.client_id,
                url = %candidate.url,
                "skipping already recorded candidate"
            );
            continue;
        }
        keys.insert(candidate);

        let publication_id = publications
            .resolve(candidate.source_domain.as_deref())
            .await?;
        let new = NewMention {
            title: candidate.title.clone(),
            subject: clean_snippet(&candidate.snippet),
            mention_date: resolve_mention_date(
                candidate.published_at.as_deref(),
                &candidate.snippet,
                now,
            ),
            link: candidate.url.clone(),
            source: candidate.source_domain.clone(),
            sentiment: candidate.sentiment,
            status: status.to_string(),
            client_id: candidate.client_id,
            publication_id,
        };

        match store.insert_mention(&new).await? {
            Some(mention) => {
                tracing::info!(
                    mention_id = mention.id,
                    client_id = mention.client_id,
                    provider = %candidate.provider,
                    "recorded mention"
                );
                events.publish(PipelineEvent::NewMention {
                    mention: mention.clone(),
                });
                created.push(mention);
            }
            None => {
                tracing::debug!(url = %candidate.url, "insert skipped by uniqueness rule");
            }
        }
    }

    Ok(created)
}

#[cfg(test)]
#[path = "recorder_test.rs"]
mod tests;
