//! Verification pass over every stored mention.
//!
//! Mentions are claimed from a shared cursor by a fixed number of workers
//! running on the current task. Listing pages found along the way feed a
//! run-scoped library of discovered articles, which are recorded as new
//! mentions and verified in up to two follow-up rounds.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use presswatch_core::{
    dedupe_candidates, normalize_hit, normalize_url_for_comparison, AppConfig, Candidate,
    ClientRef, DiscoveredArticle, MentionForVerification, RawHit, VerificationRules,
    VerificationSettings, Verification,
};
use presswatch_verify::{
    verify_with_retry, BrowserLauncher, BrowserProvider, BrowserlessLauncher, FetchVerifier,
    VerificationResult,
};
use tokio::sync::Mutex;

use crate::browser_slot::BrowserSlot;
use crate::error::PipelineError;
use crate::events::PipelineEvent;
use crate::recorder::record_mentions;
use crate::status::StatusHandle;
use crate::store::MentionStore;
use crate::summary::VerificationSummary;

/// Deepest follow-up round; listing pages found there are not expanded.
pub const MAX_DISCOVERY_LEVEL: u8 = 2;

pub const DISCOVERY_PROVIDER: &str = "card-item-discovery";
pub const DISCOVERY_SNIPPET: &str = "Discovered from card-item listing page";
const UNTITLED: &str = "Untitled";

/// Everything a verification pass needs besides storage and status.
pub struct VerifierDeps {
    pub fetch: FetchVerifier,
    /// `None` disables the browser path entirely.
    pub launcher: Option<Arc<dyn BrowserLauncher>>,
    pub settings: VerificationSettings,
    pub rules: Arc<VerificationRules>,
}

impl VerifierDeps {
    /// Builds the fetch verifier and, when `browserless_url` is set, a
    /// Browserless launcher.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Verify`] if an HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        rules: Arc<VerificationRules>,
    ) -> Result<Self, PipelineError> {
        let fetch = FetchVerifier::new(&config.verification, Arc::clone(&rules))?;
        let launcher = match config.browserless_url.as_deref() {
            Some(url) => {
                let launcher =
                    BrowserlessLauncher::new(url, config.browserless_token.as_deref())?;
                Some(Arc::new(launcher) as Arc<dyn BrowserLauncher>)
            }
            None => {
                tracing::info!("no browserless URL configured; browser verification disabled");
                None
            }
        };
        Ok(Self {
            fetch,
            launcher,
            settings: config.verification.clone(),
            rules,
        })
    }
}

#[derive(Debug, Default)]
struct DiscoveryLibrary {
    seen: HashSet<String>,
    pending: Vec<DiscoveredArticle>,
}

impl DiscoveryLibrary {
    fn has_seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// First article for a normalized URL wins.
    fn insert(&mut self, key: String, article: DiscoveredArticle) -> bool {
        if !self.seen.insert(key) {
            return false;
        }
        self.pending.push(article);
        true
    }

    fn drain(&mut self) -> Vec<DiscoveredArticle> {
        std::mem::take(&mut self.pending)
    }
}

struct Pass<'a> {
    store: &'a dyn MentionStore,
    deps: &'a VerifierDeps,
    status: &'a StatusHandle,
    browser: BrowserSlot,
    summary: Mutex<VerificationSummary>,
    library: Mutex<DiscoveryLibrary>,
}

impl Pass<'_> {
    async fn verify_batch(&self, mentions: &[MentionForVerification], level: u8) {
        if mentions.is_empty() {
            return;
        }
        let workers = self.deps.settings.concurrency.clamp(1, mentions.len());
        let cursor = AtomicUsize::new(0);
        let cursor = &cursor;

        tracing::debug!(level, workers, mentions = mentions.len(), "verifying batch");
        join_all((0..workers).map(move |_| self.worker(mentions, cursor, level))).await;
    }

    async fn worker(&self, mentions: &[MentionForVerification], cursor: &AtomicUsize, level: u8) {
        loop {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(mention) = mentions.get(index) else {
                break;
            };
            self.process(mention, level).await;
            tokio::time::sleep(self.deps.settings.rate_limit()).await;
        }
    }

    async fn process(&self, mention: &MentionForVerification, level: u8) {
        let browsers: &dyn BrowserProvider = &self.browser;
        let result =
            verify_with_retry(&self.deps.fetch, mention, Some(browsers), &self.deps.settings)
                .await;

        tracing::info!(
            mention_id = mention.id,
            client = %mention.client_name,
            outcome = ?result.outcome,
            reason = %result.reason,
            error = result.error.as_deref().unwrap_or(""),
            level,
            "mention verified"
        );

        let persisted = match self
            .store
            .update_verification(mention.id, result.outcome.to_verification())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    mention_id = mention.id,
                    error = %err,
                    "failed to persist verification"
                );
                false
            }
        };

        self.collect_discoveries(&result, level).await;

        let (processed, verified, failed, needs_review) = {
            let mut summary = self.summary.lock().await;
            summary.record(&result);
            if !persisted {
                summary.db_errors += 1;
            }
            (
                summary.processed,
                summary.verified,
                summary.failed,
                summary.needs_review,
            )
        };

        self.status.events().publish(PipelineEvent::MentionVerified {
            mention_id: mention.id,
            verified: result.is_confirmed(),
            outcome: result.outcome,
            reason: result.reason,
            title: mention.title.clone(),
            client_name: mention.client_name.clone(),
        });
        self.status
            .update_progress(processed, verified, failed, needs_review);
    }

    async fn collect_discoveries(&self, result: &VerificationResult, level: u8) {
        if result.discovered.is_empty() {
            return;
        }

        if level >= MAX_DISCOVERY_LEVEL {
            tracing::warn!(
                mention_id = result.mention_id,
                level,
                articles = result.discovered.len(),
                "listing page beyond discovery depth; dropping its articles"
            );
            self.summary.lock().await.discarded_beyond_depth += result.discovered.len();
            return;
        }

        let mut added = 0;
        for article in &result.discovered {
            let key = normalize_url_for_comparison(&article.url);
            if self.library.lock().await.has_seen(&key) {
                continue;
            }
            match self
                .store
                .mention_exists_for_url(article.client_id, &article.url)
                .await
            {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        url = %article.url,
                        error = %err,
                        "could not check discovered article"
                    );
                    continue;
                }
            }
            if self.library.lock().await.insert(key, article.clone()) {
                added += 1;
            }
        }

        if added > 0 {
            tracing::info!(
                mention_id = result.mention_id,
                added,
                "discovered articles from listing page"
            );
            self.summary.lock().await.discovered_articles += added;
        }
    }

    /// Records pending discoveries as mentions and returns them ready for
    /// verification.
    async fn record_discoveries(&self) -> Vec<MentionForVerification> {
        let articles = self.library.lock().await.drain();
        if articles.is_empty() {
            return Vec::new();
        }

        let client_names: HashMap<i64, String> = articles
            .iter()
            .map(|a| (a.client_id, a.client_name.clone()))
            .collect();
        let candidates: Vec<Candidate> = articles.into_iter().map(discovery_candidate).collect();
        let candidates = dedupe_candidates(candidates);

        let created = match record_mentions(
            self.store,
            self.status.events(),
            &self.deps.rules.blocklist,
            &candidates,
            "new",
        )
        .await
        {
            Ok(created) => created,
            Err(err) => {
                tracing::error!(error = %err, "failed to record discovered articles");
                self.summary.lock().await.db_errors += 1;
                return Vec::new();
            }
        };

        {
            let mut summary = self.summary.lock().await;
            summary.mentions_from_cards += created.len();
            summary.total += created.len();
        }

        created
            .iter()
            .map(|m| {
                let name = client_names
                    .get(&m.client_id)
                    .map_or("", String::as_str);
                MentionForVerification::from_mention(m, name)
            })
            .collect()
    }
}

fn discovery_candidate(article: DiscoveredArticle) -> Candidate {
    let title = if article.title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        article.title
    };
    let hit = RawHit {
        title,
        url: article.url,
        snippet: DISCOVERY_SNIPPET.to_string(),
        published_at: None,
        provider: DISCOVERY_PROVIDER.to_string(),
    };
    normalize_hit(
        hit,
        &ClientRef {
            id: article.client_id,
            name: article.client_name,
        },
    )
}

/// Verifies every mention that is not already confirmed.
///
/// Moves the status to `verifying`, reports progress per mention and ends in
/// `complete`. Rejected and unresolved mentions are checked again.
/// Persistence failures are counted in `db_errors` and do not stop the pass.
///
/// # Errors
///
/// Returns [`PipelineError::Store`] only if the mention list cannot be
/// loaded; the status is left untouched in that case.
pub async fn run_verification_pass(
    store: &dyn MentionStore,
    deps: &VerifierDeps,
    status: &StatusHandle,
) -> Result<VerificationSummary, PipelineError> {
    let mentions = store.list_mentions_for_verification().await?;
    let total = mentions.len();
    let (confirmed, pending): (Vec<_>, Vec<_>) = mentions
        .into_iter()
        .partition(|m| m.verification == Verification::Confirmed);

    tracing::info!(
        total,
        already_verified = confirmed.len(),
        to_verify = pending.len(),
        concurrency = deps.settings.concurrency,
        browser = deps.launcher.is_some(),
        "starting verification pass"
    );
    status.set_verifying(pending.len());

    let pass = Pass {
        store,
        deps,
        status,
        browser: BrowserSlot::new(deps.launcher.clone()),
        summary: Mutex::new(VerificationSummary {
            total,
            already_verified: confirmed.len(),
            ..VerificationSummary::default()
        }),
        library: Mutex::new(DiscoveryLibrary::default()),
    };

    pass.verify_batch(&pending, 0).await;

    for level in 1..=MAX_DISCOVERY_LEVEL {
        let discovered = pass.record_discoveries().await;
        if discovered.is_empty() {
            break;
        }
        tracing::info!(level, mentions = discovered.len(), "verifying discovered articles");
        status.add_to_total(discovered.len());
        pass.verify_batch(&discovered, level).await;
    }

    pass.browser.close().await;

    let summary = pass.summary.into_inner();
    summary.log();
    status.set_complete(&summary);
    Ok(summary)
}
