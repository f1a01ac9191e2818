//! Scheduled alert-feed polling.

use presswatch_core::{dedupe_candidates, normalize_hit, Candidate, FeedClient};
use presswatch_feeds::FeedFetcher;
use serde::Serialize;

use crate::error::PipelineError;
use crate::orchestrator::{run_verification_pass, VerifierDeps};
use crate::recorder::record_mentions;
use crate::status::StatusHandle;
use crate::store::MentionStore;
use crate::summary::VerificationSummary;

/// A per-client (or verification) failure captured during a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPollError {
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPollReport {
    pub feeds_polled: usize,
    pub entries_found: usize,
    pub mentions_created: usize,
    pub errors: Vec<FeedPollError>,
    /// Present when a verification pass ran after the poll.
    pub verification: Option<VerificationSummary>,
}

/// Fetches every client's alert feed and records new mentions, then
/// optionally verifies them.
///
/// A failing feed is logged and captured in the report; the other clients
/// are still polled. The status ends in `complete` on every path that gets
/// past loading the client list: with the pass summary when verification
/// ran, with zero counts otherwise. Callers are expected to have moved the
/// status to `searching` (see [`StatusHandle::try_begin`]).
///
/// # Errors
///
/// Returns [`PipelineError::Store`] if the client list cannot be loaded.
pub async fn poll_feeds(
    store: &dyn MentionStore,
    fetcher: &FeedFetcher,
    deps: &VerifierDeps,
    status: &StatusHandle,
    run_verification: bool,
) -> Result<FeedPollReport, PipelineError> {
    let clients = store.clients_with_feeds().await?;
    let mut report = FeedPollReport::default();

    if clients.is_empty() {
        tracing::info!("no clients with alert feeds configured");
    }

    for client in &clients {
        match poll_client(store, fetcher, deps, status, client).await {
            Ok((entries, created)) => {
                report.feeds_polled += 1;
                report.entries_found += entries;
                report.mentions_created += created;
            }
            Err(message) => {
                tracing::warn!(
                    client_id = client.id,
                    client = %client.name,
                    error = %message,
                    "feed poll failed"
                );
                report.errors.push(FeedPollError {
                    client_id: Some(client.id),
                    client_name: Some(client.name.clone()),
                    message,
                });
            }
        }
    }

    tracing::info!(
        feeds_polled = report.feeds_polled,
        entries_found = report.entries_found,
        mentions_created = report.mentions_created,
        errors = report.errors.len(),
        "feed poll finished"
    );

    if run_verification && report.mentions_created > 0 {
        match run_verification_pass(store, deps, status).await {
            Ok(summary) => report.verification = Some(summary),
            Err(err) => {
                tracing::error!(error = %err, "verification after feed poll failed");
                report.errors.push(FeedPollError {
                    client_id: None,
                    client_name: None,
                    message: format!("Verification failed: {err}"),
                });
                status.set_complete(&VerificationSummary::default());
            }
        }
    } else {
        status.set_complete(&VerificationSummary::default());
    }

    Ok(report)
}

/// Returns `(entries, mentions_created)` for one client.
async fn poll_client(
    store: &dyn MentionStore,
    fetcher: &FeedFetcher,
    deps: &VerifierDeps,
    status: &StatusHandle,
    client: &FeedClient,
) -> Result<(usize, usize), String> {
    let hits = fetcher
        .fetch_feed(&client.feed_url)
        .await
        .map_err(|e| e.to_string())?;
    let entries = hits.len();

    let client_ref = client.as_client_ref();
    let candidates: Vec<Candidate> = hits
        .into_iter()
        .map(|hit| normalize_hit(hit, &client_ref))
        .collect();
    let candidates = dedupe_candidates(candidates);

    let created = record_mentions(
        store,
        status.events(),
        &deps.rules.blocklist,
        &candidates,
        "new",
    )
    .await
    .map_err(|e| e.to_string())?;

    tracing::info!(
        client_id = client.id,
        client = %client.name,
        entries,
        created = created.len(),
        "polled client feed"
    );
    Ok((entries, created.len()))
}
