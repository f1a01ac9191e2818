//! Verification and feed-polling command handlers for the CLI.
//!
//! Both commands run against Postgres through [`PgMentionStore`] and share a
//! fresh [`StatusHandle`]; nobody subscribes to its events from the CLI, so
//! progress is reported through the tracing log and a printed summary.

use std::sync::Arc;

use presswatch_core::{AppConfig, VerificationRules};
use presswatch_feeds::FeedFetcher;
use presswatch_pipeline::{
    poll_feeds, run_verification_pass, EventBus, FeedPollReport, PgMentionStore, StatusHandle,
    VerificationSummary, VerifierDeps,
};

/// Run one verification pass over every stored mention.
///
/// # Errors
///
/// Returns an error if the verifiers cannot be built or the mention list
/// cannot be loaded. Per-mention failures end up in the summary.
pub(crate) async fn run_verify(
    pool: sqlx::PgPool,
    config: &AppConfig,
    rules: Arc<VerificationRules>,
) -> anyhow::Result<()> {
    let deps = VerifierDeps::from_config(config, rules)?;
    let store = PgMentionStore::new(pool);
    let status = StatusHandle::new(EventBus::new());

    if deps.launcher.is_none() {
        tracing::warn!("PRESSWATCH_BROWSERLESS_URL not set; blocked pages will need review");
    }

    status.set_searching();
    let summary = match run_verification_pass(&store, &deps, &status).await {
        Ok(summary) => summary,
        Err(e) => {
            status.set_idle();
            return Err(e.into());
        }
    };

    for line in summary_lines(&summary) {
        println!("{line}");
    }
    Ok(())
}

/// Poll every client's alert feed, optionally verifying what was recorded.
///
/// # Errors
///
/// Returns an error if the feed client or verifiers cannot be built, or the
/// client list cannot be loaded. Failing feeds are printed and skipped.
pub(crate) async fn run_poll_feeds(
    pool: sqlx::PgPool,
    config: &AppConfig,
    rules: Arc<VerificationRules>,
    verify: bool,
) -> anyhow::Result<()> {
    let deps = VerifierDeps::from_config(config, rules)?;
    let fetcher = FeedFetcher::with_defaults()
        .map_err(|e| anyhow::anyhow!("failed to build feed client: {e}"))?;
    let store = PgMentionStore::new(pool);
    let status = StatusHandle::new(EventBus::new());

    status.set_searching();
    let report = match poll_feeds(&store, &fetcher, &deps, &status, verify).await {
        Ok(report) => report,
        Err(e) => {
            status.set_idle();
            return Err(e.into());
        }
    };

    for line in report_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

/// Human-readable lines for a finished verification pass.
pub(crate) fn summary_lines(summary: &VerificationSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "verified {} of {} mentions ({} already verified)",
            summary.verified, summary.total, summary.already_verified
        ),
        format!(
            "failed: {}  needs review: {}  browser used: {}  snippet matches: {}",
            summary.failed, summary.needs_review, summary.browser_used, summary.snippet_verified
        ),
    ];

    if summary.card_item_listing_pages > 0 {
        lines.push(format!(
            "listing pages: {}  discovered articles: {}  new mentions: {}  beyond depth: {}",
            summary.card_item_listing_pages,
            summary.discovered_articles,
            summary.mentions_from_cards,
            summary.discarded_beyond_depth
        ));
    }
    if summary.db_errors > 0 {
        lines.push(format!("database errors: {}", summary.db_errors));
    }

    match summary.verification_rate() {
        Some(rate) => lines.push(format!("verification rate: {rate}%")),
        None => lines.push("verification rate: n/a".to_string()),
    }

    for (reason, count) in summary.reasons_by_count() {
        lines.push(format!("  {reason}: {count}"));
    }
    lines
}

/// Human-readable lines for a finished feed poll.
pub(crate) fn report_lines(report: &FeedPollReport) -> Vec<String> {
    let mut lines = vec![format!(
        "polled {} feeds: {} entries, {} new mentions",
        report.feeds_polled, report.entries_found, report.mentions_created
    )];

    for error in &report.errors {
        match &error.client_name {
            Some(name) => lines.push(format!("error: {name}: {}", error.message)),
            None => lines.push(format!("error: {}", error.message)),
        }
    }

    if let Some(summary) = &report.verification {
        lines.extend(summary_lines(summary));
    }
    lines
}
