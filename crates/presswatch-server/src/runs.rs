//! Background runs shared by the API and the scheduler.
//!
//! Both expect the caller to have claimed the status with
//! [`StatusHandle::try_begin`](presswatch_pipeline::StatusHandle::try_begin).
//! A run that fails before completing resets the status to idle so the next
//! trigger is not refused.

use presswatch_pipeline::{poll_feeds, run_verification_pass};

use crate::api::AppState;

/// Runs one verification pass over every stored mention.
pub async fn run_verification(state: &AppState) {
    match run_verification_pass(&*state.store, &state.deps, &state.status).await {
        Ok(summary) => {
            tracing::info!(
                verified = summary.verified,
                failed = summary.failed,
                needs_review = summary.needs_review,
                "verification run finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "verification run failed");
            state.status.set_idle();
        }
    }
}

/// Polls every client's alert feed and verifies what was recorded.
pub async fn run_feed_poll(state: &AppState) {
    match poll_feeds(
        &*state.store,
        &state.fetcher,
        &state.deps,
        &state.status,
        true,
    )
    .await
    {
        Ok(report) => {
            for error in &report.errors {
                tracing::warn!(
                    client_id = ?error.client_id,
                    client = ?error.client_name,
                    error = %error.message,
                    "feed poll error"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "feed poll failed");
            state.status.set_idle();
        }
    }
}
