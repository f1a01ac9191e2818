//! Bounded retry around single verification attempts.
//!
//! Confirmed results, terminal reasons and results already flagged for manual
//! review are returned as soon as they appear. Anything else is retried after
//! a fixed delay until the attempt budget runs out, at which point the last
//! result is handed to a human.

use std::future::Future;
use std::time::Duration;

use presswatch_core::{MentionForVerification, VerificationSettings};

use crate::browser::BrowserProvider;
use crate::fetch::FetchVerifier;
use crate::outcome::{Outcome, VerificationResult};

const EXHAUSTED_SUFFIX: &str = " - needs manual review after retries";

fn is_final(result: &VerificationResult) -> bool {
    result.outcome == Outcome::Confirmed
        || result.outcome == Outcome::NeedsReview
        || result.reason.is_terminal()
}

/// Runs `attempt` up to `max_attempts` times (at least once), sleeping
/// `delay` between tries.
pub async fn retry_attempts<F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut attempt: F,
) -> VerificationResult
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = VerificationResult>,
{
    let max_attempts = max_attempts.max(1);
    let mut number = 1u32;

    loop {
        let result = attempt(number).await;
        if is_final(&result) {
            return result;
        }

        if number >= max_attempts {
            tracing::warn!(
                mention_id = result.mention_id,
                attempts = number,
                reason = %result.reason,
                "verification retries exhausted"
            );
            let error = format!(
                "{}{EXHAUSTED_SUFFIX}",
                result.error.as_deref().unwrap_or(result.reason.as_str())
            );
            return VerificationResult {
                outcome: Outcome::NeedsReview,
                error: Some(error),
                ..result
            };
        }

        tracing::debug!(
            mention_id = result.mention_id,
            attempt = number,
            max_attempts,
            reason = %result.reason,
            "verification attempt inconclusive, retrying"
        );
        tokio::time::sleep(delay).await;
        number += 1;
    }
}

/// Verifies `mention` with the retry policy from `settings`.
pub async fn verify_with_retry(
    verifier: &FetchVerifier,
    mention: &MentionForVerification,
    browsers: Option<&dyn BrowserProvider>,
    settings: &VerificationSettings,
) -> VerificationResult {
    retry_attempts(settings.max_retries, settings.retry_delay(), move |_| {
        verifier.verify_once(mention, browsers)
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::outcome::Reason;

    fn result(outcome: Outcome, reason: Reason) -> VerificationResult {
        VerificationResult::new(1, 2, outcome, reason)
    }

    async fn run(max: u32, responses: Vec<VerificationResult>) -> (VerificationResult, u32) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = retry_attempts(max, Duration::ZERO, move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            let idx = usize::try_from(n - 1).unwrap().min(responses.len() - 1);
            let response = responses[idx].clone();
            async move { response }
        })
        .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn confirmed_returns_immediately() {
        let (res, calls) = run(3, vec![result(Outcome::Confirmed, Reason::Verified)]).await;
        assert_eq!(res.outcome, Outcome::Confirmed);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn terminal_reasons_are_not_retried() {
        for reason in [
            Reason::NameNotFound,
            Reason::NoUrl,
            Reason::InvalidUrl,
            Reason::NotHtml,
            Reason::DocumentType,
            Reason::HttpError4xx,
            Reason::CardItemListingPage,
        ] {
            let (res, calls) = run(3, vec![result(Outcome::Rejected, reason)]).await;
            assert_eq!(calls, 1, "{reason} should not retry");
            assert_eq!(res.outcome, Outcome::Rejected);
            assert_eq!(res.reason, reason);
        }
    }

    #[tokio::test]
    async fn needs_review_short_circuits() {
        let (res, calls) = run(3, vec![result(Outcome::NeedsReview, Reason::HttpError5xx)]).await;
        assert_eq!(calls, 1);
        assert_eq!(res.reason, Reason::HttpError5xx);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let (res, calls) = run(
            3,
            vec![
                result(Outcome::Rejected, Reason::HttpError),
                result(Outcome::Confirmed, Reason::Verified),
            ],
        )
        .await;
        assert_eq!(res.outcome, Outcome::Confirmed);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn exhaustion_forces_manual_review() {
        let (res, calls) = run(
            3,
            vec![result(Outcome::Rejected, Reason::HttpError).with_error("HTTP 302")],
        )
        .await;
        assert_eq!(calls, 3);
        assert_eq!(res.outcome, Outcome::NeedsReview);
        assert_eq!(res.reason, Reason::HttpError);
        assert_eq!(
            res.error.as_deref(),
            Some("HTTP 302 - needs manual review after retries")
        );
    }

    #[tokio::test]
    async fn zero_budget_still_attempts_once() {
        let (res, calls) = run(0, vec![result(Outcome::Rejected, Reason::HttpError)]).await;
        assert_eq!(calls, 1);
        assert_eq!(res.outcome, Outcome::NeedsReview);
    }
}
