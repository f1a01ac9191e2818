use std::collections::BTreeMap;

use presswatch_verify::{Outcome, Reason, VerificationResult};
use serde::Serialize;

/// Counters for one verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSummary {
    /// Every mention considered, including already-confirmed ones and those
    /// created from listing-page discoveries.
    pub total: usize,
    pub processed: usize,
    pub already_verified: usize,
    pub verified: usize,
    pub failed: usize,
    pub needs_review: usize,
    pub browser_used: usize,
    pub snippet_verified: usize,
    pub card_item_listing_pages: usize,
    pub discovered_articles: usize,
    pub mentions_from_cards: usize,
    pub discarded_beyond_depth: usize,
    pub db_errors: usize,
    /// Failure and review reasons keyed by reason code.
    pub errors: BTreeMap<String, usize>,
}

impl VerificationSummary {
    /// Folds one result into the counters.
    ///
    /// A listing page is rejected but not counted as a failure: its articles
    /// are verified separately. `browser_used` counts only mentions confirmed
    /// by a browser render.
    pub fn record(&mut self, result: &VerificationResult) {
        self.processed += 1;

        if result.reason == Reason::VerifiedBrowser {
            self.browser_used += 1;
        }

        match result.outcome {
            Outcome::Confirmed => {
                self.verified += 1;
                if result.reason == Reason::VerifiedSnippet {
                    self.snippet_verified += 1;
                }
            }
            Outcome::Rejected if result.reason == Reason::CardItemListingPage => {
                self.card_item_listing_pages += 1;
            }
            Outcome::Rejected => {
                self.failed += 1;
                self.count_reason(result.reason);
            }
            Outcome::NeedsReview => {
                self.needs_review += 1;
                self.count_reason(result.reason);
            }
        }
    }

    fn count_reason(&mut self, reason: Reason) {
        *self.errors.entry(reason.as_str().to_string()).or_default() += 1;
    }

    /// Percentage of checked mentions that were confirmed, or `None` when
    /// nothing needed checking.
    #[must_use]
    pub fn verification_rate(&self) -> Option<usize> {
        let checked = self.total.saturating_sub(self.already_verified);
        (checked > 0).then(|| self.verified * 100 / checked)
    }

    /// Reasons ordered by descending count, then by code.
    #[must_use]
    pub fn reasons_by_count(&self) -> Vec<(&str, usize)> {
        let mut reasons: Vec<(&str, usize)> = self
            .errors
            .iter()
            .map(|(reason, count)| (reason.as_str(), *count))
            .collect();
        reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        reasons
    }

    pub fn log(&self) {
        tracing::info!(
            total = self.total,
            already_verified = self.already_verified,
            verified = self.verified,
            failed = self.failed,
            needs_review = self.needs_review,
            browser_used = self.browser_used,
            snippet_verified = self.snippet_verified,
            card_item_listing_pages = self.card_item_listing_pages,
            discovered_articles = self.discovered_articles,
            mentions_from_cards = self.mentions_from_cards,
            discarded_beyond_depth = self.discarded_beyond_depth,
            db_errors = self.db_errors,
            verification_rate = ?self.verification_rate(),
            "verification pass complete"
        );

        let unsuccessful = self.failed + self.needs_review;
        for (reason, count) in self.reasons_by_count() {
            let percent = if unsuccessful == 0 {
                0
            } else {
                count * 100 / unsuccessful
            };
            tracing::info!(reason, count, percent, "verification reason");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: Outcome, reason: Reason) -> VerificationResult {
        VerificationResult::new(1, 1, outcome, reason)
    }

    #[test]
    fn listing_pages_are_not_failures() {
        let mut summary = VerificationSummary::default();
        summary.record(&result(Outcome::Rejected, Reason::CardItemListingPage));
        summary.record(&result(Outcome::Rejected, Reason::NameNotFound));

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.card_item_listing_pages, 1);
        assert_eq!(summary.browser_used, 0);
        assert_eq!(summary.errors.get("name_not_found"), Some(&1));
        assert!(!summary.errors.contains_key("card_item_listing_page"));
    }

    #[test]
    fn confirmed_results_count_their_method() {
        let mut summary = VerificationSummary::default();
        summary.record(&result(Outcome::Confirmed, Reason::VerifiedSnippet));
        summary.record(&result(Outcome::Confirmed, Reason::VerifiedBrowser));
        summary.record(&result(Outcome::Confirmed, Reason::Verified));

        assert_eq!(summary.verified, 3);
        assert_eq!(summary.snippet_verified, 1);
        assert_eq!(summary.browser_used, 1);
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn browser_used_counts_only_browser_confirmations() {
        let mut summary = VerificationSummary::default();
        summary.record(&result(Outcome::NeedsReview, Reason::BlockedPageDetected));
        summary.record(&result(Outcome::NeedsReview, Reason::BrowserError));
        summary.record(&result(Outcome::Rejected, Reason::NameNotFound));
        summary.record(&result(Outcome::Confirmed, Reason::VerifiedBrowser));
        summary.record(&result(Outcome::Confirmed, Reason::VerifiedBrowser));

        assert_eq!(summary.browser_used, 2);
        assert_eq!(summary.verified, 2);
        assert_eq!(summary.needs_review, 2);
    }

    #[test]
    fn review_reasons_are_counted() {
        let mut summary = VerificationSummary::default();
        summary.record(&result(Outcome::NeedsReview, Reason::Blocked));
        summary.record(&result(Outcome::NeedsReview, Reason::Blocked));
        summary.record(&result(Outcome::NeedsReview, Reason::Timeout));

        assert_eq!(summary.needs_review, 3);
        assert_eq!(summary.reasons_by_count(), vec![("blocked", 2), ("timeout", 1)]);
    }

    #[test]
    fn rate_excludes_already_verified() {
        let summary = VerificationSummary {
            total: 10,
            already_verified: 6,
            verified: 3,
            ..VerificationSummary::default()
        };
        assert_eq!(summary.verification_rate(), Some(75));

        let nothing_to_check = VerificationSummary {
            total: 2,
            already_verified: 2,
            ..VerificationSummary::default()
        };
        assert_eq!(nothing_to_check.verification_rate(), None);
    }
}
