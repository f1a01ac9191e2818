//! Headless-browser verification for pages that refuse plain fetches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use presswatch_core::{
    DiscoveredArticle, MentionForVerification, VerificationRules, VerificationSettings,
};
use scraper::Html;
use url::Url;

use crate::cards::{analyze_card_items, visible_text};
use crate::content::{is_blocked_page, ContentRules};
use crate::error::BrowserError;
use crate::outcome::{Outcome, Reason, VerificationResult};

pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// How a page should be loaded before its content is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOptions {
    pub timeout: Duration,
    /// Extra wait after `domcontentloaded` for client-side rendering.
    pub settle_delay: Duration,
    pub user_agent: String,
    pub viewport: (u32, u32),
}

impl NavigationOptions {
    #[must_use]
    pub fn from_settings(settings: &VerificationSettings) -> Self {
        Self {
            timeout: settings.browser_timeout(),
            settle_delay: settings.settle_delay(),
            user_agent: settings.user_agent.clone(),
            viewport: (VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
        }
    }
}

#[async_trait]
pub trait BrowserPage: Send {
    async fn goto(&mut self, url: &str, options: &NavigationOptions) -> Result<(), BrowserError>;

    /// Rendered HTML of the current document.
    async fn content(&mut self) -> Result<String, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Browser>, BrowserError>;
}

/// Hands out a shared browser on demand; `None` means no browser is
/// available right now.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn browser(&self) -> Option<Arc<dyn Browser>>;
}

/// Renders a mention's page and classifies what the browser sees.
#[derive(Debug, Clone)]
pub struct BrowserVerifier {
    rules: Arc<VerificationRules>,
    content: ContentRules,
    navigation: NavigationOptions,
}

impl BrowserVerifier {
    #[must_use]
    pub fn new(
        rules: Arc<VerificationRules>,
        content: ContentRules,
        navigation: NavigationOptions,
    ) -> Self {
        Self {
            rules,
            content,
            navigation,
        }
    }

    /// Opens a page, renders the mention's link and classifies it. The page
    /// is closed on every path; close failures are only logged.
    pub async fn verify(
        &self,
        mention: &MentionForVerification,
        browser: &dyn Browser,
    ) -> VerificationResult {
        let Some(link) = mention.link.as_deref() else {
            return VerificationResult::new(
                mention.id,
                mention.client_id,
                Outcome::Rejected,
                Reason::NoUrl,
            );
        };

        let mut page = match browser.new_page().await {
            Ok(page) => page,
            Err(e) => return browser_error(mention, &e),
        };

        let rendered = self.render(page.as_mut(), link).await;

        if let Err(e) = page.close().await {
            tracing::debug!(mention_id = mention.id, error = %e, "failed to close browser page");
        }

        match rendered {
            Ok(html) => self.classify_rendered(mention, link, &html),
            Err(e) => browser_error(mention, &e),
        }
    }

    async fn render(&self, page: &mut dyn BrowserPage, link: &str) -> Result<String, BrowserError> {
        page.goto(link, &self.navigation).await?;
        page.content().await
    }

    /// Classifies already-rendered HTML for `mention`.
    #[must_use]
    pub fn classify_rendered(
        &self,
        mention: &MentionForVerification,
        link: &str,
        html: &str,
    ) -> VerificationResult {
        let result = |outcome, reason| {
            VerificationResult::new(mention.id, mention.client_id, outcome, reason)
        };

        let document = Html::parse_document(html);
        let text = visible_text(&document, |_| false);

        if is_blocked_page(&text) || self.content.is_suspiciously_short(&text) {
            return result(Outcome::NeedsReview, Reason::BlockedPageDetected).with_error(
                "Page appears to be blocked or challenge page - needs manual review",
            );
        }

        if !self.content.contains_client_name(&text, &mention.client_name) {
            return result(Outcome::Rejected, Reason::NameNotFound);
        }

        let site = self.rules.card_item_site_for(link);
        let page_url = Url::parse(link).ok();
        if let (Some(site), Some(page_url)) = (site, page_url) {
            match analyze_card_items(
                &document,
                &page_url,
                &mention.client_name,
                &self.content,
                site,
            ) {
                Ok(analysis) if analysis.is_listing_page() => {
                    tracing::info!(
                        mention_id = mention.id,
                        cards = analysis.total_cards,
                        matching_cards = analysis.cards_with_match.len(),
                        "client only mentioned in listing cards"
                    );
                    let discovered = analysis
                        .cards_with_match
                        .into_iter()
                        .map(|card| DiscoveredArticle {
                            url: card.url,
                            title: card.title,
                            client_id: mention.client_id,
                            client_name: mention.client_name.clone(),
                        })
                        .collect();
                    return result(Outcome::Rejected, Reason::CardItemListingPage)
                        .with_error("Name only found in card-item listing")
                        .with_discovered(discovered);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        domain = %site.domain,
                        error = %e,
                        "card-item rule could not be applied"
                    );
                }
            }
        }

        result(Outcome::Confirmed, Reason::VerifiedBrowser)
    }
}

fn browser_error(mention: &MentionForVerification, err: &BrowserError) -> VerificationResult {
    VerificationResult::new(
        mention.id,
        mention.client_id,
        Outcome::NeedsReview,
        Reason::BrowserError,
    )
    .with_error(format!("{err} - needs manual review"))
}

#[cfg(test)]
#[path = "browser_test.rs"]
mod tests;
