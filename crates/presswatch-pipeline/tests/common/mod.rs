//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use presswatch_core::{CardItemSite, VerificationRules, VerificationSettings};
use presswatch_pipeline::{PipelineEvent, VerifierDeps};
use presswatch_verify::{
    Browser, BrowserError, BrowserLauncher, BrowserPage, FetchVerifier, NavigationOptions,
};
use tokio::sync::broadcast;

pub fn test_settings() -> VerificationSettings {
    VerificationSettings {
        concurrency: 2,
        max_retries: 2,
        retry_delay_ms: 0,
        rate_limit_ms: 0,
        fetch_timeout_ms: 2_000,
        min_content_length: 20,
        user_agent: "presswatch-test/0.1".to_string(),
        ..VerificationSettings::default()
    }
}

/// Rules treating the local mock server as a card-item site.
pub fn card_rules() -> Arc<VerificationRules> {
    Arc::new(VerificationRules {
        card_item_sites: vec![CardItemSite {
            domain: "127.0.0.1".to_string(),
            card_selector: ".card-item".to_string(),
            link_selector: "a".to_string(),
        }],
        ..VerificationRules::default()
    })
}

pub fn deps(
    rules: Arc<VerificationRules>,
    launcher: Option<Arc<dyn BrowserLauncher>>,
) -> VerifierDeps {
    let settings = test_settings();
    let fetch = FetchVerifier::builder(&settings, Arc::clone(&rules))
        .allow_private_hosts(true)
        .build()
        .expect("failed to build test FetchVerifier");
    VerifierDeps {
        fetch,
        launcher,
        settings,
        rules,
    }
}

pub fn article_html(body: &str) -> String {
    format!(
        "<html><head><title>News</title></head><body>\
         <p>Regional produce coverage and market commentary.</p>{body}</body></html>"
    )
}

pub fn drain(rx: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ---- Fake browser ----------------------------------------------------------

/// Serves canned HTML per URL; unknown URLs fail navigation.
pub struct PageBrowser {
    pages: Arc<HashMap<String, String>>,
}

struct PageTab {
    pages: Arc<HashMap<String, String>>,
    current: Option<String>,
}

#[async_trait]
impl BrowserPage for PageTab {
    async fn goto(&mut self, url: &str, _options: &NavigationOptions) -> Result<(), BrowserError> {
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| BrowserError::Network(format!("no page for {url}")))?;
        self.current = Some(html.clone());
        Ok(())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.current.clone().ok_or(BrowserError::PageClosed)
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        Ok(())
    }
}

#[async_trait]
impl Browser for PageBrowser {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Ok(Box::new(PageTab {
            pages: Arc::clone(&self.pages),
            current: None,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

pub struct PageLauncher {
    pages: Arc<HashMap<String, String>>,
    pub launches: AtomicUsize,
    fail: bool,
}

impl PageLauncher {
    pub fn new(pages: HashMap<String, String>) -> Self {
        Self {
            pages: Arc::new(pages),
            launches: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(HashMap::new())
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for PageLauncher {
    async fn launch(&self) -> Result<Arc<dyn Browser>, BrowserError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BrowserError::Launch("connection refused".to_string()));
        }
        Ok(Arc::new(PageBrowser {
            pages: Arc::clone(&self.pages),
        }))
    }
}
