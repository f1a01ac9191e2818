//! Lazily launched browser shared by all verification workers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use presswatch_verify::{Browser, BrowserLauncher, BrowserProvider};
use tokio::sync::Mutex;

type LaunchFuture = Shared<BoxFuture<'static, Option<Arc<dyn Browser>>>>;

enum SlotState {
    Idle,
    Launching {
        generation: u64,
        launch: LaunchFuture,
    },
    Ready(Arc<dyn Browser>),
    Closed,
}

struct Inner {
    state: SlotState,
    generation: u64,
}

/// Single-flight browser launcher.
///
/// At most one launch is in flight; concurrent callers await the same launch
/// and all observe its browser or its failure. A failed launch resets the
/// slot so the next caller tries again. After [`BrowserSlot::close`] the slot
/// hands out nothing.
pub struct BrowserSlot {
    launcher: Option<Arc<dyn BrowserLauncher>>,
    inner: Mutex<Inner>,
}

impl BrowserSlot {
    #[must_use]
    pub fn new(launcher: Option<Arc<dyn BrowserLauncher>>) -> Self {
        Self {
            launcher,
            inner: Mutex::new(Inner {
                state: SlotState::Idle,
                generation: 0,
            }),
        }
    }

    /// Returns the shared browser, launching it on first use.
    ///
    /// `None` when no launcher is configured, the launch failed, or the slot
    /// was closed.
    pub async fn acquire(&self) -> Option<Arc<dyn Browser>> {
        let launcher = self.launcher.as_ref()?;

        let (generation, launch) = {
            let mut inner = self.inner.lock().await;
            match &inner.state {
                SlotState::Ready(browser) => return Some(Arc::clone(browser)),
                SlotState::Closed => return None,
                SlotState::Launching { generation, launch } => (*generation, launch.clone()),
                SlotState::Idle => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let launcher = Arc::clone(launcher);
                    let launch = async move {
                        match launcher.launch().await {
                            Ok(browser) => {
                                tracing::info!("browser launched");
                                Some(browser)
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, "browser unavailable");
                                None
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    inner.state = SlotState::Launching {
                        generation,
                        launch: launch.clone(),
                    };
                    (generation, launch)
                }
            }
        };

        let browser = launch.await;

        let mut inner = self.inner.lock().await;
        let current = matches!(
            &inner.state,
            SlotState::Launching { generation: g, .. } if *g == generation
        );
        if current {
            inner.state = match &browser {
                Some(browser) => SlotState::Ready(Arc::clone(browser)),
                None => SlotState::Idle,
            };
            return browser;
        }
        if matches!(inner.state, SlotState::Closed) {
            drop(inner);
            // Closed while launching; nobody will close this one later.
            if let Some(browser) = browser {
                close_quietly(browser.as_ref()).await;
            }
            return None;
        }
        browser
    }

    /// Closes the browser if one was launched. Close errors are logged.
    pub async fn close(&self) {
        let previous = {
            let mut inner = self.inner.lock().await;
            std::mem::replace(&mut inner.state, SlotState::Closed)
        };
        if let SlotState::Ready(browser) = previous {
            close_quietly(browser.as_ref()).await;
        }
    }
}

async fn close_quietly(browser: &dyn Browser) {
    if let Err(err) = browser.close().await {
        tracing::debug!(error = %err, "failed to close browser");
    }
}

#[async_trait]
impl BrowserProvider for BrowserSlot {
    async fn browser(&self) -> Option<Arc<dyn Browser>> {
        self.acquire().await
    }
}
