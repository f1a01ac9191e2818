//! Recording, verification and feed polling for presswatch.
//!
//! Ties the pure normalization in `presswatch-core`, the verifiers in
//! `presswatch-verify` and the feed client in `presswatch-feeds` to a
//! [`MentionStore`], reporting progress through a [`StatusHandle`] and an
//! [`EventBus`].

pub mod browser_slot;
pub mod error;
pub mod events;
pub mod feed_runner;
pub mod orchestrator;
pub mod recorder;
pub mod status;
pub mod store;
pub mod summary;

pub use browser_slot::BrowserSlot;
pub use error::{PipelineError, StoreError};
pub use events::{EventBus, PipelineEvent};
pub use feed_runner::{poll_feeds, FeedPollError, FeedPollReport};
pub use orchestrator::{
    run_verification_pass, VerifierDeps, DISCOVERY_PROVIDER, DISCOVERY_SNIPPET,
    MAX_DISCOVERY_LEVEL,
};
pub use recorder::record_mentions;
pub use status::{Phase, PhaseStats, StatusHandle, StatusSnapshot};
pub use store::{MemoryStore, MentionStore, PgMentionStore};
pub use summary::VerificationSummary;
