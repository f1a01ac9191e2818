use presswatch_db::DbError;
use presswatch_feeds::FeedError;
use presswatch_verify::VerifyError;
use thiserror::Error;

/// Failure of a [`crate::MentionStore`] call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("mention store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load mentions: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build verifier: {0}")]
    Verify(#[from] VerifyError),
    #[error("failed to build feed fetcher: {0}")]
    Feed(#[from] FeedError),
    #[error("a verification pass is already running")]
    AlreadyRunning,
}
