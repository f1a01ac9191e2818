//! Background job scheduler.
//!
//! Registers the recurring feed poll and the daily verification pass. Both
//! jobs claim the shared status first and skip their tick when a run is
//! already in progress.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;
use crate::runs::{run_feed_poll, run_verification};

/// Every two hours at minute 30 (UTC).
pub const FEED_POLL_SCHEDULE: &str = "0 30 */2 * * *";

/// Daily at 03:00 UTC.
pub const DAILY_VERIFICATION_SCHEDULE: &str = "0 0 3 * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(state: AppState) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_feed_poll_job(&scheduler, state.clone()).await?;
    register_verification_job(&scheduler, state).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_feed_poll_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(FEED_POLL_SCHEDULE, move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            if let Err(e) = state.status.try_begin() {
                tracing::info!(reason = %e, "scheduler: skipping feed poll");
                return;
            }
            tracing::info!("scheduler: starting feed poll");
            run_feed_poll(&state).await;
            tracing::info!("scheduler: feed poll complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_verification_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(DAILY_VERIFICATION_SCHEDULE, move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            if let Err(e) = state.status.try_begin() {
                tracing::info!(reason = %e, "scheduler: skipping daily pass");
                return;
            }
            tracing::info!("scheduler: starting daily verification");
            run_verification(&state).await;
            tracing::info!("scheduler: daily verification complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
