//! Shared progress state of the verification pipeline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::PipelineError;
use crate::events::{EventBus, PipelineEvent};
use crate::summary::VerificationSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Searching,
    Verifying,
    Complete,
}

/// Counts attached to a `verification_phase` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub phase: Phase,
    pub total: usize,
    pub processed: usize,
    pub verified: usize,
    pub failed: usize,
    pub needs_review: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Cloneable handle to the pipeline status.
///
/// Every transition publishes a `verification_phase` event followed by a
/// `verification_status` snapshot on the bus; `set_idle` publishes only the
/// phase.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    state: Arc<Mutex<StatusSnapshot>>,
    events: EventBus,
}

impl StatusHandle {
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(StatusSnapshot::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().is_running
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Moves to `searching` unless a run is already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyRunning`] (and changes nothing) when
    /// one is.
    pub fn try_begin(&self) -> Result<(), PipelineError> {
        let snapshot = {
            let mut state = self.lock();
            if state.is_running {
                return Err(PipelineError::AlreadyRunning);
            }
            *state = searching_state();
            state.clone()
        };
        self.publish_transition(&snapshot, PhaseStats::default());
        Ok(())
    }

    pub fn set_searching(&self) {
        let snapshot = {
            let mut state = self.lock();
            *state = searching_state();
            state.clone()
        };
        self.publish_transition(&snapshot, PhaseStats::default());
    }

    pub fn set_verifying(&self, total: usize) {
        let snapshot = {
            let mut state = self.lock();
            state.is_running = true;
            state.phase = Phase::Verifying;
            state.total = total;
            state.processed = 0;
            state.verified = 0;
            state.failed = 0;
            state.needs_review = 0;
            state.started_at.get_or_insert_with(Utc::now);
            state.completed_at = None;
            state.clone()
        };
        self.publish_transition(
            &snapshot,
            PhaseStats {
                total: Some(total),
                ..PhaseStats::default()
            },
        );
    }

    /// Grows the expected total when discovered articles join the run.
    pub fn add_to_total(&self, additional: usize) {
        let snapshot = {
            let mut state = self.lock();
            state.total += additional;
            state.clone()
        };
        self.publish_status(snapshot);
    }

    pub fn update_progress(
        &self,
        processed: usize,
        verified: usize,
        failed: usize,
        needs_review: usize,
    ) {
        let snapshot = {
            let mut state = self.lock();
            state.processed = processed;
            state.verified = verified;
            state.failed = failed;
            state.needs_review = needs_review;
            state.clone()
        };
        self.publish_status(snapshot);
    }

    pub fn set_complete(&self, summary: &VerificationSummary) {
        let snapshot = {
            let mut state = self.lock();
            state.is_running = false;
            state.phase = Phase::Complete;
            state.verified = summary.verified;
            state.failed = summary.failed;
            state.needs_review = summary.needs_review;
            state.completed_at = Some(Utc::now());
            state.clone()
        };
        self.publish_transition(
            &snapshot,
            PhaseStats {
                total: Some(summary.total),
                verified: Some(summary.verified),
                failed: Some(summary.failed),
            },
        );
    }

    pub fn set_idle(&self) {
        *self.lock() = StatusSnapshot::default();
        self.events.publish(PipelineEvent::VerificationPhase {
            phase: Phase::Idle,
            stats: PhaseStats::default(),
        });
    }

    fn publish_transition(&self, snapshot: &StatusSnapshot, stats: PhaseStats) {
        self.events.publish(PipelineEvent::VerificationPhase {
            phase: snapshot.phase,
            stats,
        });
        self.publish_status(snapshot.clone());
    }

    fn publish_status(&self, status: StatusSnapshot) {
        self.events
            .publish(PipelineEvent::VerificationStatus { status });
    }
}

fn searching_state() -> StatusSnapshot {
    StatusSnapshot {
        is_running: true,
        phase: Phase::Searching,
        started_at: Some(Utc::now()),
        ..StatusSnapshot::default()
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
