//! Events pushed to live subscribers (the dashboard WebSocket).

use presswatch_core::Mention;
use presswatch_verify::{Outcome, Reason};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::status::{Phase, PhaseStats, StatusSnapshot};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    VerificationStatus {
        status: StatusSnapshot,
    },
    VerificationPhase {
        phase: Phase,
        #[serde(flatten)]
        stats: PhaseStats,
    },
    #[serde(rename_all = "camelCase")]
    MentionVerified {
        mention_id: i64,
        verified: bool,
        outcome: Outcome,
        reason: Reason,
        title: String,
        client_name: String,
    },
    NewMention {
        mention: Mention,
    },
}

/// Fan-out channel for [`PipelineEvent`]s.
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped, and slow subscribers observe a lag.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: PipelineEvent) {
        // Err only means there are no receivers right now.
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish(PipelineEvent::VerificationPhase {
            phase: Phase::Idle,
            stats: PhaseStats::default(),
        });
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(PipelineEvent::MentionVerified {
            mention_id: 7,
            verified: true,
            outcome: Outcome::Confirmed,
            reason: Reason::Verified,
            title: "Acme wins award".to_string(),
            client_name: "Acme".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            PipelineEvent::MentionVerified { mention_id: 7, .. }
        ));
    }

    #[test]
    fn mention_verified_serializes_with_type_tag() {
        let event = PipelineEvent::MentionVerified {
            mention_id: 3,
            verified: false,
            outcome: Outcome::Rejected,
            reason: Reason::NameNotFound,
            title: "Story".to_string(),
            client_name: "Acme".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "mention_verified");
        assert_eq!(json["mentionId"], 3);
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["reason"], "name_not_found");
        assert_eq!(json["clientName"], "Acme");
    }

    #[test]
    fn phase_event_flattens_stats() {
        let event = PipelineEvent::VerificationPhase {
            phase: Phase::Complete,
            stats: PhaseStats {
                total: Some(4),
                verified: Some(3),
                failed: Some(1),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "verification_phase");
        assert_eq!(json["phase"], "complete");
        assert_eq!(json["total"], 4);
        assert_eq!(json["failed"], 1);
    }
}
