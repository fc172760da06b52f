//! Analysis event types and broadcast bus
//!
//! Events mirror the persisted pipeline state so SSE subscribers see the
//! same snapshots a status poller would read from the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted by the analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    /// A pipeline run entered a new lifecycle status
    StatusChanged {
        review_id: Uuid,
        old_status: String,
        new_status: String,
        timestamp: DateTime<Utc>,
    },

    /// Progress counters after a persisted unit of work
    Progress {
        review_id: Uuid,
        papers_found: i64,
        papers_analyzed: i64,
        insights_generated: i64,
        current_step: String,
        timestamp: DateTime<Utc>,
    },

    /// One reasoning step appended to the insight trail
    InsightRecorded {
        review_id: Uuid,
        step_number: i64,
        insight_type: String,
        timestamp: DateTime<Utc>,
    },

    /// Pipeline run finished successfully
    Completed {
        review_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Pipeline run hit a run-fatal error
    Failed {
        review_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl AnalysisEvent {
    /// Event type name, used as the SSE event field
    pub fn event_type(&self) -> &'static str {
        match self {
            AnalysisEvent::StatusChanged { .. } => "StatusChanged",
            AnalysisEvent::Progress { .. } => "Progress",
            AnalysisEvent::InsightRecorded { .. } => "InsightRecorded",
            AnalysisEvent::Completed { .. } => "Completed",
            AnalysisEvent::Failed { .. } => "Failed",
        }
    }

    /// Review session the event belongs to
    pub fn review_id(&self) -> Uuid {
        match self {
            AnalysisEvent::StatusChanged { review_id, .. }
            | AnalysisEvent::Progress { review_id, .. }
            | AnalysisEvent::InsightRecorded { review_id, .. }
            | AnalysisEvent::Completed { review_id, .. }
            | AnalysisEvent::Failed { review_id, .. } => *review_id,
        }
    }
}

/// Broadcast bus fanning analysis events out to SSE subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AnalysisEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; an absent audience is not an error for the pipeline
    pub fn emit(&self, event: AnalysisEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_names() {
        let event = AnalysisEvent::Completed {
            review_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "Completed");

        let event = AnalysisEvent::Failed {
            review_id: Uuid::new_v4(),
            message: "sources down".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "Failed");
    }

    #[test]
    fn serializes_with_type_tag() {
        let id = Uuid::new_v4();
        let event = AnalysisEvent::Progress {
            review_id: id,
            papers_found: 3,
            papers_analyzed: 1,
            insights_generated: 1,
            current_step: "Scoring paper 2 of 3".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Progress\""));
        assert!(json.contains("\"papers_found\":3"));

        let back: AnalysisEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.review_id(), id);
    }

    #[tokio::test]
    async fn bus_delivers_to_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(AnalysisEvent::Completed {
            review_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "Completed");
    }
}
