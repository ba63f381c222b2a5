//! In-process event fan-out for live dashboards.
//!
//! The engine only needs a "publish event" capability; delivery transport
//! (websocket, SSE, whatever the front door speaks) subscribes to the
//! broadcast channel and frames the events itself. Publishing is
//! fire-and-forget: a bus with no subscribers drops events silently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::enums::{AlertType, PatientStatus};

/// What changed in the waiting queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    PatientAdded,
    VitalsUpdated,
    TriageRecomputed,
    StatusChanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertRaisedEvent {
    pub alert_id: Uuid,
    pub patient_id: Uuid,
    pub full_name: String,
    pub alert_type: AlertType,
    /// Alert payload, mirrored so subscribers need no store lookup.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueUpdateEvent {
    pub action: QueueAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_score: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientUpdatedEvent {
    pub patient_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
}

/// An event published by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EngineEvent {
    AlertRaised(AlertRaisedEvent),
    QueueUpdate(QueueUpdateEvent),
    PatientUpdated(PatientUpdatedEvent),
}

impl EngineEvent {
    /// Topic name on the wire.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::AlertRaised(_) => "alert:raised",
            Self::QueueUpdate(_) => "queue:update",
            Self::PatientUpdated(_) => "patient:updated",
        }
    }
}

/// Narrow publish seam between the engine and whatever fans events out.
///
/// Implementations must be cheap and non-blocking; the engine calls
/// `publish` from synchronous request paths and from the SLA monitor
/// thread, and expects no delivery guarantee.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

/// Broadcast-channel bus: every subscriber gets every event.
pub struct BroadcastBus {
    tx: tokio::sync::broadcast::Sender<EngineEvent>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, event: EngineEvent) {
        // Err means no live subscribers, which is fine.
        let _ = self.tx.send(event);
    }
}

/// Bus that discards everything. Useful in tests and batch tools.
pub struct NullBus;

impl EventBus for NullBus {
    fn publish(&self, _event: EngineEvent) {}
}
