//! Waiting-queue views and patient status transitions.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::db::repository::{
    active_alerts, update_patient_status as store_patient_status, waiting_patients,
};
use crate::events::{
    EngineEvent, EventBus, PatientUpdatedEvent, QueueAction, QueueUpdateEvent,
};
use crate::models::enums::PatientStatus;
use crate::models::{Alert, Patient};

use super::compose::CRITICAL_SCORE;
use super::types::EngineError;

/// How many alerts the live feed shows.
const ALERT_FEED_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total_waiting: usize,
    pub avg_wait_secs: i64,
    /// Patients at or above the critical score threshold.
    pub critical_count: usize,
}

/// The waiting queue in display order with aggregate stats.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub patients: Vec<Patient>,
    pub stats: QueueStats,
}

/// Current queue: waiting patients by score descending, then arrival order.
pub fn queue_snapshot(conn: &Connection, now: DateTime<Utc>) -> Result<QueueSnapshot, EngineError> {
    let patients = waiting_patients(conn)?;

    let avg_wait_secs = if patients.is_empty() {
        0
    } else {
        let total: i64 = patients
            .iter()
            .map(|p| (now - p.arrival_ts).num_seconds().max(0))
            .sum();
        (total as f64 / patients.len() as f64).round() as i64
    };

    let stats = QueueStats {
        total_waiting: patients.len(),
        avg_wait_secs,
        critical_count: patients
            .iter()
            .filter(|p| p.triage_score >= CRITICAL_SCORE)
            .count(),
    };

    Ok(QueueSnapshot { patients, stats })
}

/// An alert annotated with the patient's name, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveAlert {
    #[serde(flatten)]
    pub alert: Alert,
    pub full_name: String,
}

/// Recent alerts for patients still in the queue, newest first.
pub fn alert_feed(conn: &Connection) -> Result<Vec<ActiveAlert>, EngineError> {
    let rows = active_alerts(conn, ALERT_FEED_LIMIT)?;
    Ok(rows
        .into_iter()
        .map(|(alert, full_name)| ActiveAlert { alert, full_name })
        .collect())
}

/// Move a patient between waiting, in-treatment, and discharged.
pub fn set_patient_status(
    conn: &Connection,
    bus: &dyn EventBus,
    patient_id: &Uuid,
    status: PatientStatus,
) -> Result<(), EngineError> {
    store_patient_status(conn, patient_id, status)?;
    info!(patient_id = %patient_id, status = status.as_str(), "patient status changed");

    bus.publish(EngineEvent::PatientUpdated(PatientUpdatedEvent {
        patient_id: *patient_id,
        status: Some(status),
    }));
    bus.publish(EngineEvent::QueueUpdate(QueueUpdateEvent {
        action: QueueAction::StatusChanged,
        patient_id: Some(*patient_id),
        new_score: None,
    }));
    Ok(())
}
