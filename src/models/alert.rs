use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AlertType;

/// A persisted alert bound to a patient.
///
/// Alerts are derived, disposable facts: created by the score composer or
/// the SLA monitor, never mutated, only superseded by newer alerts. The
/// payload carries enough context to be displayed without re-querying the
/// triage engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub alert_type: AlertType,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(patient_id: Uuid, alert_type: AlertType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            alert_type,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// One audit record per triage computation, for after-the-fact review of
/// which path produced a score and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageAudit {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub method: String,
    pub score: i64,
    pub explanation: serde_json::Value,
    pub computed_at: DateTime<Utc>,
}

impl TriageAudit {
    pub fn new(
        patient_id: Uuid,
        method: &str,
        score: i64,
        explanation: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            method: method.to_string(),
            score,
            explanation,
            computed_at: Utc::now(),
        }
    }
}
