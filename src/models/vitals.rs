use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A set of vital-sign measurements from one observation.
///
/// Every field is optional: `None` means "not measured", which is distinct
/// from a measured value of zero. Low-side rules (hypotension, hypoxia)
/// must never be fired from an unmeasured field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    /// Heart rate, beats per minute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hr: Option<f64>,
    /// Systolic blood pressure, mmHg.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbp: Option<f64>,
    /// Oxygen saturation, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<f64>,
    /// Body temperature, degrees Celsius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Respiratory rate, breaths per minute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_rate: Option<f64>,
}

/// One entry in a patient's append-only vitals history.
///
/// Readings are never mutated after creation; a recheck appends a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsReading {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub vitals: Vitals,
    pub taken_at: DateTime<Utc>,
    /// Provenance: who or what captured this reading.
    pub taken_by: String,
    pub notes: Option<String>,
}

impl VitalsReading {
    pub fn new(
        patient_id: Uuid,
        vitals: Vitals,
        taken_at: DateTime<Utc>,
        taken_by: &str,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            vitals,
            taken_at,
            taken_by: taken_by.to_string(),
            notes,
        }
    }
}
