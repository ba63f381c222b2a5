use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{PatientStatus, Sex};
use super::vitals::Vitals;

/// A registered patient with their current triage state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub age: u32,
    pub sex: Sex,
    /// Symptom tags from the structured intake vocabulary.
    pub symptoms: Vec<String>,
    pub comorbid_count: u32,
    /// Free-text symptom narration, if the patient provided any.
    pub custom_symptoms: Option<String>,
    /// Injury-severity index (0-100) from external visual assessment.
    pub injury_severity: Option<i64>,
    pub triage_score: i64,
    /// Rendered method tag, e.g. `rule+ai` or `model+deterioration`.
    pub triage_method: String,
    pub status: PatientStatus,
    pub arrival_ts: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// The demographic/symptom/vitals bundle used as input to one scoring pass.
///
/// Built fresh from persisted state on every call; immutable for the
/// duration of that call.
#[derive(Debug, Clone)]
pub struct PatientSnapshot {
    pub age: u32,
    pub sex: Sex,
    pub symptoms: Vec<String>,
    pub vitals: Vitals,
    pub comorbid_count: u32,
    pub injury_severity: Option<i64>,
}

impl PatientSnapshot {
    /// Rebuild a snapshot from a stored patient and their latest reading.
    pub fn from_patient(patient: &Patient, latest_vitals: Vitals) -> Self {
        Self {
            age: patient.age,
            sex: patient.sex,
            symptoms: patient.symptoms.clone(),
            vitals: latest_vitals,
            comorbid_count: patient.comorbid_count,
            injury_severity: patient.injury_severity,
        }
    }

    pub fn has_symptom(&self, tag: &str) -> bool {
        self.symptoms.iter().any(|s| s == tag)
    }
}
