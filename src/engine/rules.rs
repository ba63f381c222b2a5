//! Deterministic weighted-rule scorer, the always-available fallback path.

use crate::models::PatientSnapshot;

use super::weights::WeightTable;

/// SpO2 below this fires `spo2_low`.
const SPO2_LOW_THRESHOLD: f64 = 92.0;
/// Systolic BP below this fires `sbp_low`.
const SBP_LOW_THRESHOLD: f64 = 90.0;
/// Heart rate above this fires `hr_high`.
const HR_HIGH_THRESHOLD: f64 = 130.0;
/// Age at or above this fires `age_over_65`.
const AGE_THRESHOLD: u32 = 65;

/// Output of one rule evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// Sum of fired weights, clamped to [0, 100].
    pub score: i64,
    /// Fired rule names in evaluation order (stable, for audit display).
    pub fired: Vec<String>,
}

/// Evaluate the seven rule conditions against a snapshot.
///
/// Pure and deterministic. A missing vital (`None`) never fires its rule:
/// an unmeasured blood pressure is not hypotension. Callers must not
/// default-fill vitals before calling this.
pub fn score_rules(snapshot: &PatientSnapshot, weights: &WeightTable) -> RuleOutcome {
    let mut score: u32 = 0;
    let mut fired: Vec<String> = Vec::new();

    if snapshot.has_symptom("chest_pain") {
        score += weights.chest_pain;
        fired.push("chest_pain".into());
    }
    if snapshot.has_symptom("shortness_of_breath") {
        score += weights.shortness_of_breath;
        fired.push("shortness_of_breath".into());
    }
    if snapshot.has_symptom("altered_consciousness") {
        score += weights.altered_consciousness;
        fired.push("altered_consciousness".into());
    }
    if matches!(snapshot.vitals.spo2, Some(spo2) if spo2 < SPO2_LOW_THRESHOLD) {
        score += weights.spo2_low;
        fired.push("spo2_low".into());
    }
    if matches!(snapshot.vitals.sbp, Some(sbp) if sbp < SBP_LOW_THRESHOLD) {
        score += weights.sbp_low;
        fired.push("sbp_low".into());
    }
    if matches!(snapshot.vitals.hr, Some(hr) if hr > HR_HIGH_THRESHOLD) {
        score += weights.hr_high;
        fired.push("hr_high".into());
    }
    if snapshot.age >= AGE_THRESHOLD {
        score += weights.age_over_65;
        fired.push("age_over_65".into());
    }

    RuleOutcome {
        score: i64::from(score.min(100)),
        fired,
    }
}
