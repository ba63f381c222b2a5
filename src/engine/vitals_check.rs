//! Fixed-threshold vitals screening.
//!
//! Pure and stateless. Thresholds are deliberately not configurable: unlike
//! triage weights, these are clinical red lines, and making them tunable
//! would let a misconfigured deployment silence a hypoxia alarm.

use crate::models::Vitals;

use super::messages::ClinicalMessages;
use super::types::{Finding, FindingKind, FindingSeverity, VitalParam};

const SPO2_CRITICAL: f64 = 90.0;
const SPO2_WARNING: f64 = 94.0;
const HR_TACHYCARDIA: f64 = 140.0;
const HR_BRADYCARDIA: f64 = 50.0;
const HR_WARNING: f64 = 120.0;
const SBP_CRISIS: f64 = 180.0;
const SBP_HYPOTENSION: f64 = 90.0;
const SBP_WARNING: f64 = 160.0;

fn threshold_finding(
    severity: FindingSeverity,
    parameter: VitalParam,
    value: f64,
    threshold: Option<f64>,
    (message, action): (String, String),
) -> Finding {
    Finding {
        kind: FindingKind::CriticalVitals,
        severity,
        parameter,
        value,
        threshold,
        message,
        action,
        trend: None,
        change: None,
        interval_mins: None,
    }
}

/// Screen a single vitals reading against the fixed thresholds.
///
/// Finding order is SpO2, then heart rate, then blood pressure. At most one
/// finding per parameter: critical limits shadow the warning band. A missing
/// parameter produces no finding at all.
pub fn check_critical_vitals(vitals: &Vitals) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(spo2) = vitals.spo2 {
        if spo2 < SPO2_CRITICAL {
            findings.push(threshold_finding(
                FindingSeverity::Critical,
                VitalParam::Spo2,
                spo2,
                Some(SPO2_CRITICAL),
                ClinicalMessages::spo2_critical(spo2),
            ));
        } else if spo2 < SPO2_WARNING {
            findings.push(threshold_finding(
                FindingSeverity::High,
                VitalParam::Spo2,
                spo2,
                Some(SPO2_WARNING),
                ClinicalMessages::spo2_warning(spo2),
            ));
        }
    }

    if let Some(hr) = vitals.hr {
        if hr > HR_TACHYCARDIA {
            findings.push(threshold_finding(
                FindingSeverity::Critical,
                VitalParam::HeartRate,
                hr,
                Some(HR_TACHYCARDIA),
                ClinicalMessages::hr_tachycardia(hr),
            ));
        } else if hr < HR_BRADYCARDIA {
            findings.push(threshold_finding(
                FindingSeverity::Critical,
                VitalParam::HeartRate,
                hr,
                Some(HR_BRADYCARDIA),
                ClinicalMessages::hr_bradycardia(hr),
            ));
        } else if hr > HR_WARNING {
            findings.push(threshold_finding(
                FindingSeverity::Medium,
                VitalParam::HeartRate,
                hr,
                None,
                ClinicalMessages::hr_warning(hr),
            ));
        }
    }

    if let Some(sbp) = vitals.sbp {
        if sbp > SBP_CRISIS {
            findings.push(threshold_finding(
                FindingSeverity::Critical,
                VitalParam::SystolicBp,
                sbp,
                Some(SBP_CRISIS),
                ClinicalMessages::sbp_hypertensive_crisis(sbp),
            ));
        } else if sbp < SBP_HYPOTENSION {
            findings.push(threshold_finding(
                FindingSeverity::Critical,
                VitalParam::SystolicBp,
                sbp,
                Some(SBP_HYPOTENSION),
                ClinicalMessages::sbp_hypotension(sbp),
            ));
        } else if sbp > SBP_WARNING {
            findings.push(threshold_finding(
                FindingSeverity::Medium,
                VitalParam::SystolicBp,
                sbp,
                None,
                ClinicalMessages::sbp_warning(sbp),
            ));
        }
    }

    findings
}
