//! Short-horizon deterioration detection over the vitals history.
//!
//! Compares only the last two readings. A full trend regression was
//! considered and rejected: operationally, the question staff need answered
//! is "did this patient just get worse", and the most recent delta answers
//! it without smoothing away a sudden crash.

use crate::models::VitalsReading;

use super::messages::ClinicalMessages;
use super::types::{Finding, FindingKind, FindingSeverity, TrendDirection, VitalParam};

/// HR increase beyond this is a high-severity trend.
const HR_RISE_LIMIT: f64 = 20.0;
/// SpO2 drop beyond this is critical. Desaturation outweighs any other
/// single-step delta.
const SPO2_DROP_LIMIT: f64 = 3.0;
/// SBP rise beyond this is a medium-severity trend.
const SBP_RISE_LIMIT: f64 = 30.0;
/// SBP fall beyond this (as a negative delta) is critical: shock risk.
const SBP_FALL_LIMIT: f64 = -20.0;

fn trend_finding(
    severity: FindingSeverity,
    parameter: VitalParam,
    value: f64,
    change: f64,
    interval_mins: i64,
    (message, action): (String, String),
) -> Finding {
    Finding {
        kind: FindingKind::Deteriorating,
        severity,
        parameter,
        value,
        threshold: None,
        message,
        action,
        trend: Some(TrendDirection::Worsening),
        change: Some(change),
        interval_mins: Some(interval_mins),
    }
}

/// Compare the last two readings of a history.
///
/// Returns `None` both when fewer than two readings exist and when nothing
/// fired; callers treat both as "no alert", but tests distinguish them by
/// constructing histories of known shape. A parameter missing from either
/// reading is skipped, never imputed.
pub fn detect_deterioration(history: &[VitalsReading]) -> Option<Vec<Finding>> {
    let [.., previous, latest] = history else {
        return None;
    };

    let interval_mins =
        (latest.taken_at - previous.taken_at).num_seconds() as f64 / 60.0;
    let interval_mins = interval_mins.round() as i64;

    let mut findings = Vec::new();

    if let (Some(prev_hr), Some(last_hr)) = (previous.vitals.hr, latest.vitals.hr) {
        let change = last_hr - prev_hr;
        if change > HR_RISE_LIMIT {
            findings.push(trend_finding(
                FindingSeverity::High,
                VitalParam::HeartRate,
                last_hr,
                change,
                interval_mins,
                ClinicalMessages::hr_rising(prev_hr, last_hr, change, interval_mins),
            ));
        }
    }

    if let (Some(prev_spo2), Some(last_spo2)) = (previous.vitals.spo2, latest.vitals.spo2) {
        let drop = prev_spo2 - last_spo2;
        if drop > SPO2_DROP_LIMIT {
            findings.push(trend_finding(
                FindingSeverity::Critical,
                VitalParam::Spo2,
                last_spo2,
                -drop,
                interval_mins,
                ClinicalMessages::spo2_dropping(prev_spo2, last_spo2, drop, interval_mins),
            ));
        }
    }

    if let (Some(prev_sbp), Some(last_sbp)) = (previous.vitals.sbp, latest.vitals.sbp) {
        let change = last_sbp - prev_sbp;
        if change > SBP_RISE_LIMIT {
            findings.push(trend_finding(
                FindingSeverity::Medium,
                VitalParam::BloodPressure,
                last_sbp,
                change,
                interval_mins,
                ClinicalMessages::sbp_rising(prev_sbp, last_sbp, change, interval_mins),
            ));
        }
        if change < SBP_FALL_LIMIT {
            findings.push(trend_finding(
                FindingSeverity::Critical,
                VitalParam::BloodPressure,
                last_sbp,
                change,
                interval_mins,
                ClinicalMessages::sbp_dropping(prev_sbp, last_sbp, change, interval_mins),
            ));
        }
    }

    if findings.is_empty() {
        None
    } else {
        Some(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Vitals, VitalsReading};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn reading(mins_ago: i64, hr: Option<f64>, sbp: Option<f64>, spo2: Option<f64>) -> VitalsReading {
        VitalsReading {
            id: Uuid::new_v4(),
            patient_id: Uuid::nil(),
            vitals: Vitals {
                hr,
                sbp,
                spo2,
                ..Default::default()
            },
            taken_at: Utc::now() - Duration::minutes(mins_ago),
            taken_by: "Staff".into(),
            notes: None,
        }
    }

    #[test]
    fn fewer_than_two_readings_is_none() {
        assert!(detect_deterioration(&[]).is_none());
        assert!(detect_deterioration(&[reading(0, Some(180.0), None, None)]).is_none());
    }

    #[test]
    fn stable_vitals_yield_none_not_empty() {
        let history = vec![
            reading(30, Some(80.0), Some(120.0), Some(98.0)),
            reading(0, Some(85.0), Some(122.0), Some(97.0)),
        ];
        assert!(detect_deterioration(&history).is_none());
    }

    #[test]
    fn only_the_last_two_readings_are_compared() {
        // A huge HR jump buried earlier in the history must not fire.
        let history = vec![
            reading(60, Some(60.0), None, None),
            reading(30, Some(130.0), None, None),
            reading(0, Some(132.0), None, None),
        ];
        assert!(detect_deterioration(&history).is_none());
    }

    #[test]
    fn hr_rise_over_20_is_high_severity() {
        let history = vec![
            reading(15, Some(88.0), None, None),
            reading(0, Some(112.0), None, None),
        ];
        let findings = detect_deterioration(&history).unwrap();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.severity, FindingSeverity::High);
        assert_eq!(f.change, Some(24.0));
        assert_eq!(f.interval_mins, Some(15));
        assert_eq!(
            f.message,
            "⚠️ Rapid HR increase: 88 → 112 BPM (+24) in 15 min"
        );
    }

    #[test]
    fn hr_rise_of_exactly_20_does_not_fire() {
        let history = vec![
            reading(10, Some(90.0), None, None),
            reading(0, Some(110.0), None, None),
        ];
        assert!(detect_deterioration(&history).is_none());
    }

    #[test]
    fn spo2_drop_over_3_is_critical_with_negative_change() {
        let history = vec![
            reading(12, None, None, Some(96.0)),
            reading(0, None, None, Some(91.0)),
        ];
        let findings = detect_deterioration(&history).unwrap();
        let f = &findings[0];
        assert_eq!(f.severity, FindingSeverity::Critical);
        assert_eq!(f.change, Some(-5.0));
        assert_eq!(f.trend, Some(TrendDirection::Worsening));
        assert_eq!(
            f.message,
            "🚨 O2 saturation dropping: 96% → 91% (-5%) in 12 min"
        );
    }

    #[test]
    fn sbp_rise_over_30_is_medium() {
        let history = vec![
            reading(20, None, Some(130.0), None),
            reading(0, None, Some(165.0), None),
        ];
        let findings = detect_deterioration(&history).unwrap();
        let f = &findings[0];
        assert_eq!(f.severity, FindingSeverity::Medium);
        assert_eq!(f.parameter, VitalParam::BloodPressure);
        assert_eq!(
            f.message,
            "⚠️ BP rising rapidly: 130 → 165 mmHg (+35) in 20 min"
        );
    }

    #[test]
    fn sbp_fall_over_20_is_critical_shock_warning() {
        let history = vec![
            reading(20, None, Some(120.0), None),
            reading(0, None, Some(95.0), None),
        ];
        let findings = detect_deterioration(&history).unwrap();
        let f = &findings[0];
        assert_eq!(f.severity, FindingSeverity::Critical);
        assert_eq!(f.change, Some(-25.0));
        assert_eq!(f.message, "🚨 BP dropping: 120 → 95 mmHg (-25) in 20 min");
        assert_eq!(
            f.action,
            "Assess for shock: IV access, fluids, check for bleeding"
        );
    }

    #[test]
    fn parameter_absent_from_either_reading_is_skipped() {
        // HR present only in the latest reading: no basis for a delta.
        let history = vec![
            reading(10, None, None, Some(98.0)),
            reading(0, Some(160.0), None, Some(97.0)),
        ];
        assert!(detect_deterioration(&history).is_none());
    }

    #[test]
    fn multiple_parameters_can_fire_together() {
        let history = vec![
            reading(25, Some(80.0), Some(125.0), Some(97.0)),
            reading(0, Some(115.0), Some(100.0), Some(92.0)),
        ];
        let findings = detect_deterioration(&history).unwrap();
        assert_eq!(findings.len(), 3);
        // Evaluation order: HR, SpO2, then BP.
        assert_eq!(findings[0].parameter, VitalParam::HeartRate);
        assert_eq!(findings[1].parameter, VitalParam::Spo2);
        assert_eq!(findings[2].parameter, VitalParam::BloodPressure);
    }
}
