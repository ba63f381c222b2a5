//! Score composition and alert classification.
//!
//! This is where the individual detectors meet the store: intake stitches
//! together base score, free-text boost, and threshold screening; recheck
//! stitches together threshold screening and deterioration trending on top
//! of the existing score. Persistence happens inside one transaction per
//! flow; events are published only after the commit.

use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::db::repository::{
    append_vitals, get_patient, insert_alert, insert_audit, insert_patient, last_two_readings,
    latest_vitals, update_patient_score,
};
use crate::events::{
    AlertRaisedEvent, EngineEvent, EventBus, PatientUpdatedEvent, QueueAction, QueueUpdateEvent,
};
use crate::models::enums::{AlertType, PatientStatus, Sex};
use crate::models::{Alert, Patient, PatientSnapshot, TriageAudit, Vitals, VitalsReading};

use super::deterioration::detect_deterioration;
use super::model::ModelService;
use super::orchestrator::compute_triage;
use super::severity::{analyze, TextClassifier};
use super::types::{
    EngineError, Finding, FindingKind, ScoreMethod, SeverityAssessment, TriageResult,
};
use super::vitals_check::check_critical_vitals;

/// Final scores at or above this raise a `critical_patient` alert.
pub const CRITICAL_SCORE: i64 = 85;
/// Recheck boost when a deterioration trend fired.
const DETERIORATION_BOOST: i64 = 15;
/// Recheck boost when any critical-severity threshold finding fired.
const CRITICAL_VITALS_BOOST: i64 = 25;

const INTAKE_PROVENANCE: &str = "System (Check-in)";
const RECHECK_PROVENANCE: &str = "Staff";
const DEFAULT_RECHECK_NOTE: &str = "Routine recheck";

/// Everything the front desk collects at registration.
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub full_name: String,
    pub age: u32,
    pub sex: Sex,
    pub symptoms: Vec<String>,
    pub vitals: Vitals,
    pub comorbid_count: u32,
    pub custom_symptoms: Option<String>,
    pub injury_severity: Option<i64>,
}

/// Result of one intake, with everything the caller needs to render a
/// confirmation without another store round-trip.
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub patient: Patient,
    pub ai_analysis: Option<SeverityAssessment>,
    /// Threshold findings against the intake vitals, warnings included.
    /// Only critical-severity findings were turned into alerts.
    pub findings: Vec<Finding>,
}

/// Result of one vitals recheck.
#[derive(Debug, Clone)]
pub struct RecheckOutcome {
    pub patient: Patient,
    /// Threshold findings followed by trend findings.
    pub findings: Vec<Finding>,
    pub score_boost: i64,
}

/// Register a patient: score them, screen their vitals, persist, alert.
pub fn process_intake(
    conn: &Connection,
    model: &dyn ModelService,
    classifier: &dyn TextClassifier,
    bus: &dyn EventBus,
    request: IntakeRequest,
) -> Result<IntakeOutcome, EngineError> {
    let ai_analysis = request
        .custom_symptoms
        .as_deref()
        .and_then(|text| analyze(classifier, text));
    let urgency_boost = ai_analysis.as_ref().map_or(0, |a| a.urgency_boost);

    let snapshot = PatientSnapshot {
        age: request.age,
        sex: request.sex,
        symptoms: request.symptoms.clone(),
        vitals: request.vitals,
        comorbid_count: request.comorbid_count,
        injury_severity: request.injury_severity,
    };
    let base = compute_triage(conn, model, &snapshot);

    let final_score = (base.score + urgency_boost).min(100);
    let mut method = base.method;
    method.ai_consulted = ai_analysis.is_some();

    let findings = check_critical_vitals(&request.vitals);

    let now = Utc::now();
    let patient = Patient {
        id: Uuid::new_v4(),
        full_name: request.full_name,
        age: request.age,
        sex: request.sex,
        symptoms: request.symptoms,
        comorbid_count: request.comorbid_count,
        custom_symptoms: request.custom_symptoms,
        injury_severity: request.injury_severity,
        triage_score: final_score,
        triage_method: method.render(),
        status: PatientStatus::Waiting,
        arrival_ts: now,
        created_at: now,
    };

    let mut alerts = Vec::new();
    if final_score >= CRITICAL_SCORE {
        alerts.push(Alert::new(
            patient.id,
            AlertType::CriticalPatient,
            json!({
                "triage_score": final_score,
                "symptoms": &patient.symptoms,
                "custom_symptoms": &patient.custom_symptoms,
                "vitals": request.vitals,
                "ai_severity": ai_analysis.as_ref().map(|a| a.severity),
            }),
        ));
    }
    for finding in findings.iter().filter(|f| f.is_critical()) {
        alerts.push(Alert::new(
            patient.id,
            AlertType::CriticalVitals,
            finding_payload(finding, &patient.full_name, final_score)?,
        ));
    }

    let audit = TriageAudit::new(
        patient.id,
        &patient.triage_method,
        final_score,
        audit_explanation(&base, ai_analysis.as_ref(), urgency_boost)?,
    );

    let tx = conn.unchecked_transaction().map_err(crate::db::StoreError::from)?;
    insert_patient(&tx, &patient)?;
    append_vitals(
        &tx,
        &VitalsReading::new(patient.id, request.vitals, now, INTAKE_PROVENANCE, None),
    )?;
    insert_audit(&tx, &audit)?;
    for alert in &alerts {
        insert_alert(&tx, alert)?;
    }
    tx.commit().map_err(crate::db::StoreError::from)?;

    info!(
        patient_id = %patient.id,
        score = final_score,
        method = %patient.triage_method,
        "patient registered"
    );

    for alert in &alerts {
        publish_alert(bus, alert, &patient.full_name);
    }
    bus.publish(EngineEvent::QueueUpdate(QueueUpdateEvent {
        action: QueueAction::PatientAdded,
        patient_id: Some(patient.id),
        new_score: None,
    }));

    Ok(IntakeOutcome {
        patient,
        ai_analysis,
        findings,
    })
}

/// Append a fresh vitals reading and re-evaluate the patient against it.
pub fn process_recheck(
    conn: &Connection,
    bus: &dyn EventBus,
    patient_id: &Uuid,
    vitals: Vitals,
    notes: Option<String>,
) -> Result<RecheckOutcome, EngineError> {
    let tx = conn.unchecked_transaction().map_err(crate::db::StoreError::from)?;

    let mut patient =
        get_patient(&tx, patient_id)?.ok_or(EngineError::PatientNotFound(*patient_id))?;

    let reading = VitalsReading::new(
        *patient_id,
        vitals,
        Utc::now(),
        RECHECK_PROVENANCE,
        Some(notes.unwrap_or_else(|| DEFAULT_RECHECK_NOTE.to_string())),
    );
    append_vitals(&tx, &reading)?;

    let mut findings = check_critical_vitals(&vitals);
    let history = last_two_readings(&tx, patient_id)?;
    let trend_findings = detect_deterioration(&history);

    let mut score_boost = 0;
    if trend_findings.is_some() {
        score_boost += DETERIORATION_BOOST;
    }
    if findings.iter().any(Finding::is_critical) {
        score_boost += CRITICAL_VITALS_BOOST;
    }
    if let Some(trend) = trend_findings {
        findings.extend(trend);
    }

    let new_score = (patient.triage_score + score_boost).min(100);
    let mut method = ScoreMethod::parse(&patient.triage_method);
    if score_boost > 0 {
        method.deterioration = true;
    }
    let method_tag = method.render();

    update_patient_score(&tx, patient_id, new_score, &method_tag)?;
    patient.triage_score = new_score;
    patient.triage_method = method_tag;

    // On recheck every finding alerts; warning-band thresholds come through
    // as critical_vitals alerts carrying their own severity.
    let mut alerts = Vec::new();
    for finding in &findings {
        let alert_type = match finding.kind {
            FindingKind::CriticalVitals => AlertType::CriticalVitals,
            FindingKind::Deteriorating => AlertType::Deteriorating,
        };
        let alert = Alert::new(
            *patient_id,
            alert_type,
            finding_payload(finding, &patient.full_name, new_score)?,
        );
        insert_alert(&tx, &alert)?;
        alerts.push(alert);
    }

    tx.commit().map_err(crate::db::StoreError::from)?;

    if score_boost > 0 {
        info!(
            patient_id = %patient_id,
            score_boost,
            new_score,
            "recheck boosted triage score"
        );
    }

    for alert in &alerts {
        publish_alert(bus, alert, &patient.full_name);
    }
    bus.publish(EngineEvent::QueueUpdate(QueueUpdateEvent {
        action: QueueAction::VitalsUpdated,
        patient_id: Some(*patient_id),
        new_score: Some(new_score),
    }));

    Ok(RecheckOutcome {
        patient,
        findings,
        score_boost,
    })
}

/// Re-run the full base scoring for a patient against their latest reading.
///
/// Administrative operation, typically after a weight change. Boosts from
/// earlier rechecks and free-text consultations are not re-applied: the
/// result is a clean base score, audited like any other computation.
pub fn recompute_triage(
    conn: &Connection,
    model: &dyn ModelService,
    bus: &dyn EventBus,
    patient_id: &Uuid,
) -> Result<TriageResult, EngineError> {
    let patient =
        get_patient(conn, patient_id)?.ok_or(EngineError::PatientNotFound(*patient_id))?;
    let vitals = latest_vitals(conn, patient_id)?
        .map(|r| r.vitals)
        .unwrap_or_default();
    let snapshot = PatientSnapshot::from_patient(&patient, vitals);

    let result = compute_triage(conn, model, &snapshot);
    let method_tag = result.method.render();

    let tx = conn.unchecked_transaction().map_err(crate::db::StoreError::from)?;
    update_patient_score(&tx, patient_id, result.score, &method_tag)?;
    insert_audit(
        &tx,
        &TriageAudit::new(
            *patient_id,
            &method_tag,
            result.score,
            serde_json::to_value(&result.explanation).map_err(crate::db::StoreError::from)?,
        ),
    )?;
    tx.commit().map_err(crate::db::StoreError::from)?;

    info!(patient_id = %patient_id, score = result.score, method = %method_tag, "triage recomputed");

    bus.publish(EngineEvent::PatientUpdated(PatientUpdatedEvent {
        patient_id: *patient_id,
        status: None,
    }));
    bus.publish(EngineEvent::QueueUpdate(QueueUpdateEvent {
        action: QueueAction::TriageRecomputed,
        patient_id: Some(*patient_id),
        new_score: Some(result.score),
    }));

    Ok(result)
}

/// Alert payload: the finding itself plus display context.
fn finding_payload(
    finding: &Finding,
    full_name: &str,
    score: i64,
) -> Result<serde_json::Value, EngineError> {
    let mut payload = serde_json::to_value(finding).map_err(crate::db::StoreError::from)?;
    let map = payload.as_object_mut().expect("finding serializes to an object");
    map.insert("full_name".into(), json!(full_name));
    map.insert("triage_score".into(), json!(score));
    Ok(payload)
}

fn audit_explanation(
    base: &TriageResult,
    ai_analysis: Option<&SeverityAssessment>,
    urgency_boost: i64,
) -> Result<serde_json::Value, EngineError> {
    let mut explanation =
        serde_json::to_value(&base.explanation).map_err(crate::db::StoreError::from)?;
    let map = explanation
        .as_object_mut()
        .expect("explanation serializes to an object");
    map.insert("base_score".into(), json!(base.score));
    map.insert("urgency_boost".into(), json!(urgency_boost));
    map.insert(
        "ai_analysis".into(),
        serde_json::to_value(ai_analysis).map_err(crate::db::StoreError::from)?,
    );
    Ok(explanation)
}

fn publish_alert(bus: &dyn EventBus, alert: &Alert, full_name: &str) {
    bus.publish(EngineEvent::AlertRaised(AlertRaisedEvent {
        alert_id: alert.id,
        patient_id: alert.patient_id,
        full_name: full_name.to_string(),
        alert_type: alert.alert_type,
        payload: alert.payload.clone(),
        timestamp: alert.created_at,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::{audit_for_patient, find_existing_alert, vitals_history};
    use crate::engine::model::MockModelService;
    use crate::engine::severity::MockClassifier;
    use crate::events::NullBus;
    use serde_json::json;

    fn request(vitals: Vitals) -> IntakeRequest {
        IntakeRequest {
            full_name: "Ada Osei".into(),
            age: 54,
            sex: Sex::Female,
            symptoms: vec!["chest_pain".into()],
            vitals,
            comorbid_count: 1,
            custom_symptoms: None,
            injury_severity: None,
        }
    }

    fn normal_vitals() -> Vitals {
        Vitals {
            hr: Some(78.0),
            sbp: Some(122.0),
            spo2: Some(98.0),
            ..Default::default()
        }
    }

    #[test]
    fn intake_persists_patient_reading_and_audit() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let classifier = MockClassifier::failing("unused");

        let outcome =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        assert_eq!(outcome.patient.triage_score, 40);
        assert_eq!(outcome.patient.triage_method, "model");
        assert!(outcome.ai_analysis.is_none());
        assert!(outcome.findings.is_empty());

        let stored = get_patient(&conn, &outcome.patient.id).unwrap().unwrap();
        assert_eq!(stored.triage_score, 40);
        assert_eq!(stored.status, PatientStatus::Waiting);

        let history = vitals_history(&conn, &outcome.patient.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].taken_by, "System (Check-in)");

        let audits = audit_for_patient(&conn, &outcome.patient.id).unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].explanation["base_score"], 40);
        assert_eq!(audits[0].explanation["urgency_boost"], 0);
    }

    #[test]
    fn intake_applies_ai_boost_and_tags_method() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(50, 0.8);
        let classifier = MockClassifier::returning(json!({
            "severity": "high",
            "urgency_boost": 20,
            "explanation": "Concerning presentation",
            "recommended_action": "Expedite"
        }));

        let mut req = request(normal_vitals());
        req.custom_symptoms = Some("crushing chest pain radiating to arm".into());

        let outcome = process_intake(&conn, &model, &classifier, &NullBus, req).unwrap();
        assert_eq!(outcome.patient.triage_score, 70);
        assert_eq!(outcome.patient.triage_method, "model+ai");
        assert_eq!(outcome.ai_analysis.unwrap().urgency_boost, 20);
    }

    #[test]
    fn failed_classifier_still_tags_ai_with_zero_boost() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(50, 0.8);
        let classifier = MockClassifier::failing("down");

        let mut req = request(normal_vitals());
        req.custom_symptoms = Some("severe abdominal pain".into());

        let outcome = process_intake(&conn, &model, &classifier, &NullBus, req).unwrap();
        assert_eq!(outcome.patient.triage_score, 50);
        assert_eq!(outcome.patient.triage_method, "model+ai");
    }

    #[test]
    fn intake_score_caps_at_100() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(90, 0.9);
        let classifier = MockClassifier::returning(json!({"urgency_boost": 40}));

        let mut req = request(normal_vitals());
        req.custom_symptoms = Some("unresponsive".into());

        let outcome = process_intake(&conn, &model, &classifier, &NullBus, req).unwrap();
        assert_eq!(outcome.patient.triage_score, 100);
    }

    #[test]
    fn critical_score_raises_critical_patient_alert() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(88, 0.95);
        let classifier = MockClassifier::failing("unused");

        let outcome =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        let alert = find_existing_alert(&conn, &outcome.patient.id, AlertType::CriticalPatient)
            .unwrap()
            .unwrap();
        assert_eq!(alert.payload["triage_score"], 88);
    }

    #[test]
    fn score_of_84_raises_no_critical_patient_alert() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(84, 0.9);
        let classifier = MockClassifier::failing("unused");

        let outcome =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        assert!(
            find_existing_alert(&conn, &outcome.patient.id, AlertType::CriticalPatient)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn critical_intake_vitals_alert_but_warnings_do_not() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(30, 0.8);
        let classifier = MockClassifier::failing("unused");

        // SpO2 critical, HR in the warning band.
        let vitals = Vitals {
            hr: Some(125.0),
            sbp: Some(120.0),
            spo2: Some(85.0),
            ..Default::default()
        };
        let outcome =
            process_intake(&conn, &model, &classifier, &NullBus, request(vitals)).unwrap();

        // Both findings are reported to the caller.
        assert_eq!(outcome.findings.len(), 2);

        // Only the critical one became an alert.
        let alert = find_existing_alert(&conn, &outcome.patient.id, AlertType::CriticalVitals)
            .unwrap()
            .unwrap();
        assert_eq!(alert.payload["parameter"], "SpO2");
        assert_eq!(alert.payload["full_name"], "Ada Osei");
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM alerts WHERE patient_id = ?1",
                [outcome.patient.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn recheck_with_stable_vitals_changes_nothing() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let classifier = MockClassifier::failing("unused");
        let intake =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        let outcome = process_recheck(
            &conn,
            &NullBus,
            &intake.patient.id,
            normal_vitals(),
            None,
        )
        .unwrap();

        assert_eq!(outcome.score_boost, 0);
        assert_eq!(outcome.patient.triage_score, 40);
        assert_eq!(outcome.patient.triage_method, "model");
        assert!(outcome.findings.is_empty());

        let history = vitals_history(&conn, &intake.patient.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].taken_by, "Staff");
        assert_eq!(history[1].notes.as_deref(), Some("Routine recheck"));
    }

    #[test]
    fn recheck_deterioration_boosts_15_and_tags_method() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let classifier = MockClassifier::failing("unused");
        let intake =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        // HR jumps by 35 but stays below every threshold band.
        let vitals = Vitals {
            hr: Some(113.0),
            sbp: Some(122.0),
            spo2: Some(98.0),
            ..Default::default()
        };
        let outcome =
            process_recheck(&conn, &NullBus, &intake.patient.id, vitals, None).unwrap();

        assert_eq!(outcome.score_boost, 15);
        assert_eq!(outcome.patient.triage_score, 55);
        assert_eq!(outcome.patient.triage_method, "model+deterioration");

        let alert = find_existing_alert(&conn, &intake.patient.id, AlertType::Deteriorating)
            .unwrap()
            .unwrap();
        assert_eq!(alert.payload["parameter"], "Heart Rate");
        assert_eq!(alert.payload["triage_score"], 55);
    }

    #[test]
    fn recheck_critical_vitals_boost_25() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let classifier = MockClassifier::failing("unused");
        let intake =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        // Bradycardia is critical but the HR delta is a drop, and only
        // rises fire the HR trend rule, so no deterioration boost stacks.
        let vitals = Vitals {
            hr: Some(45.0),
            sbp: Some(122.0),
            spo2: Some(98.0),
            ..Default::default()
        };
        let outcome =
            process_recheck(&conn, &NullBus, &intake.patient.id, vitals, None).unwrap();

        assert_eq!(outcome.score_boost, 25);
        assert_eq!(outcome.patient.triage_score, 65);
        assert_eq!(outcome.patient.triage_method, "model+deterioration");
    }

    #[test]
    fn recheck_combined_boost_is_40_and_caps_at_100() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(80, 0.9);
        let classifier = MockClassifier::failing("unused");
        let intake =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        // SpO2 crashes: critical threshold finding AND a deterioration trend.
        let vitals = Vitals {
            hr: Some(78.0),
            sbp: Some(122.0),
            spo2: Some(85.0),
            ..Default::default()
        };
        let outcome =
            process_recheck(&conn, &NullBus, &intake.patient.id, vitals, None).unwrap();

        assert_eq!(outcome.score_boost, 40);
        assert_eq!(outcome.patient.triage_score, 100);
    }

    #[test]
    fn recheck_warning_band_finding_raises_alert_without_boost() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let classifier = MockClassifier::failing("unused");

        // Baseline HR just under the warning band so the recheck delta (+7)
        // stays below the trend limit.
        let mut req = request(normal_vitals());
        req.vitals.hr = Some(118.0);
        let intake = process_intake(&conn, &model, &classifier, &NullBus, req).unwrap();

        let vitals = Vitals {
            hr: Some(125.0),
            sbp: Some(122.0),
            spo2: Some(98.0),
            ..Default::default()
        };
        let outcome =
            process_recheck(&conn, &NullBus, &intake.patient.id, vitals, None).unwrap();

        // No score change, but the warning still reaches the alert feed.
        assert_eq!(outcome.score_boost, 0);
        assert_eq!(outcome.patient.triage_score, 40);
        assert_eq!(outcome.patient.triage_method, "model");

        let alert = find_existing_alert(&conn, &intake.patient.id, AlertType::CriticalVitals)
            .unwrap()
            .unwrap();
        assert_eq!(alert.payload["severity"], "medium");
        assert_eq!(alert.payload["parameter"], "Heart Rate");
        assert_eq!(alert.payload["message"], "⚠️ Elevated heart rate: 125 BPM");
    }

    #[test]
    fn deterioration_tag_is_not_stacked_on_repeat_boosts() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(20, 0.8);
        let classifier = MockClassifier::failing("unused");
        let intake =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        let worsening = |hr: f64| Vitals {
            hr: Some(hr),
            sbp: Some(122.0),
            spo2: Some(98.0),
            ..Default::default()
        };
        process_recheck(&conn, &NullBus, &intake.patient.id, worsening(110.0), None).unwrap();
        let second =
            process_recheck(&conn, &NullBus, &intake.patient.id, worsening(140.0), None)
                .unwrap();

        assert_eq!(second.patient.triage_method, "model+deterioration");
        assert_eq!(second.patient.triage_score, 20 + 15 + 15);
    }

    #[test]
    fn recheck_unknown_patient_fails() {
        let conn = open_memory_database().unwrap();
        let missing = Uuid::new_v4();
        let err = process_recheck(&conn, &NullBus, &missing, normal_vitals(), None).unwrap_err();
        assert!(matches!(err, EngineError::PatientNotFound(id) if id == missing));
    }

    #[test]
    fn recheck_custom_note_is_kept() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let classifier = MockClassifier::failing("unused");
        let intake =
            process_intake(&conn, &model, &classifier, &NullBus, request(normal_vitals()))
                .unwrap();

        process_recheck(
            &conn,
            &NullBus,
            &intake.patient.id,
            normal_vitals(),
            Some("Post-analgesia check".into()),
        )
        .unwrap();

        let history = vitals_history(&conn, &intake.patient.id).unwrap();
        assert_eq!(history[1].notes.as_deref(), Some("Post-analgesia check"));
    }

    #[test]
    fn recompute_replaces_score_and_audits() {
        let conn = open_memory_database().unwrap();
        let classifier = MockClassifier::returning(json!({"urgency_boost": 20}));
        let model = MockModelService::with_score(50, 0.8);

        let mut req = request(normal_vitals());
        req.custom_symptoms = Some("dizzy".into());
        let intake = process_intake(&conn, &model, &classifier, &NullBus, req).unwrap();
        assert_eq!(intake.patient.triage_score, 70);

        // The model now sees the patient differently; recompute drops the
        // old AI boost along with the +ai tag.
        let fresh_model = MockModelService::with_score(35, 0.7);
        let result =
            recompute_triage(&conn, &fresh_model, &NullBus, &intake.patient.id).unwrap();
        assert_eq!(result.score, 35);

        let stored = get_patient(&conn, &intake.patient.id).unwrap().unwrap();
        assert_eq!(stored.triage_score, 35);
        assert_eq!(stored.triage_method, "model");

        let audits = audit_for_patient(&conn, &intake.patient.id).unwrap();
        assert_eq!(audits.len(), 2);
    }

    #[test]
    fn intake_publishes_alert_and_queue_events() {
        use crate::events::BroadcastBus;

        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(90, 0.95);
        let classifier = MockClassifier::failing("unused");
        let bus = BroadcastBus::new(16);
        let mut rx = bus.subscribe();

        process_intake(&conn, &model, &classifier, &bus, request(normal_vitals())).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.topic(), "alert:raised");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.topic(), "queue:update");
    }
}
