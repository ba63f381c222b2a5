use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::StoreError;
use crate::models::enums::{AlertType, PatientStatus, Sex};
use crate::models::{Alert, Patient, TriageAudit, Vitals, VitalsReading};

fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp {
            column: column.into(),
            value: value.into(),
        })
}

fn parse_id(column: &str, value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|_| StoreError::InvalidEnum {
        field: column.into(),
        value: value.into(),
    })
}

// ═══════════════════════════════════════════
// Patients
// ═══════════════════════════════════════════

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO patients (id, full_name, age, sex, symptoms, comorbid_count,
         custom_symptoms, injury_severity, triage_score, triage_method, status,
         arrival_ts, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            patient.id.to_string(),
            patient.full_name,
            patient.age,
            patient.sex.as_str(),
            serde_json::to_string(&patient.symptoms)?,
            patient.comorbid_count,
            patient.custom_symptoms,
            patient.injury_severity,
            patient.triage_score,
            patient.triage_method,
            patient.status.as_str(),
            patient.arrival_ts.to_rfc3339(),
            patient.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

struct PatientRow {
    id: String,
    full_name: String,
    age: u32,
    sex: String,
    symptoms: String,
    comorbid_count: u32,
    custom_symptoms: Option<String>,
    injury_severity: Option<i64>,
    triage_score: i64,
    triage_method: String,
    status: String,
    arrival_ts: String,
    created_at: String,
}

const PATIENT_COLUMNS: &str = "id, full_name, age, sex, symptoms, comorbid_count, \
     custom_symptoms, injury_severity, triage_score, triage_method, status, \
     arrival_ts, created_at";

fn patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        age: row.get(2)?,
        sex: row.get(3)?,
        symptoms: row.get(4)?,
        comorbid_count: row.get(5)?,
        custom_symptoms: row.get(6)?,
        injury_severity: row.get(7)?,
        triage_score: row.get(8)?,
        triage_method: row.get(9)?,
        status: row.get(10)?,
        arrival_ts: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, StoreError> {
    Ok(Patient {
        id: parse_id("patients.id", &row.id)?,
        full_name: row.full_name,
        age: row.age,
        sex: Sex::from_str(&row.sex)?,
        symptoms: serde_json::from_str(&row.symptoms)?,
        comorbid_count: row.comorbid_count,
        custom_symptoms: row.custom_symptoms,
        injury_severity: row.injury_severity,
        triage_score: row.triage_score,
        triage_method: row.triage_method,
        status: PatientStatus::from_str(&row.status)?,
        arrival_ts: parse_ts("patients.arrival_ts", &row.arrival_ts)?,
        created_at: parse_ts("patients.created_at", &row.created_at)?,
    })
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], patient_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All patients still waiting to be seen, highest score first, ties broken
/// by earliest arrival.
pub fn waiting_patients(conn: &Connection) -> Result<Vec<Patient>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE status = 'waiting'
         ORDER BY triage_score DESC, arrival_ts ASC"
    ))?;

    let rows = stmt.query_map([], patient_row)?;
    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn update_patient_score(
    conn: &Connection,
    id: &Uuid,
    score: i64,
    method: &str,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE patients SET triage_score = ?2, triage_method = ?3 WHERE id = ?1",
        params![id.to_string(), score, method],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity_type: "patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_patient_status(
    conn: &Connection,
    id: &Uuid,
    status: PatientStatus,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE patients SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity_type: "patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Vitals history (append-only)
// ═══════════════════════════════════════════

pub fn append_vitals(conn: &Connection, reading: &VitalsReading) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO vitals_history (id, patient_id, hr, sbp, spo2, temperature,
         resp_rate, taken_at, taken_by, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            reading.id.to_string(),
            reading.patient_id.to_string(),
            reading.vitals.hr,
            reading.vitals.sbp,
            reading.vitals.spo2,
            reading.vitals.temperature,
            reading.vitals.resp_rate,
            reading.taken_at.to_rfc3339(),
            reading.taken_by,
            reading.notes,
        ],
    )?;
    Ok(())
}

struct ReadingRow {
    id: String,
    patient_id: String,
    hr: Option<f64>,
    sbp: Option<f64>,
    spo2: Option<f64>,
    temperature: Option<f64>,
    resp_rate: Option<f64>,
    taken_at: String,
    taken_by: String,
    notes: Option<String>,
}

fn reading_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadingRow> {
    Ok(ReadingRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        hr: row.get(2)?,
        sbp: row.get(3)?,
        spo2: row.get(4)?,
        temperature: row.get(5)?,
        resp_rate: row.get(6)?,
        taken_at: row.get(7)?,
        taken_by: row.get(8)?,
        notes: row.get(9)?,
    })
}

fn reading_from_row(row: ReadingRow) -> Result<VitalsReading, StoreError> {
    Ok(VitalsReading {
        id: parse_id("vitals_history.id", &row.id)?,
        patient_id: parse_id("vitals_history.patient_id", &row.patient_id)?,
        vitals: Vitals {
            hr: row.hr,
            sbp: row.sbp,
            spo2: row.spo2,
            temperature: row.temperature,
            resp_rate: row.resp_rate,
        },
        taken_at: parse_ts("vitals_history.taken_at", &row.taken_at)?,
        taken_by: row.taken_by,
        notes: row.notes,
    })
}

const READING_COLUMNS: &str =
    "id, patient_id, hr, sbp, spo2, temperature, resp_rate, taken_at, taken_by, notes";

/// Full vitals history for a patient, oldest first.
pub fn vitals_history(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<VitalsReading>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {READING_COLUMNS} FROM vitals_history
         WHERE patient_id = ?1 ORDER BY taken_at ASC"
    ))?;

    let rows = stmt.query_map(params![patient_id.to_string()], reading_row)?;
    let mut readings = Vec::new();
    for row in rows {
        readings.push(reading_from_row(row?)?);
    }
    Ok(readings)
}

/// The two most recent readings, oldest of the pair first. The deterioration
/// detector only ever needs these, so the full log never has to be loaded.
pub fn last_two_readings(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<VitalsReading>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {READING_COLUMNS} FROM vitals_history
         WHERE patient_id = ?1 ORDER BY taken_at DESC LIMIT 2"
    ))?;

    let rows = stmt.query_map(params![patient_id.to_string()], reading_row)?;
    let mut readings = Vec::new();
    for row in rows {
        readings.push(reading_from_row(row?)?);
    }
    readings.reverse();
    Ok(readings)
}

/// The most recent reading for a patient, if any exist.
pub fn latest_vitals(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<VitalsReading>, StoreError> {
    Ok(last_two_readings(conn, patient_id)?.pop())
}

// ═══════════════════════════════════════════
// Alerts
// ═══════════════════════════════════════════

pub fn insert_alert(conn: &Connection, alert: &Alert) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO alerts (id, patient_id, alert_type, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            alert.id.to_string(),
            alert.patient_id.to_string(),
            alert.alert_type.as_str(),
            serde_json::to_string(&alert.payload)?,
            alert.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

struct AlertRow {
    id: String,
    patient_id: String,
    alert_type: String,
    payload: String,
    created_at: String,
}

fn alert_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlertRow> {
    Ok(AlertRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        alert_type: row.get(2)?,
        payload: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn alert_from_row(row: AlertRow) -> Result<Alert, StoreError> {
    Ok(Alert {
        id: parse_id("alerts.id", &row.id)?,
        patient_id: parse_id("alerts.patient_id", &row.patient_id)?,
        alert_type: AlertType::from_str(&row.alert_type)?,
        payload: serde_json::from_str(&row.payload)?,
        created_at: parse_ts("alerts.created_at", &row.created_at)?,
    })
}

/// Best-effort existence check, used before raising SLA-breach alerts.
pub fn find_existing_alert(
    conn: &Connection,
    patient_id: &Uuid,
    alert_type: AlertType,
) -> Result<Option<Alert>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, alert_type, payload, created_at FROM alerts
         WHERE patient_id = ?1 AND alert_type = ?2 LIMIT 1",
    )?;

    let result = stmt.query_row(
        params![patient_id.to_string(), alert_type.as_str()],
        alert_row,
    );

    match result {
        Ok(row) => Ok(Some(alert_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Most recent alerts for patients still waiting, with the patient's name.
pub fn active_alerts(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<(Alert, String)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.patient_id, a.alert_type, a.payload, a.created_at, p.full_name
         FROM alerts a JOIN patients p ON p.id = a.patient_id
         WHERE p.status = 'waiting'
         ORDER BY a.created_at DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        Ok((
            AlertRow {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                alert_type: row.get(2)?,
                payload: row.get(3)?,
                created_at: row.get(4)?,
            },
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut alerts = Vec::new();
    for row in rows {
        let (alert, full_name) = row?;
        alerts.push((alert_from_row(alert)?, full_name));
    }
    Ok(alerts)
}

// ═══════════════════════════════════════════
// Triage audit
// ═══════════════════════════════════════════

pub fn insert_audit(conn: &Connection, audit: &TriageAudit) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO triage_audit (id, patient_id, method, score, explanation, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            audit.id.to_string(),
            audit.patient_id.to_string(),
            audit.method,
            audit.score,
            serde_json::to_string(&audit.explanation)?,
            audit.computed_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Audit trail for a patient, newest first.
pub fn audit_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<TriageAudit>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, method, score, explanation, computed_at
         FROM triage_audit WHERE patient_id = ?1 ORDER BY computed_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut audits = Vec::new();
    for row in rows {
        let (id, patient_id, method, score, explanation, computed_at) = row?;
        audits.push(TriageAudit {
            id: parse_id("triage_audit.id", &id)?,
            patient_id: parse_id("triage_audit.patient_id", &patient_id)?,
            method,
            score,
            explanation: serde_json::from_str(&explanation)?,
            computed_at: parse_ts("triage_audit.computed_at", &computed_at)?,
        });
    }
    Ok(audits)
}

// ═══════════════════════════════════════════
// Settings (weight configuration)
// ═══════════════════════════════════════════

const WEIGHTS_KEY: &str = "triage_weights";

/// Raw stored weight configuration, if any. Parsing and fallback are the
/// weight resolver's concern, not the store's.
pub fn get_weight_config(conn: &Connection) -> Result<Option<String>, StoreError> {
    let result = conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![WEIGHTS_KEY],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replace the stored weight table wholesale. There is deliberately no
/// per-field update: the table is an atomic unit.
pub fn set_weight_config(conn: &Connection, value: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value,
         updated_at = excluded.updated_at",
        params![WEIGHTS_KEY, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
