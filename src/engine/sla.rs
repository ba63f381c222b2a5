//! Wait-time SLA monitoring.
//!
//! A background thread scans the waiting queue on a fixed interval and
//! raises one `sla_breach` alert per patient who has waited past the
//! threshold. The check-then-insert sequence is not atomic; concurrent
//! scans can double-alert under race, which is accepted because the feed
//! deduplicates for display and breach alerts carry no safety decisions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::json;
use tracing::{error, info, warn};

use crate::db::repository::{find_existing_alert, insert_alert, waiting_patients};
use crate::db::open_database;
use crate::events::{AlertRaisedEvent, EngineEvent, EventBus, QueueUpdateEvent, QueueAction};
use crate::models::enums::AlertType;
use crate::models::Alert;

use super::types::EngineError;

/// Waits longer than this breach the SLA.
pub const SLA_THRESHOLD_MINS: i64 = 30;

/// Scan interval.
const SCAN_INTERVAL_SECS: u64 = 30;

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY_SECS: u64 = 5;

/// One scan of the waiting queue.
///
/// Raises at most one breach alert per patient: a prior `sla_breach` alert
/// suppresses further ones even if the patient keeps waiting. Returns how
/// many alerts were raised. Best-effort, at-least-once.
pub fn scan_sla_breaches(
    conn: &Connection,
    bus: &dyn EventBus,
    now: DateTime<Utc>,
) -> Result<usize, EngineError> {
    let mut raised = 0;

    for patient in waiting_patients(conn)? {
        let wait_mins = (now - patient.arrival_ts).num_seconds() as f64 / 60.0;
        if wait_mins <= SLA_THRESHOLD_MINS as f64 {
            continue;
        }
        if find_existing_alert(conn, &patient.id, AlertType::SlaBreach)?.is_some() {
            continue;
        }

        let wait_time_mins = wait_mins.round() as i64;
        let alert = Alert::new(
            patient.id,
            AlertType::SlaBreach,
            json!({
                "wait_time_mins": wait_time_mins,
                "triage_score": patient.triage_score,
            }),
        );
        insert_alert(conn, &alert)?;
        raised += 1;

        warn!(
            patient_id = %patient.id,
            wait_time_mins,
            score = patient.triage_score,
            "wait-time SLA breached"
        );
        bus.publish(EngineEvent::AlertRaised(AlertRaisedEvent {
            alert_id: alert.id,
            patient_id: patient.id,
            full_name: patient.full_name.clone(),
            alert_type: AlertType::SlaBreach,
            payload: alert.payload.clone(),
            timestamp: alert.created_at,
        }));
    }

    if raised > 0 {
        bus.publish(EngineEvent::QueueUpdate(QueueUpdateEvent {
            action: QueueAction::StatusChanged,
            patient_id: None,
            new_score: None,
        }));
    }
    Ok(raised)
}

/// Handle for the background SLA monitor thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on
/// `Drop`. Keep it alive for as long as breaches should be watched.
pub struct SlaMonitorHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SlaMonitorHandle {
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for SlaMonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the SLA monitor on its own thread with its own connection.
///
/// The thread opens the database itself; SQLite connections are not
/// shared across threads here.
pub fn start_sla_monitor(db_path: PathBuf, bus: Arc<dyn EventBus>) -> SlaMonitorHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        info!("SLA monitor started (scan every {SCAN_INTERVAL_SECS}s)");
        monitor_loop(&db_path, bus.as_ref(), &flag);
    });

    SlaMonitorHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn monitor_loop(db_path: &Path, bus: &dyn EventBus, shutdown: &AtomicBool) {
    let conn = match open_database(db_path) {
        Ok(conn) => conn,
        Err(e) => {
            error!("SLA monitor could not open database: {e}");
            return;
        }
    };

    while !shutdown.load(Ordering::Relaxed) {
        // Sleep in small increments for responsive shutdown
        for _ in 0..(SCAN_INTERVAL_SECS / SLEEP_GRANULARITY_SECS) {
            if shutdown.load(Ordering::Relaxed) {
                info!("SLA monitor shutting down");
                return;
            }
            std::thread::sleep(Duration::from_secs(SLEEP_GRANULARITY_SECS));
        }

        if let Err(e) = scan_sla_breaches(&conn, bus, Utc::now()) {
            error!("SLA scan failed: {e}");
        }
    }
    info!("SLA monitor shutting down");
}
