//! Weight configuration for the rule scorer.
//!
//! The stored table is an atomic unit: either the whole stored table parses
//! and is used, or the whole built-in default is used. There is no
//! field-by-field merge, so a half-written config can never produce a
//! frankenstein scoring policy.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::repository;

/// Per-rule score weights. Field names are the rule vocabulary; strict
/// deserialization (no defaults) means a stored table missing any rule is
/// rejected wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightTable {
    pub chest_pain: u32,
    pub shortness_of_breath: u32,
    pub spo2_low: u32,
    pub sbp_low: u32,
    pub hr_high: u32,
    pub altered_consciousness: u32,
    pub age_over_65: u32,
    pub comorbid: u32,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            chest_pain: 30,
            shortness_of_breath: 25,
            spo2_low: 30,
            sbp_low: 20,
            hr_high: 15,
            altered_consciousness: 40,
            age_over_65: 8,
            comorbid: 10,
        }
    }
}

/// Resolve the current weight table.
///
/// Storage errors, a missing row, and unparseable JSON are all treated the
/// same: fall back to the built-in defaults. Never fails, never partial.
pub fn resolve_weights(conn: &Connection) -> WeightTable {
    match repository::get_weight_config(conn) {
        Ok(Some(stored)) => match serde_json::from_str(&stored) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "Stored weight config unparseable, using defaults");
                WeightTable::default()
            }
        },
        Ok(None) => WeightTable::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Weight config read failed, using defaults");
            WeightTable::default()
        }
    }
}

/// Persist a new weight table wholesale (administrative action).
pub fn store_weights(
    conn: &Connection,
    table: &WeightTable,
) -> Result<(), crate::db::StoreError> {
    let json = serde_json::to_string(table)?;
    repository::set_weight_config(conn, &json)
}
