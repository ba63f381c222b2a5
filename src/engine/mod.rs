//! Triage scoring and deterioration alerting.
//!
//! Scoring is layered: a learned model when reachable, a deterministic
//! weighted-rule fallback otherwise, a bounded free-text boost on top, and
//! hard safety rails (injury override, critical vitals thresholds) that no
//! upstream outage can disable. Everything that adjusts a score leaves a
//! trace in the method tag and the audit table.

pub mod compose;
pub mod deterioration;
pub mod messages;
pub mod model;
pub mod orchestrator;
pub mod queue;
pub mod rules;
pub mod severity;
pub mod sla;
pub mod types;
pub mod vitals_check;
pub mod weights;

pub use compose::{
    process_intake, process_recheck, recompute_triage, IntakeOutcome, IntakeRequest,
    RecheckOutcome, CRITICAL_SCORE,
};
pub use deterioration::detect_deterioration;
pub use model::{MlClient, ModelService};
pub use orchestrator::compute_triage;
pub use queue::{alert_feed, queue_snapshot, set_patient_status, ActiveAlert, QueueSnapshot};
pub use rules::{score_rules, RuleOutcome};
pub use severity::{analyze, GroqClient, TextClassifier};
pub use sla::{scan_sla_breaches, start_sla_monitor, SlaMonitorHandle};
pub use types::{
    EngineError, Finding, FindingKind, FindingSeverity, ScoreMethod, SeverityAssessment,
    TriageExplanation, TriageResult,
};
pub use vitals_check::check_critical_vitals;
pub use weights::{resolve_weights, store_weights, WeightTable};
