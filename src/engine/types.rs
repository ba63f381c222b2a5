use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::db::StoreError;
use super::weights::WeightTable;

// ---------------------------------------------------------------------------
// ScoreMethod
// ---------------------------------------------------------------------------

/// Which scoring path produced the base score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseScorer {
    Model,
    Rule,
}

impl BaseScorer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Rule => "rule",
        }
    }
}

/// The set of adjustments applied on top of the base scoring path.
///
/// The display tag (`model+ai+deterioration` and friends) is rendered from
/// these flags in a fixed order, so the tag can never double-suffix no
/// matter how many times an adjustment is re-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreMethod {
    pub base: BaseScorer,
    /// The free-text classifier was consulted (even if its boost was 0).
    pub ai_consulted: bool,
    /// The injury-severity safety floor was applied.
    pub injury_override: bool,
    /// A recheck applied a deterioration/critical-vitals boost.
    pub deterioration: bool,
}

impl ScoreMethod {
    pub fn model() -> Self {
        Self {
            base: BaseScorer::Model,
            ai_consulted: false,
            injury_override: false,
            deterioration: false,
        }
    }

    pub fn rule() -> Self {
        Self {
            base: BaseScorer::Rule,
            ..Self::model()
        }
    }

    /// Parse a stored tag. Unknown segments are ignored; `rules` and `ml`
    /// are accepted for records written by earlier revisions.
    pub fn parse(tag: &str) -> Self {
        let mut method = Self::rule();
        for (i, segment) in tag.split('+').enumerate() {
            match (i, segment) {
                (0, "model") | (0, "ml") => method.base = BaseScorer::Model,
                (0, "rule") | (0, "rules") => method.base = BaseScorer::Rule,
                (_, "ai") => method.ai_consulted = true,
                (_, "injury_override") => method.injury_override = true,
                (_, "deterioration") => method.deterioration = true,
                _ => {}
            }
        }
        method
    }

    /// Deterministic display tag: base, then adjustments in fixed order.
    pub fn render(&self) -> String {
        let mut tag = self.base.as_str().to_string();
        if self.ai_consulted {
            tag.push_str("+ai");
        }
        if self.injury_override {
            tag.push_str("+injury_override");
        }
        if self.deterioration {
            tag.push_str("+deterioration");
        }
        tag
    }
}

impl std::fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

// ---------------------------------------------------------------------------
// TriageResult
// ---------------------------------------------------------------------------

/// Why a score came out the way it did, shaped by the path that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TriageExplanation {
    Model {
        probability: f64,
        /// Feature name → value the model actually scored on.
        features_used: Map<String, Value>,
    },
    Rule {
        rules_fired: Vec<String>,
        weights_applied: WeightTable,
    },
}

/// Output of one triage computation. Always produced; the orchestrator has
/// no failure path.
#[derive(Debug, Clone)]
pub struct TriageResult {
    /// Urgency score, clamped to [0, 100].
    pub score: i64,
    pub method: ScoreMethod,
    pub explanation: TriageExplanation,
}

/// Normalized response from the learned-model service.
#[derive(Debug, Clone)]
pub struct ModelOutcome {
    pub score: i64,
    pub probability: f64,
    pub features_used: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Free-text severity
// ---------------------------------------------------------------------------

/// Severity label reported by the free-text classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSeverity {
    Critical,
    High,
    Moderate,
    Low,
    Minimal,
    Unknown,
}

impl TextSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::Minimal => "minimal",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse for untrusted classifier output: anything unexpected
    /// maps to `Unknown` rather than failing the pipeline.
    pub fn from_classifier(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "moderate" => Self::Moderate,
            "low" => Self::Low,
            "minimal" => Self::Minimal,
            _ => Self::Unknown,
        }
    }
}

/// Bounded urgency adjustment derived from free-text symptom narration.
#[derive(Debug, Clone, Serialize)]
pub struct SeverityAssessment {
    /// Always within [0, 40].
    pub urgency_boost: i64,
    pub severity: TextSeverity,
    pub explanation: String,
    pub recommended_action: String,
}

impl SeverityAssessment {
    /// The neutral no-op returned when the classifier cannot contribute.
    pub fn neutral(explanation: &str) -> Self {
        Self {
            urgency_boost: 0,
            severity: TextSeverity::Unknown,
            explanation: explanation.to_string(),
            recommended_action: "Standard triage protocol".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Threshold violation, critical band or warning band; severity
    /// distinguishes the two.
    CriticalVitals,
    Deteriorating,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CriticalVitals => "critical_vitals",
            Self::Deteriorating => "deteriorating",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    Critical,
    High,
    Medium,
}

/// The vital parameter a finding is about. Serialized under the display
/// names downstream consumers already key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalParam {
    #[serde(rename = "SpO2")]
    Spo2,
    #[serde(rename = "Heart Rate")]
    HeartRate,
    #[serde(rename = "Systolic BP")]
    SystolicBp,
    /// Trend findings label the parameter without the "systolic" qualifier.
    #[serde(rename = "Blood Pressure")]
    BloodPressure,
}

impl VitalParam {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Spo2 => "SpO2",
            Self::HeartRate => "Heart Rate",
            Self::SystolicBp => "Systolic BP",
            Self::BloodPressure => "Blood Pressure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Worsening,
}

/// A single threshold or trend violation detected in vitals data.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub severity: FindingSeverity,
    pub parameter: VitalParam,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDirection>,
    /// Signed delta for trend findings (negative = value dropped).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_mins: Option<i64>,
}

impl Finding {
    pub fn is_critical(&self) -> bool {
        self.severity == FindingSeverity::Critical
    }
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Engine failures that callers must surface. Upstream unavailability and
/// configuration corruption are recovered internally and never appear here;
/// only broken persisted state does.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("patient not found: {0}")]
    PatientNotFound(Uuid),
}
