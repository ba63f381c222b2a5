//! Client for the learned triage model service.
//!
//! The model service is optional infrastructure: any failure (connection
//! refused, timeout, bad payload) means "unavailable" and the caller falls
//! back to the rule scorer. Nothing here raises to the end of the request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::PatientSnapshot;

use super::types::ModelOutcome;

/// Fixed request timeout. The model either answers quickly or the
/// patient is scored by rules instead.
pub const MODEL_TIMEOUT_SECS: u64 = 3;

/// Imputation placeholders for unmeasured vitals. Clinically "normal"
/// values the model was trained to treat as uninformative. These are for
/// the predictive payload only and must never feed threshold alerting.
const IMPUTED_HR: f64 = 80.0;
const IMPUTED_SBP: f64 = 120.0;
const IMPUTED_SPO2: f64 = 98.0;

/// Anything that can produce a model prediction for a snapshot.
///
/// `None` means unavailable, by contract. Implementations log their own
/// failure details; callers only branch on presence.
pub trait ModelService: Send + Sync {
    fn predict(&self, snapshot: &PatientSnapshot) -> Option<ModelOutcome>;
}

/// Feature payload for POST /predict.
#[derive(Serialize)]
struct PredictRequest<'a> {
    age: u32,
    hr: f64,
    sbp: f64,
    spo2: f64,
    symptoms: &'a [String],
    comorbid: u32,
}

/// Feature explainability comes back as a name → value map.
#[derive(Deserialize)]
struct PredictResponse {
    triage_score: i64,
    probability: f64,
    #[serde(default)]
    features_used: Map<String, Value>,
}

/// HTTP client for the model scoring service.
pub struct MlClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl MlClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(MODEL_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

impl ModelService for MlClient {
    fn predict(&self, snapshot: &PatientSnapshot) -> Option<ModelOutcome> {
        let body = PredictRequest {
            age: snapshot.age,
            hr: snapshot.vitals.hr.unwrap_or(IMPUTED_HR),
            sbp: snapshot.vitals.sbp.unwrap_or(IMPUTED_SBP),
            spo2: snapshot.vitals.spo2.unwrap_or(IMPUTED_SPO2),
            symptoms: &snapshot.symptoms,
            comorbid: snapshot.comorbid_count,
        };

        let url = format!("{}/predict", self.base_url);
        let response = match self.client.post(&url).json(&body).send() {
            Ok(r) => r,
            Err(e) => {
                warn!("model service unreachable: {e}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("model service returned {status}");
            return None;
        }

        let parsed: PredictResponse = match response.json() {
            Ok(p) => p,
            Err(e) => {
                warn!("model service response unparseable: {e}");
                return None;
            }
        };

        Some(ModelOutcome {
            score: parsed.triage_score.clamp(0, 100),
            probability: parsed.probability,
            features_used: parsed.features_used,
        })
    }
}

/// Test double with a canned prediction (or none, simulating an outage).
pub struct MockModelService {
    outcome: Option<ModelOutcome>,
}

impl MockModelService {
    pub fn unavailable() -> Self {
        Self { outcome: None }
    }

    pub fn with_score(score: i64, probability: f64) -> Self {
        let mut features_used = Map::new();
        for (name, value) in [("age", 40.0), ("hr", 80.0), ("spo2", 98.0)] {
            features_used.insert(name.to_string(), value.into());
        }
        Self {
            outcome: Some(ModelOutcome {
                score,
                probability,
                features_used,
            }),
        }
    }
}

impl ModelService for MockModelService {
    fn predict(&self, _snapshot: &PatientSnapshot) -> Option<ModelOutcome> {
        self.outcome.clone()
    }
}
