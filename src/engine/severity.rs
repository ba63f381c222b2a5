//! Free-text symptom severity adapter.
//!
//! Staff-entered narration ("crushing chest pain radiating to left arm")
//! carries signal the fixed symptom vocabulary misses. A hosted chat model
//! classifies it into a bounded urgency boost. The adapter is strictly
//! best-effort: any classifier failure degrades to a neutral assessment,
//! and the boost is clamped on our side no matter what the service claims.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::types::{SeverityAssessment, TextSeverity};

/// Upper bound on the urgency boost, enforced locally.
pub const MAX_URGENCY_BOOST: i64 = 40;

/// Anything that can classify a symptom narration.
pub trait TextClassifier: Send + Sync {
    /// Returns the raw classifier JSON, or an error string for logging.
    fn classify(&self, text: &str) -> Result<Value, String>;
}

/// Analyze free-text symptom narration.
///
/// Empty or whitespace-only text returns `None`: nothing was consulted, so
/// callers must not mark the result as AI-adjusted. Non-empty text always
/// returns `Some` — a neutral assessment if the classifier fails — so the
/// consultation itself stays auditable.
pub fn analyze(classifier: &dyn TextClassifier, text: &str) -> Option<SeverityAssessment> {
    if text.trim().is_empty() {
        return None;
    }

    let raw = match classifier.classify(text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("severity classifier failed: {e}");
            return Some(SeverityAssessment::neutral("AI analysis failed"));
        }
    };

    Some(assessment_from_raw(&raw))
}

/// Normalize the classifier's JSON into a bounded assessment.
///
/// Every field is treated as untrusted: the boost may arrive as a number,
/// a numeric string, or garbage; the severity label may be anything.
fn assessment_from_raw(raw: &Value) -> SeverityAssessment {
    let boost = match &raw["urgency_boost"] {
        Value::Number(n) => n.as_f64().map(|f| f as i64).unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    };

    let severity = raw["severity"]
        .as_str()
        .map(TextSeverity::from_classifier)
        .unwrap_or(TextSeverity::Unknown);

    SeverityAssessment {
        urgency_boost: boost.clamp(0, MAX_URGENCY_BOOST),
        severity,
        explanation: raw["explanation"]
            .as_str()
            .unwrap_or("AI analysis completed")
            .to_string(),
        recommended_action: raw["recommended_action"]
            .as_str()
            .unwrap_or("Standard triage protocol")
            .to_string(),
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        "You are a medical triage assistant. Analyze the following patient symptom \
description and determine its urgency level.\n\n\
Symptom: \"{text}\"\n\n\
Provide a JSON response with:\n\
1. \"severity\": one of [\"critical\", \"high\", \"moderate\", \"low\", \"minimal\"]\n\
2. \"urgency_boost\": a number between 0-40 to add to triage score (0=not urgent, 40=extremely urgent)\n\
3. \"explanation\": brief clinical reasoning (max 50 words)\n\
4. \"recommended_action\": what staff should do\n\n\
Respond ONLY with valid JSON."
    )
}

/// Request body for the chat completions endpoint.
#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
    temperature: f64,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Groq-hosted chat model client.
pub struct GroqClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GroqClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        }
    }
}

impl TextClassifier for GroqClient {
    fn classify(&self, text: &str) -> Result<Value, String> {
        let prompt = build_prompt(text);
        let body = ChatRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            model: &self.model,
            temperature: 0.1,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("classifier returned {status}"));
        }

        let parsed: ChatResponse = response.json().map_err(|e| e.to_string())?;
        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("{}");

        serde_json::from_str(content).map_err(|e| e.to_string())
    }
}

/// Test double returning canned classifier JSON (or an error).
pub struct MockClassifier {
    result: Result<Value, String>,
}

impl MockClassifier {
    pub fn returning(raw: Value) -> Self {
        Self { result: Ok(raw) }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
        }
    }
}

impl TextClassifier for MockClassifier {
    fn classify(&self, _text: &str) -> Result<Value, String> {
        self.result.clone()
    }
}
