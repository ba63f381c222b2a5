use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Acuity";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Chat model used for free-text symptom classification.
pub const CLASSIFIER_MODEL: &str = "llama-3.3-70b-versatile";

const DEFAULT_ML_SERVICE_URL: &str = "http://localhost:8000";
const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Get the application data directory
/// ~/Acuity/ on all platforms (user-visible, kept out of dotfile clutter)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Acuity")
}

/// Path of the triage database file.
pub fn database_path() -> PathBuf {
    app_data_dir().join("triage.db")
}

/// Base URL of the model scoring service.
pub fn ml_service_url() -> String {
    std::env::var("ML_SERVICE_URL").unwrap_or_else(|_| DEFAULT_ML_SERVICE_URL.to_string())
}

/// Base URL of the Groq-compatible chat API.
pub fn groq_api_url() -> String {
    std::env::var("GROQ_API_URL").unwrap_or_else(|_| DEFAULT_GROQ_API_URL.to_string())
}

/// API key for the free-text classifier. `None` disables the adapter.
pub fn groq_api_key() -> Option<String> {
    std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,acuity=debug"
}
