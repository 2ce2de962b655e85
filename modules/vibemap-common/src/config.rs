use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // External services
    pub places_api_key: String,
    pub anthropic_api_key: String,

    /// Classifier model identifier, recorded as score provenance.
    pub classifier_model: String,

    // Rate limits (requests per second)
    pub places_rate: f64,
    pub llm_rate: f64,

    /// Directory where run artifacts (failure ledgers) are written.
    pub artifact_dir: String,
}

const DEFAULT_CLASSIFIER_MODEL: &str = "claude-haiku-4-5-20251001";

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            places_api_key: required_env("PLACES_API_KEY"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            classifier_model: env::var("CLASSIFIER_MODEL")
                .unwrap_or_else(|_| DEFAULT_CLASSIFIER_MODEL.to_string()),
            places_rate: optional_f64("PLACES_RATE", 5.0),
            llm_rate: optional_f64("LLM_RATE", 1.0),
            artifact_dir: env::var("ARTIFACT_DIR").unwrap_or_else(|_| ".".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .map(|v| v.parse().unwrap_or_else(|_| panic!("{key} must be a number")))
        .unwrap_or(default)
}
