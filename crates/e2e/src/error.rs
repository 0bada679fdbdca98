//! Error types for the regression suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Site under test is unreachable after {attempts} attempts: {url}")]
    SiteUnreachable { url: String, attempts: usize },

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Playwright bridge closed unexpectedly")]
    BridgeClosed,

    #[error("Suite parse error: {0}")]
    SuiteParse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Candidate list for '{0}' is empty")]
    EmptyCandidates(String),

    #[error("Login failed: still on {0} after submitting credentials")]
    LoginFailed(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Storage state not found at {0}; run `pe-suite session capture` first")]
    StorageStateMissing(String),

    #[error("Suite '{0}' is marked `only` but forbid_only is set")]
    ForbidOnly(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
