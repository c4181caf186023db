//! Error types for the regression harness

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("failed to launch {browser}: {reason}")]
    BrowserLaunch { browser: String, reason: String },

    #[error("browser driver not found. Install with: npm install playwright && npx playwright install")]
    DriverNotFound,

    #[error("navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element '{locator}' not found within {timeout:?}")]
    ElementNotFound { locator: String, timeout: Duration },

    #[error("timed out waiting for {condition} after {timeout:?}")]
    Timeout { condition: String, timeout: Duration },

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("driver protocol error: {0}")]
    Driver(String),

    #[error("server failed to start: {0}")]
    ServerStartup(String),

    #[error("server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    /// True for errors scoped to a single scenario. Anything else aborts the
    /// run before (or instead of) executing the matrix.
    pub fn is_scenario_scoped(&self) -> bool {
        !matches!(
            self,
            HarnessError::Config(_)
                | HarnessError::ServerStartup(_)
                | HarnessError::ServerHealthCheck(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_scoping() {
        assert!(HarnessError::Assertion("x".into()).is_scenario_scoped());
        assert!(HarnessError::BrowserLaunch {
            browser: "firefox".into(),
            reason: "missing".into(),
        }
        .is_scenario_scoped());
        assert!(!HarnessError::Config("missing key".into()).is_scenario_scoped());
        assert!(!HarnessError::ServerHealthCheck(30).is_scenario_scoped());
    }

    #[test]
    fn timeout_message_carries_condition() {
        let err = HarnessError::Timeout {
            condition: "login form to render".into(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.to_string().contains("login form to render"));
    }
}
