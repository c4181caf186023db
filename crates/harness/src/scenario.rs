//! Scenario matrix - the cross product of browser kinds and credential cases
//!
//! Scenarios are enumerated as plain values consumed by plain iteration;
//! there is no test-framework fixture machinery to inject them.

use serde::Serialize;

use crate::browser::Browser;
use crate::config::Config;

/// Signals the success page URL with `"inventory.html"` and the rejection
/// banner with `"Username and password do not match"`.
pub const SUCCESS_URL_FRAGMENT: &str = "inventory.html";
pub const FAILURE_MESSAGE_FRAGMENT: &str = "Username and password do not match";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// What the scenario asserts after submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Expectation {
    /// Post-submit navigation target must contain the fragment.
    Success { url_fragment: String },
    /// Rendered error text must contain the fragment.
    Failure { message_fragment: String },
}

/// One concrete (browser kind, credentials, expectation) test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub name: String,
    pub browser: Browser,
    pub credentials: Credentials,
    pub expectation: Expectation,
}

impl Scenario {
    /// Identity used in logs and artifact file names.
    pub fn slug(&self) -> String {
        format!("{}-{}", self.browser, self.name)
    }

    /// Enumerate the full matrix for the given browsers.
    pub fn matrix(config: &Config, browsers: &[Browser]) -> Vec<Scenario> {
        let creds = &config.credentials;
        let cases = [
            (
                "valid-credentials",
                Credentials {
                    username: creds.valid_username.clone(),
                    password: creds.valid_password.clone(),
                },
                Expectation::Success {
                    url_fragment: SUCCESS_URL_FRAGMENT.to_string(),
                },
            ),
            (
                "invalid-credentials",
                Credentials {
                    username: creds.invalid_username.clone(),
                    password: creds.invalid_password.clone(),
                },
                Expectation::Failure {
                    message_fragment: FAILURE_MESSAGE_FRAGMENT.to_string(),
                },
            ),
        ];

        let mut matrix = Vec::with_capacity(browsers.len() * cases.len());
        for &browser in browsers {
            for (name, credentials, expectation) in &cases {
                matrix.push(Scenario {
                    name: name.to_string(),
                    browser,
                    credentials: credentials.clone(),
                    expectation: expectation.clone(),
                });
            }
        }
        matrix
    }
}
