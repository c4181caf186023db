//! Test orchestration - drives each scenario through the page model and
//! classifies the outcome
//!
//! One scenario's failure never aborts the rest of the matrix: every error
//! raised while driving a scenario is caught at the scenario boundary,
//! captured (screenshot + structured log line) and recorded as a Failed
//! outcome before the runner moves on.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::browser::{Browser, BrowserSession, LaunchOptions};
use crate::config::Config;
use crate::error::{HarnessError, HarnessResult};
use crate::page::{InventoryPage, LoginPage};
use crate::scenario::{Expectation, Scenario};
use crate::server::{ServerConfig, ServerHandle};
use crate::wait::WaitPolicy;

/// Terminal classification of one scenario execution.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed {
        reason: String,
        screenshot: Option<PathBuf>,
    },
}

/// One scenario's recorded result, tagged with its identity.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    #[serde(flatten)]
    pub status: Status,
    pub duration_ms: u64,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.status, Status::Passed)
    }
}

/// Aggregated result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteResult {
    pub fn from_outcomes(outcomes: Vec<ScenarioOutcome>, duration_ms: u64) -> Self {
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        Self {
            total: outcomes.len(),
            passed,
            failed: outcomes.len() - passed,
            duration_ms,
            outcomes,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Environment settings and credentials from the config file.
    pub settings: Config,

    /// Browser kinds to cross with the credential cases.
    pub browsers: Vec<Browser>,

    pub launch: LaunchOptions,
    pub wait: WaitPolicy,

    /// Where failure screenshots land.
    pub artifact_dir: PathBuf,

    /// Where the JSON report lands.
    pub report_dir: PathBuf,
}

/// Main orchestrator: owns the optional server lifecycle and runs the matrix.
pub struct TestRunner {
    config: RunnerConfig,
    server: Option<ServerHandle>,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            server: None,
        }
    }

    /// Spawn the bundled static server and point the run at it.
    pub async fn start_server(&mut self, server_config: ServerConfig) -> HarnessResult<()> {
        if self.server.is_some() {
            return Ok(());
        }
        let server = ServerHandle::spawn(server_config).await?;
        self.config.settings.base_url = server.base_url().to_string();
        self.server = Some(server);
        Ok(())
    }

    pub fn stop_server(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }

    /// Run the full scenario matrix sequentially.
    pub async fn run_all(&mut self) -> HarnessResult<SuiteResult> {
        let matrix = Scenario::matrix(&self.config.settings, &self.config.browsers);
        self.run_scenarios(matrix).await
    }

    pub async fn run_scenarios(&mut self, scenarios: Vec<Scenario>) -> HarnessResult<SuiteResult> {
        std::fs::create_dir_all(&self.config.artifact_dir)?;

        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(scenarios.len());

        info!("running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let outcome = self.run_scenario(scenario).await;
            match &outcome.status {
                Status::Passed => {
                    info!("✓ {} ({} ms)", outcome.scenario.slug(), outcome.duration_ms);
                }
                Status::Failed { reason, .. } => {
                    error!("✗ {} - {}", outcome.scenario.slug(), reason);
                }
            }
            outcomes.push(outcome);
        }

        let result = SuiteResult::from_outcomes(outcomes, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "results: {} passed, {} failed ({} ms)",
            result.passed, result.failed, result.duration_ms
        );

        Ok(result)
    }

    /// Drive one scenario to its terminal state. Never propagates scenario
    /// errors - they become the Failed outcome.
    pub async fn run_scenario(&self, scenario: Scenario) -> ScenarioOutcome {
        let start = Instant::now();
        debug!("running scenario: {}", scenario.slug());

        let session = match BrowserSession::launch(scenario.browser, &self.config.launch).await {
            Ok(session) => session,
            Err(err) => {
                // No session, so no screenshot to capture.
                error!(
                    scenario = %scenario.slug(),
                    reason = %err,
                    "scenario failed before a session existed"
                );
                return ScenarioOutcome {
                    scenario,
                    status: Status::Failed {
                        reason: err.to_string(),
                        screenshot: None,
                    },
                    duration_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        let status = match self.drive(&session, &scenario).await {
            Ok(()) => Status::Passed,
            Err(err) => {
                let screenshot = self.capture_failure(&session, &scenario).await;
                error!(
                    scenario = %scenario.slug(),
                    browser = %scenario.browser,
                    reason = %err,
                    artifact = ?screenshot,
                    "scenario failed"
                );
                Status::Failed {
                    reason: err.to_string(),
                    screenshot,
                }
            }
        };

        session.close().await;

        ScenarioOutcome {
            scenario,
            status,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The per-scenario flow: open, submit, evaluate the expectation.
    async fn drive(&self, session: &BrowserSession, scenario: &Scenario) -> HarnessResult<()> {
        let login = LoginPage::new(session, &self.config.settings.base_url, self.config.wait);

        login.open().await?;
        login
            .submit_credentials(&scenario.credentials.username, &scenario.credentials.password)
            .await?;

        match &scenario.expectation {
            Expectation::Success { url_fragment } => {
                match login.wait_for_redirect(url_fragment).await {
                    Ok(url) => {
                        debug!("redirected to {}", url);
                    }
                    Err(HarnessError::Timeout { .. }) => {
                        let last = session.current_url().await.unwrap_or_default();
                        return Err(HarnessError::Assertion(format!(
                            "expected URL containing '{url_fragment}', still at '{last}'"
                        )));
                    }
                    Err(other) => return Err(other),
                }

                let inventory = InventoryPage::new(session, self.config.wait);
                if !inventory.is_loaded().await? {
                    return Err(HarnessError::Assertion(
                        "inventory page did not finish rendering after login".to_string(),
                    ));
                }
                Ok(())
            }
            Expectation::Failure { message_fragment } => {
                let message = login.error_message().await?;
                if message.contains(message_fragment) {
                    Ok(())
                } else {
                    Err(HarnessError::Assertion(format!(
                        "expected error containing '{message_fragment}', got '{message}'"
                    )))
                }
            }
        }
    }

    /// Best-effort screenshot on the failure path. A capture failure is
    /// logged and never masks the original error.
    async fn capture_failure(
        &self,
        session: &BrowserSession,
        scenario: &Scenario,
    ) -> Option<PathBuf> {
        let path = self
            .config
            .artifact_dir
            .join(artifact_name(scenario, Utc::now()));

        match session.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(err) => {
                error!(
                    scenario = %scenario.slug(),
                    "could not capture failure screenshot: {}", err
                );
                None
            }
        }
    }

    /// Write the run report as pretty JSON and return its path.
    pub fn write_report(&self, result: &SuiteResult) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.config.report_dir)?;

        let path = self.config.report_dir.join("report.json");
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json)?;

        info!("report written to {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        self.stop_server();
    }
}

/// Deterministic artifact name from scenario identity and a timestamp.
fn artifact_name(scenario: &Scenario, at: DateTime<Utc>) -> String {
    format!("{}-{}.png", scenario.slug(), at.format("%Y%m%dT%H%M%SZ"))
}
