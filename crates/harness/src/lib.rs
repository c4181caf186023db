//! uiregress harness
//!
//! Orchestration layer for the cross-browser login regression suite:
//!
//! - [`config`]: TOML settings (base URL, headless flag, credential pairs);
//!   missing keys are fatal before any scenario runs
//! - [`browser`]: one Playwright driver process per scenario, JSON-lines
//!   protocol, teardown guaranteed on every exit path
//! - [`page`]: page objects hiding locators and wait logic behind
//!   intention-revealing operations
//! - [`wait`]: the bounded-polling primitive every page operation routes
//!   through
//! - [`scenario`]: the explicit (browser × credentials) matrix
//! - [`runner`]: drives scenarios, classifies outcomes, captures failure
//!   diagnostics, writes the JSON report
//! - [`server`]: spawns and health-checks the bundled static file server

pub mod browser;
pub mod config;
pub mod error;
pub mod page;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod wait;

pub use browser::{Browser, BrowserSession, LaunchOptions};
pub use config::Config;
pub use error::{HarnessError, HarnessResult};
pub use runner::{RunnerConfig, SuiteResult, TestRunner};
pub use scenario::Scenario;
pub use wait::WaitPolicy;
