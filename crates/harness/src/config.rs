//! Run configuration loaded from a TOML file
//!
//! Every key referenced by the suite must be present before a run starts;
//! a missing or malformed key is a fatal setup error, never a per-scenario
//! failure. The configuration is read-only for the duration of a run.

use serde::Deserialize;
use std::path::Path;

use crate::error::{HarnessError, HarnessResult};

/// Environment settings plus the credential pairs the matrix is built from.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// URL of the page under test.
    pub base_url: String,

    /// Launch browsers without a display surface.
    pub headless: bool,

    pub credentials: CredentialConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfig {
    pub valid_username: String,
    pub valid_password: String,
    pub invalid_username: String,
    pub invalid_password: String,
}

impl Config {
    pub fn from_toml(raw: &str) -> HarnessResult<Self> {
        toml::from_str(raw).map_err(|e| HarnessError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }
}
