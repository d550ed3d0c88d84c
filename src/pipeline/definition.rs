// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Pipeline configuration structures
//!
//! Defines the schema for .shipflow.yaml files. The stage set is fixed
//! (plan, build, test, monitor, deploy, rollback); the config only supplies
//! the command lines and the limits.

use serde::{Deserialize, Serialize};

/// Pipeline configuration from .shipflow.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Config version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Container image scanned before deployment
    pub image: String,

    /// Deployment adjusted by the post-deploy scaling step
    pub deployment: String,

    /// Shell used to run stage commands
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Stage command lines
    pub commands: StageCommands,

    /// Retry budgets, thresholds, and timeouts
    #[serde(default)]
    pub limits: Limits,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_shell() -> String {
    "bash".to_string()
}

impl PipelineConfig {
    /// Load config from a YAML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::ShipflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::ShipflowError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            }
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, crate::ShipflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize config to YAML
    pub fn to_yaml(&self) -> Result<String, crate::ShipflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }
}

/// Command lines for the fixed stage set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCommands {
    /// Planning command; runs once, non-zero exit aborts
    pub plan: String,

    /// Build command; retried under a wall-clock timeout
    pub build: String,

    /// Test command; output parsed for pass/fail counts
    pub test: String,

    /// Monitoring command; non-zero exit aborts
    pub monitor: String,

    /// Deploy command; runs only when the deploy gate is open
    pub deploy: String,

    /// Rollback command; runs instead of deploy when the gate is closed
    pub rollback: String,
}

impl StageCommands {
    /// Iterate (stage name, command line) pairs for validation
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("plan", self.plan.as_str()),
            ("build", self.build.as_str()),
            ("test", self.test.as_str()),
            ("monitor", self.monitor.as_str()),
            ("deploy", self.deploy.as_str()),
            ("rollback", self.rollback.as_str()),
        ]
        .into_iter()
    }
}

/// Retry budgets, thresholds, and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Build wall-clock timeout in seconds
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,

    /// Additional build attempts after the first failure
    #[serde(default = "default_retries")]
    pub build_retries: u32,

    /// Additional test attempts after the first threshold breach
    #[serde(default = "default_retries")]
    pub test_retries: u32,

    /// Failed-test count above which an attempt counts as failed
    #[serde(default = "default_test_threshold")]
    pub test_failure_threshold: u32,

    /// Delay between test attempts in seconds
    #[serde(default = "default_test_retry_delay")]
    pub test_retry_delay_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            build_timeout_secs: default_build_timeout(),
            build_retries: default_retries(),
            test_retries: default_retries(),
            test_failure_threshold: default_test_threshold(),
            test_retry_delay_secs: default_test_retry_delay(),
        }
    }
}

fn default_build_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    2
}

fn default_test_threshold() -> u32 {
    1
}

fn default_test_retry_delay() -> u64 {
    2
}
