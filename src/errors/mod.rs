// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Error types
//!
//! Every abort path in the pipeline maps to exactly one variant here, so the
//! exit-code behavior of the driver can be read off this enum.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for shipflow operations
pub type ShipflowResult<T> = Result<T, ShipflowError>;

/// Main error type for shipflow
#[derive(Error, Debug, Diagnostic)]
pub enum ShipflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Stage Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' failed after {attempts} attempt(s)")]
    #[diagnostic(code(shipflow::stage_failed))]
    StageFailed {
        stage: String,
        attempts: u32,
        stderr: String,
        #[help]
        help: Option<String>,
    },

    #[error("Stage '{stage}' timed out after {seconds}s")]
    #[diagnostic(
        code(shipflow::stage_timed_out),
        help("The process was killed. Raise limits.build_timeout_secs if the build legitimately needs longer.")
    )]
    StageTimedOut { stage: String, seconds: u64 },

    #[error("Deployment gate closed: {failed} test failures exceed threshold {threshold}")]
    #[diagnostic(
        code(shipflow::deploy_gate_closed),
        help("Rollback was invoked. Fix the failing tests or raise limits.test_failure_threshold.")
    )]
    DeployGateClosed { failed: u32, threshold: u32 },

    #[error("Deployment blocked: {critical} CRITICAL vulnerabilities in image '{image}'")]
    #[diagnostic(
        code(shipflow::security_blocked),
        help("Rebuild the image against patched base layers, then re-run the pipeline.")
    )]
    SecurityBlocked { image: String, critical: u32 },

    // ─────────────────────────────────────────────────────────────────────────
    // Command Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Command '{program}' not found")]
    #[diagnostic(
        code(shipflow::command_not_found),
        help("{suggestion}")
    )]
    CommandNotFound {
        program: String,
        suggestion: String,
    },

    #[error("Failed to run '{program}': {error}")]
    #[diagnostic(code(shipflow::command_spawn_failed))]
    CommandSpawnFailed { program: String, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Config Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline config not found: {path}")]
    #[diagnostic(
        code(shipflow::config_not_found),
        help("Create a config with 'shipflow init' or create .shipflow.yaml manually")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid pipeline config: {reason}")]
    #[diagnostic(code(shipflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(shipflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(shipflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(shipflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(shipflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(shipflow::json_error))]
    Json { message: String },
}

impl From<std::io::Error> for ShipflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for ShipflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for ShipflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl ShipflowError {
    /// Create a command not found error with an installation suggestion
    pub fn command_not_found(program: &str) -> Self {
        let suggestion = match program {
            "trivy" => "Install trivy: https://aquasecurity.github.io/trivy/".to_string(),
            "kubectl" => "Install kubectl: https://kubernetes.io/docs/tasks/tools/".to_string(),
            _ => format!("Install {} and ensure it's in your PATH", program),
        };

        Self::CommandNotFound {
            program: program.to_string(),
            suggestion,
        }
    }

    /// Create a stage failure with a hint derived from the captured output
    pub fn stage_failed_with_help(stage: &str, attempts: u32, stderr: String) -> Self {
        let help = Self::generate_help_for_stage(stage, &stderr);
        Self::StageFailed {
            stage: stage.to_string(),
            attempts,
            stderr,
            help,
        }
    }

    /// Generate helpful suggestions based on captured stage output
    fn generate_help_for_stage(stage: &str, stderr: &str) -> Option<String> {
        match stage {
            "build" => {
                if stderr.contains("No such file") {
                    Some(
                        "The build command references a missing file. Check paths in .shipflow.yaml."
                            .into(),
                    )
                } else {
                    None
                }
            }
            "plan" => Some(
                "Planning failures signal a fatal misconfiguration; the pipeline never retries them."
                    .into(),
            ),
            _ => None,
        }
    }
}
