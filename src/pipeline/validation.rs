// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Config validation
//!
//! Validates pipeline configuration before execution.

use crate::errors::ShipflowError;
use crate::pipeline::PipelineConfig;

/// Config validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a pipeline configuration
    pub fn validate(config: &PipelineConfig) -> Result<ValidationResult, ShipflowError> {
        let mut result = ValidationResult::new();

        if config.name.trim().is_empty() {
            result.add_error("Pipeline name is empty");
        }

        if config.image.trim().is_empty() {
            result.add_error("Container image is empty; the security scan has nothing to scan");
        }

        if config.deployment.trim().is_empty() {
            result.add_error("Deployment name is empty; the scaling step has nothing to adjust");
        }

        if config.shell.trim().is_empty() {
            result.add_error("Shell is empty");
        }

        for (stage, command) in config.commands.iter() {
            if command.trim().is_empty() {
                result.add_error(&format!("Stage '{}': command is empty", stage));
            }
        }

        if config.limits.build_timeout_secs == 0 {
            result.add_error("limits.build_timeout_secs is 0; the build would be killed immediately");
        }

        if config.limits.test_failure_threshold == 0 {
            result.add_warning(
                "limits.test_failure_threshold is 0; a single failing test closes the deploy gate",
            );
        }

        if config.limits.build_retries == 0 {
            result.add_warning("limits.build_retries is 0; the build gets a single attempt");
        }

        Ok(result)
    }
}

/// Result of config validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
