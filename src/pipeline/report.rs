// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Tool output parsing and the run report
//!
//! Stage commands report through human-readable text only, so success is
//! classified by exit code plus scraped markers. The scraping lives here,
//! isolated from the state machine, so a structured (JSON) path can replace
//! it per collaborator later.

use regex::Regex;
use std::time::Duration;

use crate::exec::StageResult;

/// Pass/fail counts scraped from test runner output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
}

impl TestSummary {
    /// Parse "<N> passed" / "<N> failed" from combined output.
    ///
    /// A missing marker counts as 0, matching pytest runs where one of the
    /// two buckets is empty.
    pub fn parse(output: &str) -> Self {
        Self {
            passed: first_count(r"(\d+) passed", output),
            failed: first_count(r"(\d+) failed", output),
        }
    }

    /// Whether the failure count breaches the configured threshold
    pub fn exceeds(&self, threshold: u32) -> bool {
        self.failed > threshold
    }
}

fn first_count(pattern: &str, output: &str) -> u32 {
    let re = Regex::new(pattern).expect("count pattern is a valid regex");
    re.captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Classify a build attempt: exit 0 and no literal "Error" marker in the
/// combined output.
pub fn build_succeeded(result: &StageResult) -> bool {
    result.success() && !result.combined_output().contains("Error")
}

/// Summary of a completed pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// Total wall-clock time
    pub duration: Duration,

    /// Whether the deploy command ran
    pub deployed: bool,

    /// Whether tests passed within the retry budget
    pub tests_passed: bool,

    /// Whether the security scan was skipped (scanner unavailable)
    pub scan_skipped: bool,

    /// (stage name, attempts) in execution order
    pub stage_attempts: Vec<(&'static str, u32)>,
}
