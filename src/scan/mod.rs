// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Container image scanning
//!
//! Wraps trivy and extracts the CRITICAL finding count that gates
//! deployment. A missing scanner binary downgrades to a skip, never a
//! pipeline failure.

use regex::Regex;
use std::sync::Arc;

use crate::errors::ShipflowError;
use crate::exec::{CommandRunner, CommandSpec};

/// Scanner binary name
pub const SCANNER_BIN: &str = "trivy";

/// Outcome of scanning an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    /// No CRITICAL findings
    Clean,

    /// CRITICAL findings block deployment
    Blocked { critical: u32 },

    /// Scanner binary unavailable; treated as a soft pass
    Skipped,
}

impl ScanVerdict {
    /// Whether deployment may proceed
    pub fn passed(&self) -> bool {
        !matches!(self, Self::Blocked { .. })
    }
}

/// Image vulnerability scanner
pub struct ImageScanner {
    runner: Arc<dyn CommandRunner>,
}

impl ImageScanner {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Scan an image for CRITICAL vulnerabilities.
    ///
    /// trivy exits non-zero in some configurations even when it produced a
    /// report, so the verdict comes from the scraped count alone.
    pub async fn scan(&self, image: &str) -> Result<ScanVerdict, ShipflowError> {
        let spec = CommandSpec::new(
            "scan",
            SCANNER_BIN,
            &["image", "--severity", "CRITICAL", image],
        );

        let result = match self.runner.run(&spec).await {
            Ok(result) => result,
            Err(ShipflowError::CommandNotFound { .. }) => return Ok(ScanVerdict::Skipped),
            Err(e) => return Err(e),
        };

        let critical = parse_critical_count(&result.combined_output());
        if critical > 0 {
            Ok(ScanVerdict::Blocked { critical })
        } else {
            Ok(ScanVerdict::Clean)
        }
    }
}

/// Extract the first "CRITICAL: N" count; absent counts as 0
pub fn parse_critical_count(output: &str) -> u32 {
    let re = Regex::new(r"CRITICAL:\s*(\d+)").expect("critical pattern is a valid regex");
    re.captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;

    #[test]
    fn test_parse_critical_count() {
        assert_eq!(parse_critical_count("Total: 14 (CRITICAL: 2)"), 2);
        assert_eq!(parse_critical_count("CRITICAL: 0"), 0);
        assert_eq!(parse_critical_count("no table in output"), 0);
    }

    #[tokio::test]
    async fn test_clean_scan_passes() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("scan", 0, "webapp:latest (alpine 3.19)\nCRITICAL: 0\n");

        let scanner = ImageScanner::new(runner);
        let verdict = scanner.scan("webapp:latest").await.unwrap();

        assert_eq!(verdict, ScanVerdict::Clean);
        assert!(verdict.passed());
    }

    #[tokio::test]
    async fn test_critical_findings_block() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("scan", 0, "CRITICAL: 2\n");

        let scanner = ImageScanner::new(runner);
        let verdict = scanner.scan("webapp:latest").await.unwrap();

        assert_eq!(verdict, ScanVerdict::Blocked { critical: 2 });
        assert!(!verdict.passed());
    }

    #[tokio::test]
    async fn test_missing_scanner_is_skip() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.not_found("scan");

        let scanner = ImageScanner::new(runner);
        let verdict = scanner.scan("webapp:latest").await.unwrap();

        assert_eq!(verdict, ScanVerdict::Skipped);
        assert!(verdict.passed());
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_yields_verdict() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("scan", 1, "CRITICAL: 0\n");

        let scanner = ImageScanner::new(runner);
        let verdict = scanner.scan("webapp:latest").await.unwrap();

        assert_eq!(verdict, ScanVerdict::Clean);
    }
}
