// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Pipeline driver
//!
//! The stage-sequencing and retry/rollback state machine. Stages run
//! strictly in order; every decision point — retry, proceed, defer, roll
//! back, abort — lives here and nowhere else.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tracing::{info, warn};

use crate::errors::ShipflowError;
use crate::exec::{CommandRunner, CommandSpec, ProcessRunner, StageResult};
use crate::monitor::FailureHistory;
use crate::pipeline::report::{build_succeeded, PipelineReport, TestSummary};
use crate::pipeline::{PipelineConfig, PipelineState, StageState};
use crate::scale::Autoscaler;
use crate::scan::{ImageScanner, ScanVerdict};

/// Drives the fixed stage sequence to completion or abort
pub struct PipelineDriver {
    config: PipelineConfig,
    runner: Arc<dyn CommandRunner>,
    scanner: ImageScanner,
    scaler: Autoscaler,
    state: PipelineState,
    history: FailureHistory,
    last_test_failures: u32,
    scan_skipped: bool,
    deployed: bool,
}

impl PipelineDriver {
    /// Create a driver backed by real child processes
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    /// Create a driver with an injected runner
    pub fn with_runner(config: PipelineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            scanner: ImageScanner::new(runner.clone()),
            scaler: Autoscaler::new(runner.clone()),
            config,
            runner,
            state: PipelineState::new(),
            history: FailureHistory::new(),
            last_test_failures: 0,
            scan_skipped: false,
            deployed: false,
        }
    }

    /// Driver state, exposed for inspection after a run
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Run the pipeline to DONE or the first abort
    pub async fn run(&mut self) -> Result<PipelineReport, ShipflowError> {
        let start = Instant::now();
        info!("starting pipeline '{}'", self.config.name);

        loop {
            let step = match self.state.current {
                StageState::Planning => self.run_planning().await,
                StageState::Building => self.run_building().await,
                StageState::Testing => self.run_testing().await,
                StageState::Monitoring => self.run_monitoring().await,
                StageState::SecurityScan => self.run_security_scan().await,
                StageState::Deploying => self.run_deploying().await,
                StageState::Done => return Ok(self.report(start.elapsed())),
                StageState::Aborted => {
                    // Errors below return before re-entering the loop
                    unreachable!("aborted state is never re-entered")
                }
            };

            if let Err(e) = step {
                self.state.abort();
                return Err(e);
            }

            self.state.advance();
        }
    }

    fn stage_spec(&self, stage: StageState, command: &str) -> CommandSpec {
        CommandSpec::shell(stage.name(), &self.config.shell, command)
    }

    /// PLANNING: one attempt, any non-zero exit is a fatal misconfiguration
    async fn run_planning(&mut self) -> Result<(), ShipflowError> {
        print_running(StageState::Planning);
        self.state.record_attempt(StageState::Planning);

        let spec = self.stage_spec(StageState::Planning, &self.config.commands.plan);
        let result = self.runner.run(&spec).await?;

        if !result.success() {
            self.state.record_failure();
            print_failed(StageState::Planning);
            return Err(ShipflowError::stage_failed_with_help(
                "plan",
                1,
                result.stderr,
            ));
        }

        print_done(StageState::Planning, &result);
        Ok(())
    }

    /// BUILDING: bounded timeout per attempt; success is exit 0 with no
    /// "Error" marker; retried up to the budget; timeout aborts outright.
    async fn run_building(&mut self) -> Result<(), ShipflowError> {
        print_running(StageState::Building);

        let budget = self.config.limits.build_retries;
        let timeout = Duration::from_secs(self.config.limits.build_timeout_secs);
        let command = self.config.commands.build.clone();

        loop {
            let attempt = self.state.record_attempt(StageState::Building);
            let spec = self
                .stage_spec(StageState::Building, &command)
                .with_timeout(timeout);

            // StageTimedOut and spawn failures propagate: no retry for those
            let result = self.runner.run(&spec).await?;

            if build_succeeded(&result) {
                if attempt > 1 {
                    info!("build succeeded on attempt {}", attempt);
                }
                print_done(StageState::Building, &result);
                return Ok(());
            }

            self.state.record_failure();

            if attempt > budget {
                print_failed(StageState::Building);
                return Err(ShipflowError::stage_failed_with_help(
                    "build",
                    attempt,
                    result.stderr,
                ));
            }

            warn!(
                "build attempt failed, retrying ({}/{})",
                attempt,
                budget + 1
            );
        }
    }

    /// TESTING: threshold-gated with retries and a fixed delay; exhausting
    /// the budget defers the decision to the deploy gate instead of aborting.
    async fn run_testing(&mut self) -> Result<(), ShipflowError> {
        print_running(StageState::Testing);

        let budget = self.config.limits.test_retries;
        let threshold = self.config.limits.test_failure_threshold;
        let delay = Duration::from_secs(self.config.limits.test_retry_delay_secs);
        let command = self.config.commands.test.clone();

        loop {
            let attempt = self.state.record_attempt(StageState::Testing);
            let spec = self.stage_spec(StageState::Testing, &command);
            let result = self.runner.run(&spec).await?;

            let summary = TestSummary::parse(&result.combined_output());
            self.last_test_failures = summary.failed;

            if !summary.exceeds(threshold) {
                self.state.tests_passed = true;
                info!("{} passed, {} failed", summary.passed, summary.failed);
                print_done(StageState::Testing, &result);
                return Ok(());
            }

            self.state.record_failure();
            warn!(
                "{} test failures exceed threshold {}",
                summary.failed, threshold
            );

            if attempt > budget {
                self.state.tests_passed = false;
                warn!("test retries exhausted; deferring the decision to the deploy gate");
                print_failed(StageState::Testing);
                return Ok(());
            }

            info!("retrying tests ({}/{})", attempt, budget);
            tokio::time::sleep(delay).await;
        }
    }

    /// MONITORING: one attempt, non-zero exit aborts; the failure history
    /// gets the test-stage failure count and is checked for an outlier.
    async fn run_monitoring(&mut self) -> Result<(), ShipflowError> {
        print_running(StageState::Monitoring);
        self.state.record_attempt(StageState::Monitoring);

        let spec = self.stage_spec(StageState::Monitoring, &self.config.commands.monitor);
        let result = self.runner.run(&spec).await?;

        if !result.success() {
            self.state.record_failure();
            print_failed(StageState::Monitoring);
            return Err(ShipflowError::stage_failed_with_help(
                "monitor",
                1,
                result.stderr,
            ));
        }

        self.history.record(self.last_test_failures as f64);
        if self.history.latest_is_anomalous() {
            warn!("failure count is anomalous against recent history");
        }

        print_done(StageState::Monitoring, &result);
        Ok(())
    }

    /// SECURITY_SCAN: a missing scanner is a warning and a soft pass;
    /// CRITICAL findings abort before deployment.
    async fn run_security_scan(&mut self) -> Result<(), ShipflowError> {
        print_running(StageState::SecurityScan);
        self.state.record_attempt(StageState::SecurityScan);

        match self.scanner.scan(&self.config.image).await? {
            ScanVerdict::Skipped => {
                warn!("scanner unavailable; skipping image scan");
                println!(
                    "\r  {} {} {}",
                    "○".dimmed(),
                    StageState::SecurityScan.name().bold(),
                    "(skipped)".dimmed()
                );
                self.scan_skipped = true;
                self.state.scan_passed = true;
            }
            ScanVerdict::Clean => {
                info!("no CRITICAL vulnerabilities in '{}'", self.config.image);
                println!(
                    "\r  {} {}",
                    "✓".green(),
                    StageState::SecurityScan.name().bold()
                );
                self.state.scan_passed = true;
            }
            ScanVerdict::Blocked { critical } => {
                self.state.record_failure();
                print_failed(StageState::SecurityScan);
                return Err(ShipflowError::SecurityBlocked {
                    image: self.config.image.clone(),
                    critical,
                });
            }
        }

        Ok(())
    }

    /// DEPLOYING: open gate runs deploy then the scaling adjustment;
    /// closed gate runs rollback and aborts.
    async fn run_deploying(&mut self) -> Result<(), ShipflowError> {
        self.state.record_attempt(StageState::Deploying);

        if self.state.tests_passed && self.state.scan_passed {
            print_running(StageState::Deploying);

            let spec = self.stage_spec(StageState::Deploying, &self.config.commands.deploy);
            let result = self.runner.run(&spec).await?;

            if !result.success() {
                self.state.record_failure();
                print_failed(StageState::Deploying);
                return Err(ShipflowError::stage_failed_with_help(
                    "deploy",
                    1,
                    result.stderr,
                ));
            }

            self.deployed = true;
            print_done(StageState::Deploying, &result);

            // Post-deploy scaling is best-effort: the rollout already
            // succeeded, so a missing or failing cluster client only warns.
            match self.scaler.apply(&self.config.deployment).await {
                Ok(replicas) => {
                    info!(
                        "scaled deployment '{}' to {} replicas",
                        self.config.deployment, replicas
                    );
                }
                Err(ShipflowError::CommandNotFound { .. }) => {
                    warn!("cluster client unavailable; skipping scaling adjustment");
                }
                Err(e) => {
                    warn!("scaling adjustment failed: {}", e);
                }
            }

            Ok(())
        } else {
            warn!("deploy gate closed; rolling back");
            let spec =
                CommandSpec::shell("rollback", &self.config.shell, &self.config.commands.rollback);
            let result = self.runner.run(&spec).await?;

            if !result.success() {
                warn!("rollback command exited non-zero");
            }
            print_failed(StageState::Deploying);

            Err(ShipflowError::DeployGateClosed {
                failed: self.last_test_failures,
                threshold: self.config.limits.test_failure_threshold,
            })
        }
    }

    fn report(&self, duration: Duration) -> PipelineReport {
        let sequence = [
            StageState::Planning,
            StageState::Building,
            StageState::Testing,
            StageState::Monitoring,
            StageState::SecurityScan,
            StageState::Deploying,
        ];

        PipelineReport {
            duration,
            deployed: self.deployed,
            tests_passed: self.state.tests_passed,
            scan_skipped: self.scan_skipped,
            stage_attempts: sequence
                .iter()
                .map(|s| (s.name(), self.state.attempts(*s)))
                .collect(),
        }
    }
}

fn print_running(stage: StageState) {
    print!("  {} {}...", "→".blue(), stage.name());
}

fn print_done(stage: StageState, result: &StageResult) {
    println!(
        "\r  {} {} ({:.2}s)",
        "✓".green(),
        stage.name().bold(),
        result.duration.as_secs_f64()
    );
}

fn print_failed(stage: StageState) {
    println!("\r  {} {} failed", "✗".red(), stage.name().bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::from_yaml(
            r#"
name: "webapp"
image: "webapp:latest"
deployment: "webapp"
shell: "sh"
commands:
  plan: "plan"
  build: "build"
  test: "test"
  monitor: "monitor"
  deploy: "deploy"
  rollback: "rollback"
"#,
        )
        .unwrap();
        // Keep retry loops fast in tests
        config.limits.test_retry_delay_secs = 0;
        config
    }

    fn driver_with(runner: Arc<ScriptedRunner>) -> PipelineDriver {
        PipelineDriver::with_runner(config(), runner)
    }

    #[tokio::test]
    async fn test_full_run_deploys_and_scales_once() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("test", 0, "5 passed in 1.2s");
        runner.ok("scan", 0, "CRITICAL: 0");
        runner.ok("scale", 0, "webapp-1   100m   50Mi");
        runner.ok("scale", 0, "deployment.apps/webapp scaled");

        let mut driver = driver_with(runner.clone());
        let report = driver.run().await.unwrap();

        assert!(report.deployed);
        assert!(report.tests_passed);
        assert!(!report.scan_skipped);
        assert_eq!(driver.state().current, StageState::Done);

        // Each stage exactly once, deploy and both scale calls included
        assert_eq!(
            runner.calls(),
            vec!["plan", "build", "test", "monitor", "scan", "deploy", "scale", "scale"]
        );
    }

    #[tokio::test]
    async fn test_plan_failure_aborts_before_build() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("plan", 1, "missing requirements file");

        let mut driver = driver_with(runner.clone());
        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, ShipflowError::StageFailed { ref stage, .. } if stage == "plan"));
        assert_eq!(driver.state().current, StageState::Aborted);
        assert_eq!(runner.count("build"), 0);
    }

    #[tokio::test]
    async fn test_build_retries_exactly_budget_then_aborts() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("build", 1, "");
        runner.ok("build", 1, "");
        runner.ok("build", 1, "");

        let mut driver = driver_with(runner.clone());
        let err = driver.run().await.unwrap_err();

        assert!(matches!(
            err,
            ShipflowError::StageFailed { ref stage, attempts: 3, .. } if stage == "build"
        ));
        // 1 initial + 2 retries, then nothing further runs
        assert_eq!(runner.count("build"), 3);
        assert_eq!(runner.count("test"), 0);
    }

    #[tokio::test]
    async fn test_build_error_marker_fails_despite_exit_zero() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("build", 0, "Error: link step failed");
        runner.ok("build", 0, "build completed in 2.0 seconds");
        runner.ok("test", 0, "5 passed");
        runner.ok("scan", 0, "CRITICAL: 0");

        let mut driver = driver_with(runner.clone());
        let report = driver.run().await.unwrap();

        assert!(report.deployed);
        assert_eq!(runner.count("build"), 2);
    }

    #[tokio::test]
    async fn test_build_timeout_aborts_without_retry() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.err(
            "build",
            ShipflowError::StageTimedOut {
                stage: "build".into(),
                seconds: 120,
            },
        );

        let mut driver = driver_with(runner.clone());
        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, ShipflowError::StageTimedOut { .. }));
        assert_eq!(runner.count("build"), 1);
        assert_eq!(driver.state().current, StageState::Aborted);
    }

    #[tokio::test]
    async fn test_test_failures_defer_to_deploy_gate() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("test", 0, "2 passed, 3 failed");
        runner.ok("test", 0, "2 passed, 3 failed");
        runner.ok("test", 0, "2 passed, 3 failed");
        runner.ok("scan", 0, "CRITICAL: 0");

        let mut driver = driver_with(runner.clone());
        let err = driver.run().await.unwrap_err();

        // Initial attempt + 2 retries, then the pipeline continues through
        // monitoring and the scan before the gate closes.
        assert_eq!(runner.count("test"), 3);
        assert_eq!(runner.count("monitor"), 1);
        assert_eq!(runner.count("scan"), 1);
        assert_eq!(runner.count("rollback"), 1);
        assert_eq!(runner.count("deploy"), 0);

        assert!(!driver.state().tests_passed);
        assert!(matches!(
            err,
            ShipflowError::DeployGateClosed { failed: 3, threshold: 1 }
        ));
    }

    #[tokio::test]
    async fn test_failures_within_threshold_pass() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("test", 0, "9 passed, 1 failed");
        runner.ok("scan", 0, "CRITICAL: 0");

        let mut driver = driver_with(runner.clone());
        let report = driver.run().await.unwrap();

        // 1 failed does not exceed threshold 1
        assert_eq!(runner.count("test"), 1);
        assert!(report.tests_passed);
        assert!(report.deployed);
    }

    #[tokio::test]
    async fn test_monitor_failure_aborts_before_scan() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("test", 0, "5 passed");
        runner.ok("monitor", 2, "");

        let mut driver = driver_with(runner.clone());
        let err = driver.run().await.unwrap_err();

        assert!(matches!(err, ShipflowError::StageFailed { ref stage, .. } if stage == "monitor"));
        assert_eq!(runner.count("scan"), 0);
        assert_eq!(runner.count("deploy"), 0);
    }

    #[tokio::test]
    async fn test_critical_findings_abort_before_deploy() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("test", 0, "5 passed");
        runner.ok("scan", 0, "Total: 14 (CRITICAL: 2)");

        let mut driver = driver_with(runner.clone());
        let err = driver.run().await.unwrap_err();

        assert!(matches!(
            err,
            ShipflowError::SecurityBlocked { critical: 2, .. }
        ));
        assert_eq!(runner.count("deploy"), 0);
        assert_eq!(runner.count("rollback"), 0);
        assert_eq!(driver.state().current, StageState::Aborted);
    }

    #[tokio::test]
    async fn test_missing_scanner_soft_passes() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("test", 0, "5 passed");
        runner.not_found("scan");

        let mut driver = driver_with(runner.clone());
        let report = driver.run().await.unwrap();

        assert!(report.scan_skipped);
        assert!(report.deployed);
        assert_eq!(runner.count("deploy"), 1);
    }

    #[tokio::test]
    async fn test_missing_cluster_client_does_not_fail_deploy() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("test", 0, "5 passed");
        runner.ok("scan", 0, "CRITICAL: 0");
        runner.not_found("scale");

        let mut driver = driver_with(runner.clone());
        let report = driver.run().await.unwrap();

        assert!(report.deployed);
        assert_eq!(driver.state().current, StageState::Done);
    }

    #[tokio::test]
    async fn test_report_attempt_counts() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("build", 1, "");
        runner.ok("build", 0, "ok");
        runner.ok("test", 0, "5 passed");
        runner.ok("scan", 0, "CRITICAL: 0");

        let mut driver = driver_with(runner.clone());
        let report = driver.run().await.unwrap();

        let attempts: std::collections::HashMap<_, _> =
            report.stage_attempts.iter().copied().collect();
        assert_eq!(attempts["plan"], 1);
        assert_eq!(attempts["build"], 2);
        assert_eq!(attempts["test"], 1);
        assert_eq!(attempts["deploy"], 1);
    }
}
