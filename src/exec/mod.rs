// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Command execution seam
//!
//! Every external tool the pipeline touches goes through [`CommandRunner`],
//! so the driver's state machine can be exercised against a scripted fake.
//! The real implementation spawns child processes via tokio.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::errors::ShipflowError;

/// Specification of a single external command invocation
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Label used in logs and errors (usually the stage name)
    pub label: String,

    /// Program to invoke
    pub program: String,

    /// Arguments
    pub args: Vec<String>,

    /// Wall-clock ceiling; the process is killed when it elapses
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a spec for a program with arguments
    pub fn new(label: &str, program: &str, args: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout: None,
        }
    }

    /// Create a spec that runs a command line through a shell
    pub fn shell(label: &str, shell: &str, command: &str) -> Self {
        Self {
            label: label.to_string(),
            program: shell.to_string(),
            args: vec!["-c".to_string(), command.to_string()],
            timeout: None,
        }
    }

    /// Set a wall-clock timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Captured result of one command invocation
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Standard output (lossy UTF-8)
    pub stdout: String,

    /// Standard error (lossy UTF-8)
    pub stderr: String,

    /// Exit code (-1 if terminated by signal)
    pub exit_code: i32,

    /// Execution duration
    pub duration: Duration,
}

impl StageResult {
    /// Whether the process exited zero
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combined stdout + stderr, the sole result channel for stage commands
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Trait for running external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion, capturing combined output
    async fn run(&self, spec: &CommandSpec) -> Result<StageResult, ShipflowError>;
}

/// Process-backed runner
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<StageResult, ShipflowError> {
        let start = Instant::now();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.kill_on_drop(true);

        // Children inherit our environment; prefer a UTF-8 locale so tool
        // output decodes cleanly.
        if std::env::var_os("LC_ALL").is_none() {
            cmd.env("LC_ALL", "C.UTF-8");
        }

        let output_fut = cmd.output();

        let output = match spec.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, output_fut).await {
                Ok(result) => result,
                Err(_) => {
                    // kill_on_drop reaps the child when the future is dropped
                    return Err(ShipflowError::StageTimedOut {
                        stage: spec.label.clone(),
                        seconds: timeout.as_secs(),
                    });
                }
            },
            None => output_fut.await,
        };

        let output = output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShipflowError::command_not_found(&spec.program)
            } else {
                ShipflowError::CommandSpawnFailed {
                    program: spec.program.clone(),
                    error: e.to_string(),
                }
            }
        })?;

        Ok(StageResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }
}

/// Scripted runner for exercising the driver without spawning processes
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Fake [`CommandRunner`] that replays queued responses per label and
    /// records every invocation.
    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: Mutex<HashMap<String, VecDeque<Result<StageResult, ShipflowError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a completed invocation with the given exit code and stdout
        pub fn ok(&self, label: &str, exit_code: i32, stdout: &str) {
            self.push(
                label,
                Ok(StageResult {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    exit_code,
                    duration: Duration::from_millis(1),
                }),
            );
        }

        /// Queue a missing-binary failure
        pub fn not_found(&self, label: &str) {
            self.push(label, Err(ShipflowError::command_not_found(label)));
        }

        /// Queue an arbitrary error
        pub fn err(&self, label: &str, error: ShipflowError) {
            self.push(label, Err(error));
        }

        fn push(&self, label: &str, response: Result<StageResult, ShipflowError>) {
            self.responses
                .lock()
                .unwrap()
                .entry(label.to_string())
                .or_default()
                .push_back(response);
        }

        /// Labels of every invocation, in order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// How many times a label was invoked
        pub fn count(&self, label: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == label).count()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<StageResult, ShipflowError> {
            self.calls.lock().unwrap().push(spec.label.clone());

            let queued = self
                .responses
                .lock()
                .unwrap()
                .get_mut(&spec.label)
                .and_then(|q| q.pop_front());

            // Unscripted invocations succeed with empty output
            queued.unwrap_or_else(|| {
                Ok(StageResult {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: 0,
                    duration: Duration::from_millis(1),
                })
            })
        }
    }
}
