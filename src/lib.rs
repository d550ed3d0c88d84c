// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! # shipflow - Gated Deployment Pipeline Driver
//!
//! `shipflow` runs a fixed five-stage CI/CD pipeline — plan, build, test,
//! monitor, deploy — where every stage delegates to an external command and
//! the driver decides, from each stage's outcome, whether to retry, proceed,
//! roll back, or abort.
//!
//! ## Features
//!
//! - **Retry budgets** - Build and test stages get bounded retries
//! - **Deploy gating** - Test failures defer to the deploy gate instead of
//!   aborting the whole pipeline
//! - **Security gate** - CRITICAL image vulnerabilities block deployment
//! - **Rollback** - A closed gate triggers the rollback command
//! - **Post-deploy scaling** - Regression-based replica adjustment
//!
//! ## Quick Start
//!
//! ```bash
//! # Scaffold a config
//! shipflow init
//!
//! # Check it
//! shipflow validate
//!
//! # Run the pipeline
//! shipflow run
//! ```

pub mod cli;
pub mod errors;
pub mod exec;
pub mod monitor;
pub mod pipeline;
pub mod scale;
pub mod scan;
pub mod utils;

// Re-export commonly used types
pub use errors::{ShipflowError, ShipflowResult};
pub use pipeline::{PipelineConfig, PipelineDriver, PipelineReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
