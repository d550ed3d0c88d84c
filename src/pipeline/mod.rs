// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Pipeline configuration and the stage state machine

mod definition;
mod driver;
pub mod report;
mod state;
mod validation;

pub use definition::{Limits, PipelineConfig, StageCommands};
pub use driver::PipelineDriver;
pub use report::{PipelineReport, TestSummary};
pub use state::{PipelineState, StageState};
pub use validation::{ConfigValidator, ValidationResult};
