// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for shipflow.

pub mod init;
pub mod run;
pub mod scale;
pub mod scan;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gated deployment pipeline driver
///
/// Runs plan, build, test, monitor, and deploy stages with retry budgets,
/// security gating, and rollback.
#[derive(Parser, Debug)]
#[clap(
    name = "shipflow",
    version,
    about = "Gated deployment pipeline driver with retry budgets and rollback",
    long_about = None,
    after_help = "Examples:\n\
        shipflow init                   Scaffold a .shipflow.yaml\n\
        shipflow validate               Check the pipeline config\n\
        shipflow run                    Execute the pipeline\n\
        shipflow scan -i app:latest     Scan an image standalone\n\n\
        See 'shipflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline
    Run {
        /// Pipeline config file
        #[clap(short, long, default_value = ".shipflow.yaml")]
        config: PathBuf,

        /// Show the stage plan without executing anything
        #[clap(long)]
        dry_run: bool,
    },

    /// Validate the pipeline configuration
    Validate {
        /// Config file to validate
        #[clap(default_value = ".shipflow.yaml")]
        config: PathBuf,
    },

    /// Scaffold a new .shipflow.yaml
    Init {
        /// Pipeline name (defaults to current directory name)
        name: Option<String>,
    },

    /// Scan a container image for CRITICAL vulnerabilities
    Scan {
        /// Image to scan
        #[clap(short, long)]
        image: String,

        /// Output format
        #[clap(short, long, default_value = "text", value_enum)]
        format: OutputFormat,
    },

    /// Apply the regression-based replica adjustment to a deployment
    Scale {
        /// Deployment to scale
        #[clap(short, long)]
        deployment: String,
    },
}

/// Output format for the scan command
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
