// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Scan command - standalone image vulnerability scan
//!
//! Unlike the pipeline's scan stage, a missing scanner binary is an error
//! here: the user asked for a scan explicitly.

use colored::Colorize;
use miette::Result;
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::exec::ProcessRunner;
use crate::scan::{ImageScanner, ScanVerdict, SCANNER_BIN};
use crate::utils::create_spinner;

/// Run the scan command
pub async fn run(image: String, format: OutputFormat, verbose: bool) -> Result<()> {
    if which::which(SCANNER_BIN).is_err() {
        return Err(crate::ShipflowError::command_not_found(SCANNER_BIN).into());
    }

    let spinner = if format == OutputFormat::Text {
        Some(create_spinner(&format!("Scanning {}...", image)))
    } else {
        None
    };

    let scanner = ImageScanner::new(Arc::new(ProcessRunner::new()));
    let verdict = scanner.scan(&image).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let verdict = verdict.map_err(|e| miette::Report::from(e))?;

    match format {
        OutputFormat::Json => {
            let (status, critical) = match verdict {
                ScanVerdict::Clean => ("clean", 0),
                ScanVerdict::Blocked { critical } => ("blocked", critical),
                ScanVerdict::Skipped => ("skipped", 0),
            };
            let report = serde_json::json!({
                "image": image,
                "status": status,
                "critical": critical,
            });
            println!("{}", serde_json::to_string_pretty(&report).map_err(
                |e| miette::miette!("Failed to serialize report: {}", e)
            )?);
        }
        OutputFormat::Text => match verdict {
            ScanVerdict::Clean => {
                println!(
                    "  {} No CRITICAL vulnerabilities in {}",
                    "✓".green(),
                    image.bold()
                );
            }
            ScanVerdict::Blocked { critical } => {
                println!(
                    "  {} {} CRITICAL vulnerabilities in {}",
                    "✗".red(),
                    critical,
                    image.bold()
                );
            }
            ScanVerdict::Skipped => {
                println!("  {} Scan skipped", "○".dimmed());
            }
        },
    }

    if verbose {
        println!();
        println!("{}", format!("Scanner: {}", SCANNER_BIN).dimmed());
    }

    match verdict {
        ScanVerdict::Blocked { critical } => Err(crate::ShipflowError::SecurityBlocked {
            image,
            critical,
        }
        .into()),
        _ => Ok(()),
    }
}
