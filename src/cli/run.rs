// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{ConfigValidator, PipelineConfig, PipelineDriver};

/// Run the pipeline
pub async fn run(config_path: PathBuf, dry_run: bool, verbose: bool) -> Result<()> {
    // Check config exists
    if !config_path.exists() {
        return Err(miette::miette!(
            "Pipeline config not found: {}\n\n\
             Run 'shipflow init' to create one.",
            config_path.display()
        ));
    }

    // Load config
    let config = PipelineConfig::from_file(&config_path)
        .map_err(|e| miette::miette!("Failed to load config: {}", e))?;

    // Validate config
    let validation = ConfigValidator::validate(&config)?;

    if !validation.is_valid() {
        eprintln!("{}", "Config validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Config warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    print_plan(&config);

    if dry_run {
        println!("{}", "Dry run - no commands executed.".dimmed());
        return Ok(());
    }

    // Execute
    let mut driver = PipelineDriver::new(config);
    match driver.run().await {
        Ok(report) => {
            println!();
            println!(
                "{}",
                format!(
                    "Pipeline completed successfully in {:.2}s",
                    report.duration.as_secs_f64()
                )
                .green()
            );

            if report.scan_skipped {
                println!(
                    "  {} {}",
                    "⚠".yellow(),
                    "security scan was skipped (scanner unavailable)".yellow()
                );
            }

            if verbose {
                println!();
                println!("{}:", "Stage attempts".bold());
                for (stage, attempts) in &report.stage_attempts {
                    println!("  - {}: {}", stage, attempts);
                }
            }

            Ok(())
        }
        Err(e) => {
            println!();
            println!("{}", "Pipeline aborted".red().bold());
            Err(e.into())
        }
    }
}

/// Print the fixed stage sequence with the configured commands
fn print_plan(config: &PipelineConfig) {
    println!();
    println!("{}: {}", "Pipeline".bold(), config.name);
    println!("{}", "═".repeat(50));
    println!("Stage plan:");
    println!();

    let sequence = [
        ("plan", config.commands.plan.as_str()),
        ("build", config.commands.build.as_str()),
        ("test", config.commands.test.as_str()),
        ("monitor", config.commands.monitor.as_str()),
        ("scan", config.image.as_str()),
        ("deploy", config.commands.deploy.as_str()),
    ];

    for (i, (stage, detail)) in sequence.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            stage.bold(),
            format!("({})", detail).dimmed()
        );
    }

    println!(
        "     {} {}",
        "rollback (on closed gate):".dimmed(),
        config.commands.rollback.dimmed()
    );
    println!();
}
