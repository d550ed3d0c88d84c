// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{ConfigValidator, PipelineConfig};

/// Run the validate command
pub async fn run(config_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline config...".bold());
    println!();

    // Check config exists
    if !config_path.exists() {
        return Err(miette::miette!(
            "Pipeline config not found: {}\n\n\
             Run 'shipflow init' to create one.",
            config_path.display()
        ));
    }

    // Load config
    let config = match PipelineConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  {} Failed to parse config", "✗".red());
            eprintln!();
            return Err(miette::miette!("Parse error: {}", e));
        }
    };

    println!("  {} Config file is valid YAML", "✓".green());

    // Validate structure
    let validation = ConfigValidator::validate(&config)?;

    let mut has_issues = false;

    if !validation.errors.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", config.name);
        println!("  Image: {}", config.image);
        println!("  Deployment: {}", config.deployment);
        println!("  Shell: {}", config.shell);
        println!(
            "  Limits: build timeout {}s, build retries {}, test retries {}, \
             test threshold {}, test delay {}s",
            config.limits.build_timeout_secs,
            config.limits.build_retries,
            config.limits.test_retries,
            config.limits.test_failure_threshold,
            config.limits.test_retry_delay_secs,
        );
        for (stage, command) in config.commands.iter() {
            println!("    - {}: {}", stage, command.dimmed());
        }
    }

    println!();

    if has_issues {
        if validation.is_valid() {
            println!("{}", "Config is valid but has warnings.".yellow().bold());
            Ok(())
        } else {
            Err(miette::miette!("Config validation failed"))
        }
    } else {
        println!("{}", "Config is valid!".green().bold());
        Ok(())
    }
}
