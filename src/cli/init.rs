// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Init command - scaffold a .shipflow.yaml

use colored::Colorize;
use miette::Result;
use std::path::Path;

/// Run the init command
pub async fn run(name: Option<String>, verbose: bool) -> Result<()> {
    let pipeline_name = name.unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "my-pipeline".to_string())
    });

    println!("{}", "Initializing shipflow pipeline...".bold());
    println!();

    if Path::new(".shipflow.yaml").exists() {
        return Err(miette::miette!(
            ".shipflow.yaml already exists. Remove it first to re-initialize."
        ));
    }

    let config_content = generate_default_config(&pipeline_name);

    std::fs::write(".shipflow.yaml", &config_content)
        .map_err(|e| miette::miette!("Failed to write .shipflow.yaml: {}", e))?;

    println!("  {} Created .shipflow.yaml", "✓".green());
    println!();
    println!("{}", "Pipeline initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to point at your commands", ".shipflow.yaml".cyan());
    println!("  2. Run {} to check the config", "shipflow validate".cyan());
    println!("  3. Run {} to execute the pipeline", "shipflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated config:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", config_content.dimmed());
    }

    Ok(())
}

fn generate_default_config(name: &str) -> String {
    format!(
        r#"# shipflow pipeline configuration
#
# Stages run in fixed order: plan, build, test, monitor, scan, deploy.
# The scan stage uses trivy on `image`; the post-deploy scaling step uses
# kubectl on `deployment`. Both are skipped with a warning if the binary
# is not installed.

version: "1"
name: "{name}"

image: "{name}:latest"
deployment: "{name}"

commands:
  plan: "python3 agents/analyze_requirements.py requirements.txt"
  build: "python3 agents/build_automation_agent.py logs/build_logs.txt"
  test: "python3 agents/testing_agent.py"
  monitor: "python3 agents/monitoring_alerting_agent.py logs/monitoring_logs.txt"
  deploy: "python3 agents/deployment_automation_agent.py"
  rollback: "bash scripts/rollback.sh"

# Defaults shown; uncomment to override.
# limits:
#   build_timeout_secs: 120
#   build_retries: 2
#   test_retries: 2
#   test_failure_threshold: 1
#   test_retry_delay_secs: 2
"#
    )
}
