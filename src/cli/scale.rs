// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Scale command - standalone replica adjustment

use colored::Colorize;
use miette::Result;
use std::sync::Arc;

use crate::exec::ProcessRunner;
use crate::scale::{Autoscaler, CLUSTER_BIN};
use crate::utils::create_spinner;

/// Run the scale command
pub async fn run(deployment: String, verbose: bool) -> Result<()> {
    if which::which(CLUSTER_BIN).is_err() {
        return Err(crate::ShipflowError::command_not_found(CLUSTER_BIN).into());
    }

    let spinner = create_spinner(&format!("Reading CPU usage for {}...", deployment));

    let scaler = Autoscaler::new(Arc::new(ProcessRunner::new()));
    let result = scaler.apply(&deployment).await;

    spinner.finish_and_clear();

    let replicas = result.map_err(miette::Report::from)?;

    println!(
        "  {} Scaled deployment {} to {} replica(s)",
        "✓".green(),
        deployment.bold(),
        replicas
    );

    if verbose {
        println!();
        println!(
            "{}",
            format!("Cluster client: {}", CLUSTER_BIN).dimmed()
        );
    }

    Ok(())
}
