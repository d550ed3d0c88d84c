// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Post-deploy replica estimation
//!
//! A toy stand-in for a real autoscaler: fit a least-squares line over a
//! fixed CPU-to-replica history, read current pod CPU from `kubectl top
//! pods`, and apply the rounded prediction with `kubectl scale`.

use std::sync::Arc;

use crate::errors::ShipflowError;
use crate::exec::{CommandRunner, CommandSpec};

/// Cluster client binary name
pub const CLUSTER_BIN: &str = "kubectl";

/// Fixed (cpu millicores, replicas) observations the model is fit on
const CPU_HISTORY: [(f64, f64); 5] = [
    (50.0, 1.0),
    (100.0, 2.0),
    (200.0, 3.0),
    (300.0, 4.0),
    (400.0, 5.0),
];

/// Linear CPU-to-replica model
#[derive(Debug, Clone, Copy)]
pub struct ReplicaModel {
    slope: f64,
    intercept: f64,
}

impl ReplicaModel {
    /// Closed-form least-squares fit
    pub fn fit(samples: &[(f64, f64)]) -> Self {
        let n = samples.len() as f64;
        let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;

        let sxy: f64 = samples
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        let sxx: f64 = samples.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();

        let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
        Self {
            slope,
            intercept: mean_y - slope * mean_x,
        }
    }

    /// Model fit on the fixed history
    pub fn from_history() -> Self {
        Self::fit(&CPU_HISTORY)
    }

    /// Predicted replica count for a CPU reading, clamped to at least 1
    pub fn predict(&self, cpu_millicores: f64) -> u32 {
        let predicted = (self.intercept + self.slope * cpu_millicores).round();
        (predicted.max(1.0)) as u32
    }
}

/// Extract millicore readings from `kubectl top pods` output for pods whose
/// name contains the deployment name.
pub fn parse_millicores(output: &str, deployment: &str) -> Vec<u32> {
    output
        .lines()
        .filter(|line| line.contains(deployment))
        .filter_map(|line| {
            let cpu = line.split_whitespace().nth(1)?;
            cpu.strip_suffix('m')?.parse().ok()
        })
        .collect()
}

/// Average of the readings; 0 when no pods matched
pub fn average_millicores(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<u32>() as f64 / samples.len() as f64
}

/// Applies the replica adjustment through the cluster client
pub struct Autoscaler {
    runner: Arc<dyn CommandRunner>,
}

impl Autoscaler {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Read current CPU, predict, and scale. Returns the applied count.
    pub async fn apply(&self, deployment: &str) -> Result<u32, ShipflowError> {
        let top = self
            .runner
            .run(&CommandSpec::new("scale", CLUSTER_BIN, &["top", "pods"]))
            .await?;

        let samples = parse_millicores(&top.combined_output(), deployment);
        let cpu = average_millicores(&samples);
        let replicas = ReplicaModel::from_history().predict(cpu);

        let replicas_arg = format!("--replicas={}", replicas);
        self.runner
            .run(&CommandSpec::new(
                "scale",
                CLUSTER_BIN,
                &["scale", "deployment", deployment, &replicas_arg],
            ))
            .await?;

        Ok(replicas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;

    #[test]
    fn test_fit_recovers_trend() {
        let model = ReplicaModel::from_history();

        // The fixed history is close to linear; spot-check the fit
        assert_eq!(model.predict(200.0), 3);
        assert_eq!(model.predict(400.0), 5);
    }

    #[test]
    fn test_predict_clamps_to_one() {
        let model = ReplicaModel::from_history();
        assert_eq!(model.predict(0.0), 1);
    }

    #[test]
    fn test_parse_millicores_filters_by_deployment() {
        let output = "NAME                      CPU(cores)   MEMORY(bytes)\n\
                      flask-webapp1-abc123      150m         120Mi\n\
                      flask-webapp1-def456      250m         118Mi\n\
                      other-service-xyz         900m         300Mi\n";

        let samples = parse_millicores(output, "flask-webapp1");
        assert_eq!(samples, vec![150, 250]);
        assert_eq!(average_millicores(&samples), 200.0);
    }

    #[test]
    fn test_no_matching_pods_averages_zero() {
        assert_eq!(average_millicores(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_apply_scales_to_prediction() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok(
            "scale",
            0,
            "NAME            CPU(cores)   MEMORY(bytes)\nwebapp-1   200m   100Mi\n",
        );
        runner.ok("scale", 0, "deployment.apps/webapp scaled\n");

        let scaler = Autoscaler::new(runner.clone());
        let replicas = scaler.apply("webapp").await.unwrap();

        assert_eq!(replicas, 3);
        let calls = runner.calls();
        assert_eq!(calls.iter().filter(|c| *c == "scale").count(), 2);
    }
}
