// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Failure-history anomaly tracking
//!
//! The history is an explicit value owned by the driver and handed to the
//! check, never process-global state.

/// Minimum samples before the outlier check activates
const MIN_SAMPLES: usize = 5;

/// Z-score above which the latest sample counts as anomalous
const Z_THRESHOLD: f64 = 2.0;

/// Rolling record of per-run failure counts
#[derive(Debug, Clone, Default)]
pub struct FailureHistory {
    samples: Vec<f64>,
}

impl FailureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure count observation
    pub fn record(&mut self, value: f64) {
        self.samples.push(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the latest sample is an outlier against the rest.
    ///
    /// Needs at least [`MIN_SAMPLES`] observations; with fewer there is no
    /// baseline to judge against.
    pub fn latest_is_anomalous(&self) -> bool {
        if self.samples.len() < MIN_SAMPLES {
            return false;
        }

        let (latest, rest) = self
            .samples
            .split_last()
            .expect("len checked above");

        let n = rest.len() as f64;
        let mean = rest.iter().sum::<f64>() / n;
        let variance = rest.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            return *latest != mean;
        }

        ((latest - mean) / std_dev).abs() > Z_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(values: &[f64]) -> FailureHistory {
        let mut h = FailureHistory::new();
        for v in values {
            h.record(*v);
        }
        h
    }

    #[test]
    fn test_too_few_samples_never_anomalous() {
        let h = history_of(&[0.0, 0.0, 50.0]);
        assert!(!h.latest_is_anomalous());
    }

    #[test]
    fn test_spike_is_anomalous() {
        let h = history_of(&[1.0, 2.0, 1.0, 2.0, 40.0]);
        assert!(h.latest_is_anomalous());
    }

    #[test]
    fn test_steady_history_is_not_anomalous() {
        let h = history_of(&[1.0, 2.0, 1.0, 2.0, 2.0]);
        assert!(!h.latest_is_anomalous());
    }

    #[test]
    fn test_flat_baseline_flags_any_change() {
        let h = history_of(&[0.0, 0.0, 0.0, 0.0, 3.0]);
        assert!(h.latest_is_anomalous());

        let h = history_of(&[0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(!h.latest_is_anomalous());
    }
}
