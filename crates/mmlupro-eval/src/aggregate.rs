//! Multi-run aggregation of per-task accuracy

use crate::harness::HarnessError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, warn};

/// Accuracy per task for one run
pub type RunScores = BTreeMap<String, f64>;

/// Statistics per task across runs
pub type AggregatedStats = BTreeMap<String, TaskStats>;

/// Errors that end an aggregation session
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("No successful runs completed ({attempted} attempted)")]
    NoSuccessfulRuns { attempted: usize },
}

/// Mean and spread of one task's scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub mean: f64,
    /// Sample standard deviation; 0 for a single run
    pub std: f64,
    /// Number of runs that reported this task
    pub runs: usize,
    /// Scores in run order
    pub individual_scores: Vec<f64>,
}

impl TaskStats {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        Self {
            mean: mean(&scores),
            std: sample_std(&scores),
            runs: scores.len(),
            individual_scores: scores,
        }
    }
}

/// Result of a full aggregation session
#[derive(Debug, Clone, PartialEq)]
pub struct MultiRunOutcome {
    pub averaged_results: AggregatedStats,
    /// Scores of the successful runs, in run order
    pub individual_runs: Vec<RunScores>,
    pub attempted: usize,
    pub failed: usize,
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 below two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Fold per-run scores into per-task statistics
///
/// A run that did not report a task contributes nothing to it.
pub fn compute_average_results(runs: &[RunScores]) -> AggregatedStats {
    let tasks: BTreeSet<&String> = runs.iter().flat_map(|run| run.keys()).collect();

    tasks
        .into_iter()
        .map(|task| {
            let scores: Vec<f64> = runs.iter().filter_map(|run| run.get(task).copied()).collect();
            (task.clone(), TaskStats::from_scores(scores))
        })
        .collect()
}

/// Invoke `invoke` `run_count` times in sequence and aggregate the results
///
/// Failed runs are logged and skipped. Fails only when no run succeeds.
pub fn aggregate<F>(run_count: usize, mut invoke: F) -> Result<MultiRunOutcome, AggregateError>
where
    F: FnMut(usize) -> Result<RunScores, HarnessError>,
{
    let mut individual_runs = Vec::with_capacity(run_count);
    let mut failed = 0;

    for run_idx in 0..run_count {
        info!("Run {}/{}", run_idx + 1, run_count);
        match invoke(run_idx) {
            Ok(scores) => {
                info!(
                    "Run {} completed with {} task scores",
                    run_idx + 1,
                    scores.len()
                );
                individual_runs.push(scores);
            }
            Err(e) => {
                warn!("Run {} failed: {}", run_idx + 1, e);
                failed += 1;
            }
        }
    }

    if individual_runs.is_empty() {
        return Err(AggregateError::NoSuccessfulRuns {
            attempted: run_count,
        });
    }

    Ok(MultiRunOutcome {
        averaged_results: compute_average_results(&individual_runs),
        individual_runs,
        attempted: run_count,
        failed,
    })
}
