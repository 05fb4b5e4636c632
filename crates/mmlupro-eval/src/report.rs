//! Report generation for evaluation results

use crate::aggregate::{AggregatedStats, MultiRunOutcome, RunScores};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Accuracy on one slice of scored completions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Name of the slice (e.g., "overall", "law", "math")
    pub benchmark_name: String,
    /// Total number of samples evaluated
    pub total_samples: usize,
    /// Number of correct predictions
    pub correct: usize,
    /// Accuracy score (correct / total_samples)
    pub score: f32,
    /// Additional metadata (slice-specific)
    pub metadata: serde_json::Value,
}

impl BenchmarkResult {
    /// Create a new benchmark result
    pub fn new(
        benchmark_name: String,
        total_samples: usize,
        correct: usize,
        metadata: serde_json::Value,
    ) -> Self {
        let score = if total_samples > 0 {
            correct as f32 / total_samples as f32
        } else {
            0.0
        };

        Self {
            benchmark_name,
            total_samples,
            correct,
            score,
            metadata,
        }
    }

    /// Completions in this slice with no extractable letter, when recorded
    pub fn extraction_misses(&self) -> Option<u64> {
        self.metadata.get("extraction_misses")?.as_u64()
    }
}

/// Offline scoring report over several slices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// All slice results
    pub benchmarks: Vec<BenchmarkResult>,
    /// Unweighted mean of the slice scores
    pub average_score: f32,
    /// Timestamp of evaluation
    pub timestamp: String,
}

impl EvaluationReport {
    /// Generate a report from slice results
    pub fn generate_report(results: &[BenchmarkResult]) -> Self {
        let average_score = if !results.is_empty() {
            results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32
        } else {
            0.0
        };

        Self {
            benchmarks: results.to_vec(),
            average_score,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Format report as markdown
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Scoring Report\n\n");
        md.push_str(&format!("**Timestamp**: {}\n\n", self.timestamp));
        md.push_str(&format!(
            "**Average Score**: {:.2}%\n\n",
            self.average_score * 100.0
        ));
        md.push_str("| Slice | Samples | Correct | Score | No answer |\n");
        md.push_str("|-------|---------|---------|-------|-----------|\n");

        for result in &self.benchmarks {
            let misses = result
                .extraction_misses()
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            md.push_str(&format!(
                "| {} | {} | {} | {:.2}% | {} |\n",
                result.benchmark_name,
                result.total_samples,
                result.correct,
                result.score * 100.0,
                misses
            ));
        }

        md
    }
}

/// Run parameters echoed into the multi-run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub model: String,
    pub task: String,
    pub num_fewshot: usize,
    pub runs: usize,
    /// Directive decision for the standard profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_thinking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_support: Option<bool>,
    /// Directive decision for the R1-0528 profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_thinking: Option<bool>,
}

/// Aggregated output of a multi-run session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiRunReport {
    pub configuration: RunConfiguration,
    pub averaged_results: AggregatedStats,
    pub individual_runs: Vec<RunScores>,
    pub timestamp: String,
}

impl MultiRunReport {
    pub fn new(configuration: RunConfiguration, outcome: MultiRunOutcome) -> Self {
        Self {
            configuration,
            averaged_results: outcome.averaged_results,
            individual_runs: outcome.individual_runs,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// One `task: mean ± std (n=runs)` line per task
    pub fn summary_lines(&self) -> Vec<String> {
        self.averaged_results
            .iter()
            .map(|(task, stats)| {
                format!(
                    "{}: {:.4} ± {:.4} (n={})",
                    task, stats.mean, stats.std, stats.runs
                )
            })
            .collect()
    }

    /// Format report as markdown
    pub fn to_markdown(&self) -> String {
        let config = &self.configuration;
        let mut md = String::new();
        md.push_str("# Multi-Run Evaluation Report\n\n");
        md.push_str(&format!("**Timestamp**: {}\n\n", self.timestamp));
        md.push_str(&format!("**Model**: {}\n\n", config.model));
        md.push_str(&format!(
            "**Task**: {} ({}-shot, {} runs requested, {} succeeded)\n\n",
            config.task,
            config.num_fewshot,
            config.runs,
            self.individual_runs.len()
        ));
        md.push_str("| Task | Mean | Std | Runs | Scores |\n");
        md.push_str("|------|------|-----|------|--------|\n");

        for (task, stats) in &self.averaged_results {
            let scores: Vec<String> = stats
                .individual_scores
                .iter()
                .map(|s| format!("{:.4}", s))
                .collect();
            md.push_str(&format!(
                "| {} | {:.4} | {:.4} | {} | {} |\n",
                task,
                stats.mean,
                stats.std,
                stats.runs,
                scores.join(", ")
            ));
        }

        md
    }

    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(())
    }

    /// Write the Markdown rendering
    pub fn save_markdown(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_markdown())
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(())
    }
}
