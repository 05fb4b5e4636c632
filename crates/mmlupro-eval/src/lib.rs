//! Multi-run MMLU-Pro evaluation
//!
//! This crate provides:
//! - External harness invocation and score extraction
//! - Multi-run aggregation (mean and sample standard deviation per task)
//! - JSON and Markdown reports
//! - Offline scoring of saved completions

pub mod aggregate;
pub mod config;
pub mod harness;
pub mod report;
pub mod score;

pub use aggregate::{
    aggregate, AggregateError, AggregatedStats, MultiRunOutcome, RunScores, TaskStats,
};
pub use config::{GenerationSettings, HarnessConfig, Profile};
pub use harness::{extract_scores, HarnessError, HarnessRunner, RunRequest};
pub use report::{BenchmarkResult, EvaluationReport, MultiRunReport, RunConfiguration};
pub use score::{load_samples, score_completions, CompletionSample, ScoreSummary};

use mmlupro_core::detect::{FORCE_THINKING_VAR, MODEL_NAME_VAR, MODEL_PATH_VAR, PRETRAINED_VAR};
use mmlupro_core::{detect, Detection, ModelSignal};
use std::collections::HashMap;

/// Detection as the harness child will see it
///
/// Starts from this process's environment and applies the variables the
/// runner exports to the child.
pub fn child_detection(runner: &HarnessRunner) -> Detection {
    let keys = [MODEL_NAME_VAR, MODEL_PATH_VAR, PRETRAINED_VAR, FORCE_THINKING_VAR];
    let mut vars: HashMap<String, String> = keys
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
        .collect();
    for (key, value) in runner.envs() {
        vars.insert(key.clone(), value.clone());
    }
    detect(&ModelSignal::from_vars(&vars))
}

/// Build the configuration block echoed into the report
pub fn run_configuration(
    profile: Profile,
    request: &RunRequest,
    runs: usize,
    detection: &Detection,
) -> RunConfiguration {
    let mut configuration = RunConfiguration {
        model: request.model_args.clone(),
        task: request.task.clone(),
        num_fewshot: request.num_fewshot,
        runs,
        force_thinking: None,
        model_version: None,
        system_prompt_support: None,
        forced_thinking: None,
    };

    match profile {
        Profile::Standard => {
            configuration.force_thinking = Some(detection.should_force_directive);
        }
        Profile::R1_0528 => {
            configuration.model_version = Some("DeepSeek-R1-0528".to_string());
            configuration.system_prompt_support = Some(detection.supports_system_prompt());
            configuration.forced_thinking = Some(detection.should_force_directive);
        }
    }

    configuration
}
