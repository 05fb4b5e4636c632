//! External evaluation harness invocation
//!
//! Each run launches the harness as a child process, waits for it to exit,
//! then reads `results.json` from the configured output directory. The
//! directory is shared between runs, so runs must not overlap.

use crate::aggregate::RunScores;
use crate::config::HarnessConfig;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, info};

/// Ways a single harness run can fail
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to launch harness `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Harness exited with {status}: {stderr}")]
    NonZeroExit {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    #[error("Results file not found: {0:?}")]
    MissingOutput(PathBuf),
    #[error("I/O error on results file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed results file {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What to evaluate in one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Model arguments passed through to the harness
    pub model_args: String,
    /// Task name
    pub task: String,
    /// Number of few-shot exemplars
    pub num_fewshot: usize,
    /// Sampling settings in `key=value,...` form
    pub gen_kwargs: Option<String>,
}

/// Launches the harness with a fixed configuration
#[derive(Debug, Clone)]
pub struct HarnessRunner {
    config: HarnessConfig,
    envs: BTreeMap<String, String>,
}

impl HarnessRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            envs: BTreeMap::new(),
        }
    }

    /// Set an environment variable on every child process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    /// Variables exported to the child, on top of the inherited environment
    pub fn envs(&self) -> &BTreeMap<String, String> {
        &self.envs
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Full argument list for a run, excluding the program itself
    pub fn args(&self, request: &RunRequest) -> Vec<String> {
        let mut args = self.config.base_args.clone();
        args.extend([
            "--model".to_string(),
            request.model_args.clone(),
            "--tasks".to_string(),
            request.task.clone(),
            "--num_fewshot".to_string(),
            request.num_fewshot.to_string(),
            "--batch_size".to_string(),
            self.config.batch_size.clone(),
            "--output_path".to_string(),
            self.config.output_dir.to_string_lossy().into_owned(),
        ]);
        if let Some(gen_kwargs) = &request.gen_kwargs {
            args.push("--gen_kwargs".to_string());
            args.push(gen_kwargs.clone());
        }
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    fn command(&self, request: &RunRequest) -> Command {
        let mut command = Command::new(&self.config.program);
        command.args(self.args(request)).envs(&self.envs);
        command
    }

    /// Run the harness once and collect its per-task scores
    pub fn run_once(&self, request: &RunRequest) -> Result<RunScores, HarnessError> {
        let results_path = self.config.results_path();

        // A failed run must not pick up the previous run's file.
        if results_path.exists() {
            std::fs::remove_file(&results_path).map_err(|source| HarnessError::Io {
                path: results_path.clone(),
                source,
            })?;
        }

        info!(
            "Launching {} for task {} ({}-shot)",
            self.config.program, request.task, request.num_fewshot
        );
        let output = self
            .command(request)
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HarnessError::NonZeroExit {
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        if !results_path.exists() {
            return Err(HarnessError::MissingOutput(results_path));
        }

        let content = std::fs::read_to_string(&results_path).map_err(|source| {
            HarnessError::Io {
                path: results_path.clone(),
                source,
            }
        })?;
        let results: Value = serde_json::from_str(&content).map_err(|source| {
            HarnessError::Malformed {
                path: results_path.clone(),
                source,
            }
        })?;

        let scores = extract_scores(&results);
        debug!("Harness reported {} task scores", scores.len());
        Ok(scores)
    }
}

/// Pull `exact_match` out of each task in a harness results document
///
/// Tasks without a numeric `exact_match` are left out; other metrics are
/// ignored.
pub fn extract_scores(results: &Value) -> RunScores {
    results
        .get("results")
        .and_then(|r| r.as_object())
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|(task, metrics)| {
                    let score = metrics.get("exact_match")?.as_f64()?;
                    Some((task.clone(), score))
                })
                .collect()
        })
        .unwrap_or_default()
}
