//! Harness configuration and evaluation profiles
//!
//! The harness command line can be loaded from a JSON file so that a
//! different launcher (a virtualenv python, a wrapper script) can stand in
//! for the default `python -m lm_eval`.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How to launch the external evaluation harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Executable to run
    pub program: String,
    /// Arguments placed before the generated ones
    pub base_args: Vec<String>,
    /// Value for `--batch_size`
    pub batch_size: String,
    /// Directory passed as `--output_path`; reused by every run
    pub output_dir: PathBuf,
    /// Arguments appended after the generated ones
    pub extra_args: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            base_args: vec!["-m".to_string(), "lm_eval".to_string()],
            batch_size: "auto".to_string(),
            output_dir: PathBuf::from("temp_results"),
            extra_args: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a JSON file
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Example
    /// ```no_run
    /// use mmlupro_eval::config::HarnessConfig;
    /// use std::path::Path;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = HarnessConfig::from_file(Path::new("harness.json"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: HarnessConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Where a successful run leaves its results
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("results.json")
    }
}

/// Sampling settings handed to the harness as `--gen_kwargs`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub do_sample: bool,
}

impl GenerationSettings {
    /// Render in the harness's `key=value,...` form
    pub fn to_gen_kwargs(&self) -> String {
        let do_sample = if self.do_sample { "True" } else { "False" };
        format!("temperature={},do_sample={}", self.temperature, do_sample)
    }
}

/// Evaluation flavour
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Plain MMLU-Pro
    #[default]
    Standard,
    /// MMLU-Pro tuned for DeepSeek-R1-0528
    #[value(name = "r1-0528")]
    #[serde(rename = "r1-0528")]
    R1_0528,
}

impl Profile {
    pub fn default_task(&self) -> &'static str {
        match self {
            Profile::Standard => "mmlu_pro",
            Profile::R1_0528 => "mmlu_pro_r1_0528",
        }
    }

    pub fn default_output(&self) -> PathBuf {
        match self {
            Profile::Standard => PathBuf::from("mmlu_pro_multi_run_results.json"),
            Profile::R1_0528 => PathBuf::from("mmlu_pro_r1_0528_multi_run_results.json"),
        }
    }

    /// Model name exported to the harness by `--set-model-name`
    pub fn model_name_hint(&self) -> &'static str {
        match self {
            Profile::Standard => "deepseek-r1",
            Profile::R1_0528 => "deepseek-r1-0528",
        }
    }

    /// Label shown in headings
    pub fn display_name(&self) -> &'static str {
        match self {
            Profile::Standard => "MMLU Pro",
            Profile::R1_0528 => "MMLU Pro (DeepSeek-R1-0528)",
        }
    }

    pub fn generation(&self) -> Option<GenerationSettings> {
        match self {
            Profile::Standard => None,
            Profile::R1_0528 => Some(GenerationSettings {
                temperature: 0.6,
                do_sample: true,
            }),
        }
    }

    pub fn system_prompt(&self) -> Option<&'static str> {
        match self {
            Profile::Standard => None,
            Profile::R1_0528 => Some("You are an expert in multiple-choice questions."),
        }
    }
}
