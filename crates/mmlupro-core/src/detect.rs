//! Model-family detection
//!
//! Decides whether a model belongs to the legacy DeepSeek-R1 line (which
//! needs the `<think>` directive forced into prompts and ignores system
//! prompts), the R1-0528 release (which does neither), or anything else.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Environment variable holding the model's display name
pub const MODEL_NAME_VAR: &str = "MODEL_NAME";
/// Environment variable holding the model's weight path
pub const MODEL_PATH_VAR: &str = "MODEL_PATH";
/// Environment variable holding the pretrained-model identifier
pub const PRETRAINED_VAR: &str = "PRETRAINED";
/// Environment variable overriding the directive decision
pub const FORCE_THINKING_VAR: &str = "FORCE_THINKING";

/// Markers of the R1-0528 release
const MODERN_MARKERS: [&str; 4] = ["deepseek-r1-0528", "deepseek_r1_0528", "r1-0528", "r1_0528"];
/// Markers of the R1 family in general
const FAMILY_MARKERS: [&str; 2] = ["deepseek-r1", "deepseek_r1"];
/// Release tag that excludes a source from the legacy match
const MODERN_RELEASE_TAG: &str = "0528";

/// Identity signals for the model under evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSignal {
    /// Lower-cased model name ("" when unset)
    pub model_name: String,
    /// Lower-cased model path ("" when unset)
    pub model_path: String,
    /// Lower-cased pretrained-model identifier ("" when unset)
    pub pretrained: String,
    /// Explicit directive override
    pub force_thinking: Option<bool>,
}

impl ModelSignal {
    /// Build a signal from raw identity strings
    pub fn new(model_name: &str, model_path: &str, pretrained: &str) -> Self {
        Self {
            model_name: model_name.to_lowercase(),
            model_path: model_path.to_lowercase(),
            pretrained: pretrained.to_lowercase(),
            force_thinking: None,
        }
    }

    /// Set the explicit override
    pub fn with_force_thinking(mut self, force: Option<bool>) -> Self {
        self.force_thinking = force;
        self
    }

    /// Snapshot the current process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a signal from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).unwrap_or_default();
        let force_thinking = lookup(FORCE_THINKING_VAR).and_then(|raw| {
            let parsed = parse_bool_flag(&raw);
            if parsed.is_none() {
                warn!(
                    "Ignoring unrecognised {} value {:?}",
                    FORCE_THINKING_VAR, raw
                );
            }
            parsed
        });

        Self::new(
            &read(MODEL_NAME_VAR),
            &read(MODEL_PATH_VAR),
            &read(PRETRAINED_VAR),
        )
        .with_force_thinking(force_thinking)
    }

    fn sources(&self) -> [&str; 3] {
        [&self.model_name, &self.model_path, &self.pretrained]
    }
}

/// Parse the truthy/falsy string forms accepted for overrides
pub fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Model family classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    ModernReasoning,
    LegacyReasoning,
    Other,
}

/// Detector verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub is_modern_reasoning: bool,
    pub is_legacy_reasoning: bool,
    pub should_force_directive: bool,
}

impl Detection {
    pub fn family(&self) -> ModelFamily {
        if self.is_modern_reasoning {
            ModelFamily::ModernReasoning
        } else if self.is_legacy_reasoning {
            ModelFamily::LegacyReasoning
        } else {
            ModelFamily::Other
        }
    }

    /// Legacy R1 models are prompted without a system message
    pub fn supports_system_prompt(&self) -> bool {
        self.family() != ModelFamily::LegacyReasoning
    }
}

fn is_modern_source(source: &str) -> bool {
    MODERN_MARKERS.iter().any(|marker| source.contains(marker))
}

fn is_legacy_source(source: &str) -> bool {
    FAMILY_MARKERS.iter().any(|marker| source.contains(marker))
        && !source.contains(MODERN_RELEASE_TAG)
}

/// Classify the model and decide on the forced directive
pub fn detect(signal: &ModelSignal) -> Detection {
    let sources = signal.sources();
    let is_modern_reasoning = sources.iter().any(|s| is_modern_source(s));
    let is_legacy_reasoning = sources.iter().any(|s| is_legacy_source(s));

    let should_force_directive = match signal.force_thinking {
        Some(force) => force,
        None if is_modern_reasoning => false,
        None => is_legacy_reasoning,
    };

    Detection {
        is_modern_reasoning,
        is_legacy_reasoning,
        should_force_directive,
    }
}
