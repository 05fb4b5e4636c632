//! Offline scoring of saved completions

use crate::report::BenchmarkResult;
use anyhow::{Context, Result};
use mmlupro_core::{AnswerExtractor, Document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A document together with the model's completion for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSample {
    #[serde(flatten)]
    pub document: Document,
    pub completion: String,
}

/// Per-category and overall accuracy for a set of completions
#[derive(Debug, Clone)]
pub struct ScoreSummary {
    pub overall: BenchmarkResult,
    /// One entry per category, sorted by name
    pub by_category: Vec<BenchmarkResult>,
    /// Completions where no letter could be extracted
    pub extraction_misses: usize,
}

/// Load samples from a JSONL file
///
/// Each line holds the document fields plus a `completion` string.
pub fn load_samples(path: &Path) -> Result<Vec<CompletionSample>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open completions file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let sample: CompletionSample = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse sample on line {}", idx + 1))?;
        sample
            .document
            .validate()
            .with_context(|| format!("Invalid document on line {}", idx + 1))?;
        samples.push(sample);
    }

    Ok(samples)
}

#[derive(Default)]
struct Tally {
    total: usize,
    correct: usize,
    misses: usize,
}

impl Tally {
    fn into_result(self, name: &str) -> BenchmarkResult {
        let mut metadata = Map::new();
        metadata.insert("benchmark".to_string(), Value::String("MMLU-Pro".to_string()));
        metadata.insert(
            "extraction_misses".to_string(),
            Value::Number(serde_json::Number::from(self.misses)),
        );
        BenchmarkResult::new(name.to_string(), self.total, self.correct, Value::Object(metadata))
    }
}

/// Extract and score every completion
///
/// Each sample is scored with an extractor restricted to its own option
/// count.
pub fn score_completions(samples: &[CompletionSample]) -> Result<ScoreSummary> {
    let mut extractors: HashMap<usize, AnswerExtractor> = HashMap::new();
    let mut overall = Tally::default();
    let mut categories: BTreeMap<String, Tally> = BTreeMap::new();

    for sample in samples {
        let option_count = sample.document.lettered_option_count();
        let extractor = match extractors.entry(option_count) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(AnswerExtractor::for_options(option_count)?)
            }
        };

        let verdict = extractor.extract_and_score(&sample.completion, &sample.document.answer);
        let category = categories
            .entry(sample.document.category.clone())
            .or_default();

        for tally in [&mut overall, category] {
            tally.total += 1;
            if verdict.is_correct {
                tally.correct += 1;
            }
            if verdict.extracted_letter.is_none() {
                tally.misses += 1;
            }
        }
    }

    let extraction_misses = overall.misses;
    Ok(ScoreSummary {
        overall: overall.into_result("overall"),
        by_category: categories
            .into_iter()
            .map(|(name, tally)| tally.into_result(&name))
            .collect(),
        extraction_misses,
    })
}
