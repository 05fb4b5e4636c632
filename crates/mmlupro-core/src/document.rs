//! MMLU-Pro documents and subject filtering

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Answer letters, in option order. Option `i` is labelled `CHOICES[i]`.
pub const CHOICES: [char; 10] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J'];

/// The fourteen MMLU-Pro categories
pub const SUBJECTS: [&str; 14] = [
    "biology",
    "business",
    "chemistry",
    "computer science",
    "economics",
    "engineering",
    "health",
    "history",
    "law",
    "math",
    "other",
    "philosophy",
    "physics",
    "psychology",
];

/// Errors that can occur when validating a document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Document has an empty question")]
    EmptyQuestion,
    #[error("Document has no options")]
    NoOptions,
    #[error("Invalid answer letter: {0:?} (expected a single letter A-J)")]
    InvalidAnswer(String),
    #[error("Answer {letter} is beyond the {option_count} available options")]
    AnswerOutOfRange { letter: char, option_count: usize },
}

/// One MMLU-Pro question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Dataset identifier, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<u64>,
    /// Question text
    pub question: String,
    /// Answer options; index 0 is labelled "A"
    pub options: Vec<String>,
    /// Worked chain-of-thought answer (validation split only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cot_content: Option<String>,
    /// Gold answer letter
    pub answer: String,
    /// Gold answer as an option index, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_index: Option<usize>,
    /// Subject category
    pub category: String,
    /// Upstream source of the question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

impl Document {
    /// Create a document with the required fields only
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        answer: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            question_id: None,
            question: question.into(),
            options,
            cot_content: None,
            answer: answer.into(),
            answer_index: None,
            category: category.into(),
            src: None,
        }
    }

    /// Attach a chain-of-thought answer
    pub fn with_cot(mut self, cot_content: impl Into<String>) -> Self {
        self.cot_content = Some(cot_content.into());
        self
    }

    /// Check the fields the prompt formatter and extractor rely on
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.question.trim().is_empty() {
            return Err(DocumentError::EmptyQuestion);
        }
        if self.options.is_empty() {
            return Err(DocumentError::NoOptions);
        }
        let letter = self.answer_letter()?;
        let option_count = self.lettered_option_count();
        if !CHOICES[..option_count].contains(&letter) {
            return Err(DocumentError::AnswerOutOfRange {
                letter,
                option_count,
            });
        }
        Ok(())
    }

    /// The gold answer as an upper-case letter
    pub fn answer_letter(&self) -> Result<char, DocumentError> {
        let trimmed = self.answer.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if CHOICES.contains(&c.to_ascii_uppercase()) => {
                Ok(c.to_ascii_uppercase())
            }
            _ => Err(DocumentError::InvalidAnswer(self.answer.clone())),
        }
    }

    /// Number of options that get a letter (at most ten)
    pub fn lettered_option_count(&self) -> usize {
        self.options.len().min(CHOICES.len())
    }
}

/// Whether a subject uses the boxed-answer math prompt
pub fn is_math_subject(subject: &str) -> bool {
    subject.eq_ignore_ascii_case("math")
}

/// Keep only the documents of one category
pub fn filter_by_subject(documents: &[Document], subject: &str) -> Vec<Document> {
    documents
        .iter()
        .filter(|doc| doc.category == subject)
        .cloned()
        .collect()
}

/// Load and validate documents from a JSONL file
///
/// Blank lines are skipped. Parse and validation errors report the
/// 1-based line number.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open document file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut documents = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let doc: Document = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse document on line {}", idx + 1))?;
        doc.validate()
            .with_context(|| format!("Invalid document on line {}", idx + 1))?;
        documents.push(doc);
    }

    Ok(documents)
}
