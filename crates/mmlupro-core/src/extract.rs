//! Answer extraction from free-form completions
//!
//! The extractor runs an ordered table of patterns over the completion. The
//! first pattern that yields a letter wins. Each pattern either takes its
//! first match in the text or its last one, so the table encodes both which
//! phrasing is trusted most and which occurrence of it counts.

use crate::document::{Document, CHOICES};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Which occurrence of a pattern is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    First,
    Last,
}

/// One step of the extraction cascade
#[derive(Debug, Clone)]
pub struct AnswerPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub mode: MatchMode,
}

impl AnswerPattern {
    fn find(&self, text: &str) -> Option<char> {
        let mut captures = self.regex.captures_iter(text);
        let caps = match self.mode {
            MatchMode::First => captures.next(),
            MatchMode::Last => captures.last(),
        }?;
        caps.get(1)?.as_str().chars().next()
    }
}

/// Verdict for one completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub extracted_letter: Option<char>,
    pub is_correct: bool,
    /// Name of the cascade step that produced the letter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<&'static str>,
}

/// Pattern table templates; `{L}` is replaced by the allowed letter class.
///
/// The letter in the case-insensitive phrase patterns must be closed by `)`
/// or a word boundary, so "answer is clearly" does not yield `C`.
const CASCADE: [(&str, &str, MatchMode); 6] = [
    ("answer_is_parenthesized", r"(?i)answer is \(({L})\)", MatchMode::First),
    ("upper_answer_colon", r"(?i)ANSWER:\s*\(?({L})(?:\)|\b)", MatchMode::First),
    ("answer_colon", r"(?i)answer:\s*\(?({L})(?:\)|\b)", MatchMode::First),
    ("the_answer_is", r"(?i)(?:the )?answer is\s*\(?({L})(?:\)|\b)", MatchMode::First),
    ("last_parenthesized", r"(?i)\(({L})\)", MatchMode::Last),
    ("last_standalone", r"\b({L})\b", MatchMode::Last),
];

/// Compiled extraction cascade for a fixed option count
#[derive(Debug, Clone)]
pub struct AnswerExtractor {
    patterns: Vec<AnswerPattern>,
    letters: Vec<char>,
}

impl AnswerExtractor {
    /// Extractor accepting the first `option_count` letters (clamped to 1..=10)
    pub fn for_options(option_count: usize) -> Result<Self, regex::Error> {
        let letters: Vec<char> = CHOICES[..option_count.clamp(1, CHOICES.len())].to_vec();
        let class = format!("[{}]", letters.iter().collect::<String>());

        let patterns = CASCADE
            .iter()
            .map(|&(name, template, mode)| {
                Ok(AnswerPattern {
                    name,
                    regex: Regex::new(&template.replace("{L}", &class))?,
                    mode,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { patterns, letters })
    }

    /// Extractor for the full ten-letter alphabet
    pub fn new() -> Result<Self, regex::Error> {
        Self::for_options(CHOICES.len())
    }

    /// Extractor restricted to the letters a document actually uses
    pub fn for_document(doc: &Document) -> Result<Self, regex::Error> {
        Self::for_options(doc.lettered_option_count())
    }

    /// Letters this extractor can return
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// The cascade in evaluation order
    pub fn patterns(&self) -> &[AnswerPattern] {
        &self.patterns
    }

    /// Recover the chosen letter and the cascade step that found it
    pub fn extract(&self, completion: &str) -> Option<(char, &'static str)> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .find(completion)
                .map(|letter| (letter.to_ascii_uppercase(), pattern.name))
        })
    }

    /// Extract a letter and compare it with the gold answer
    pub fn extract_and_score(&self, completion: &str, gold_letter: &str) -> ExtractionResult {
        let extracted = self.extract(completion);
        let gold = gold_letter.trim().to_uppercase();

        match extracted {
            Some((letter, name)) => {
                debug!("Extracted {} via {}", letter, name);
                ExtractionResult {
                    extracted_letter: Some(letter),
                    is_correct: letter.to_string() == gold,
                    matched_by: Some(name),
                }
            }
            None => {
                debug!("No answer letter found in completion");
                ExtractionResult {
                    extracted_letter: None,
                    is_correct: false,
                    matched_by: None,
                }
            }
        }
    }
}

/// One-shot extraction over the full alphabet
pub fn extract_and_score(
    completion: &str,
    gold_letter: &str,
) -> Result<ExtractionResult, regex::Error> {
    Ok(AnswerExtractor::new()?.extract_and_score(completion, gold_letter))
}
