//! Core logic for MMLU-Pro evaluation
//!
//! This crate provides:
//! - Document loading and per-subject filtering
//! - Model-family detection for DeepSeek-R1 style reasoning models
//! - Prompt rendering and few-shot context building
//! - Answer-letter extraction from model completions
//!
//! # Example
//!
//! ```
//! use mmlupro_core::{detect, render, AnswerExtractor, Document, FormattingFlags, ModelSignal};
//!
//! let doc = Document::new("What is 2 + 2?", vec!["3".into(), "4".into()], "B", "math");
//! let detection = detect(&ModelSignal::new("deepseek-r1-0528", "", ""));
//!
//! let flags = FormattingFlags::target(true, detection.should_force_directive);
//! let prompt = render(&doc, flags).expect("valid document");
//! assert!(prompt.starts_with("Question:\nWhat is 2 + 2?"));
//!
//! let extractor = AnswerExtractor::for_document(&doc).expect("cascade compiles");
//! let verdict = extractor.extract_and_score("So the answer is (B).", &doc.answer);
//! assert!(verdict.is_correct);
//! ```

pub mod detect;
pub mod document;
pub mod extract;
pub mod prompt;

pub use detect::{detect, parse_bool_flag, Detection, ModelFamily, ModelSignal};
pub use document::{
    filter_by_subject, is_math_subject, load_documents, Document, DocumentError, CHOICES,
    SUBJECTS,
};
pub use extract::{extract_and_score, AnswerExtractor, ExtractionResult, MatchMode};
pub use prompt::{
    default_description, render, ChatPrompt, FewShotContext, FormattingFlags, PromptError,
};
