//! Prompt rendering for MMLU-Pro questions
//!
//! Every question renders to the same block:
//!
//! ```text
//! Question:
//! <question>
//! Options:
//! A. <option>
//! ...
//! Answer: <clause>
//! ```
//!
//! The answer clause depends on [`FormattingFlags`]: a worked answer for
//! few-shot exemplars, the `<think>` directive for legacy reasoning models,
//! the boxed-answer instruction for math, or the plain step-by-step cue.

use crate::detect::Detection;
use crate::document::{Document, DocumentError, CHOICES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label the dataset puts in front of worked answers
pub const COT_DATASET_STEM: &str = "A: Let's think step by step.";
/// Label used in rendered prompts
pub const COT_PROMPT_STEM: &str = "Answer: Let's think step by step.";
/// Directive that forces a reasoning model into thinking mode
pub const THINK_DIRECTIVE: &str = "<think>\n";
/// Step-by-step cue for regular questions
pub const STEP_BY_STEP_INSTRUCTION: &str = "Let's think step by step.";
/// Step-by-step cue for math questions
pub const MATH_INSTRUCTION: &str =
    "Please reason step by step, and put your final answer within \\boxed{}. Let's think step by step.";

const ANSWER_PREFIX: &str = "Answer: ";

/// Errors that can occur while rendering a prompt
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Cannot render malformed document: {0}")]
    InvalidDocument(#[from] DocumentError),
    #[error("Few-shot exemplar has no chain-of-thought answer: {0:?}")]
    MissingCot(String),
}

/// Per-render formatting switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingFlags {
    /// Render the worked answer (few-shot exemplar)
    pub including_answer: bool,
    /// Use the boxed-answer math instruction
    pub is_math: bool,
    /// Emit the `<think>` directive instead of an instruction
    pub force_directive: bool,
}

impl FormattingFlags {
    /// Flags for a few-shot exemplar
    pub fn exemplar(is_math: bool) -> Self {
        Self {
            including_answer: true,
            is_math,
            force_directive: false,
        }
    }

    /// Flags for the question under test
    pub fn target(is_math: bool, force_directive: bool) -> Self {
        Self {
            including_answer: false,
            is_math,
            force_directive,
        }
    }
}

/// Render one document
pub fn render(doc: &Document, flags: FormattingFlags) -> Result<String, PromptError> {
    doc.validate()?;

    let mut prompt = String::from("Question:\n");
    prompt.push_str(&doc.question);
    prompt.push('\n');
    prompt.push_str("Options:\n");

    // Options past the tenth have no letter and are dropped.
    for (letter, option) in CHOICES.iter().zip(doc.options.iter()) {
        prompt.push_str(&format!("{}. {}\n", letter, option));
    }

    if flags.including_answer {
        let cot = doc
            .cot_content
            .as_deref()
            .ok_or_else(|| PromptError::MissingCot(doc.question.clone()))?;
        prompt.push_str(&cot.replace(COT_DATASET_STEM, COT_PROMPT_STEM));
        prompt.push_str("\n\n");
    } else if flags.force_directive {
        prompt.push_str(ANSWER_PREFIX);
        prompt.push_str(THINK_DIRECTIVE);
    } else if flags.is_math {
        prompt.push_str(ANSWER_PREFIX);
        prompt.push_str(MATH_INSTRUCTION);
    } else {
        prompt.push_str(ANSWER_PREFIX);
        prompt.push_str(STEP_BY_STEP_INSTRUCTION);
    }

    Ok(prompt)
}

/// Prompt for the question under test
pub fn doc_to_text(doc: &Document, detection: &Detection) -> Result<String, PromptError> {
    render(doc, FormattingFlags::target(false, detection.should_force_directive))
}

/// Prompt for a few-shot exemplar
pub fn fewshot_to_text(doc: &Document) -> Result<String, PromptError> {
    render(doc, FormattingFlags::exemplar(false))
}

/// Math variant of [`doc_to_text`]
pub fn doc_to_text_math(doc: &Document, detection: &Detection) -> Result<String, PromptError> {
    render(doc, FormattingFlags::target(true, detection.should_force_directive))
}

/// Math variant of [`fewshot_to_text`]
pub fn fewshot_to_text_math(doc: &Document) -> Result<String, PromptError> {
    render(doc, FormattingFlags::exemplar(true))
}

/// Task description placed ahead of the exemplars
pub fn default_description(subject: &str) -> String {
    format!(
        "The following are multiple choice questions (with answers) about {}. \
         Think step by step and then finish your answer with \"the answer is (X)\" \
         where X is the correct letter choice.\n\n",
        subject
    )
}

/// A prompt split into an optional system message and the user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPrompt {
    pub system: Option<String>,
    pub user: String,
}

/// Builder for a complete few-shot context
#[derive(Debug, Clone, Default)]
pub struct FewShotContext {
    description: Option<String>,
    system_prompt: Option<String>,
    system_instruction: Option<String>,
}

impl FewShotContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text prepended to the user turn
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// System prompt from the task configuration (highest priority)
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// System instruction supplied by the caller
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// The system text that wins: task config first, then caller instruction
    pub fn resolved_system(&self) -> Option<&str> {
        let non_blank = |s: &&str| !s.trim().is_empty();
        self.system_prompt
            .as_deref()
            .filter(non_blank)
            .or(self.system_instruction.as_deref().filter(non_blank))
    }

    /// Render exemplars and target into a chat prompt
    ///
    /// Models that ignore system messages get the system text folded into
    /// the front of the user turn instead.
    pub fn build(
        &self,
        exemplars: &[Document],
        target: &Document,
        is_math: bool,
        detection: &Detection,
    ) -> Result<ChatPrompt, PromptError> {
        let mut user = String::new();
        if let Some(description) = &self.description {
            user.push_str(description);
        }
        for exemplar in exemplars {
            user.push_str(&render(exemplar, FormattingFlags::exemplar(is_math))?);
        }
        user.push_str(&render(
            target,
            FormattingFlags::target(is_math, detection.should_force_directive),
        )?);

        let system = self.resolved_system().map(str::to_string);
        match system {
            Some(system) if !detection.supports_system_prompt() => Ok(ChatPrompt {
                system: None,
                user: format!("{}\n\n{}", system, user),
            }),
            system => Ok(ChatPrompt { system, user }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{detect, ModelSignal};

    fn example() -> Document {
        Document::new(
            "What is 2 + 2?",
            vec!["3".into(), "4".into(), "5".into(), "6".into()],
            "B",
            "math",
        )
        .with_cot("A: Let's think step by step. 2 + 2 = 4. The answer is (B).")
    }

    #[test]
    fn test_render_plain_prompt() {
        let prompt = render(&example(), FormattingFlags::default()).unwrap();
        assert_eq!(
            prompt,
            "Question:\nWhat is 2 + 2?\nOptions:\nA. 3\nB. 4\nC. 5\nD. 6\nAnswer: Let's think step by step."
        );
    }

    #[test]
    fn test_render_math_prompt() {
        let prompt = render(&example(), FormattingFlags::target(true, false)).unwrap();
        assert!(prompt.ends_with(&format!("Answer: {}", MATH_INSTRUCTION)));
        assert!(prompt.contains("\\boxed{}"));
    }

    #[test]
    fn test_directive_replaces_instruction() {
        let prompt = render(&example(), FormattingFlags::target(true, true)).unwrap();
        assert!(prompt.ends_with("Answer: <think>\n"));
        assert!(!prompt.contains(STEP_BY_STEP_INSTRUCTION));
        assert!(!prompt.contains("\\boxed{}"));
    }

    #[test]
    fn test_exemplar_rewrites_cot_stem() {
        let flags = FormattingFlags {
            including_answer: true,
            is_math: false,
            force_directive: true,
        };
        let prompt = render(&example(), flags).unwrap();
        assert!(prompt.ends_with(
            "D. 6\nAnswer: Let's think step by step. 2 + 2 = 4. The answer is (B).\n\n"
        ));
        assert!(!prompt.contains(THINK_DIRECTIVE));
        assert!(!prompt.contains(COT_DATASET_STEM));
    }

    #[test]
    fn test_exemplar_without_cot_is_an_error() {
        let mut doc = example();
        doc.cot_content = None;
        assert!(matches!(
            render(&doc, FormattingFlags::exemplar(false)),
            Err(PromptError::MissingCot(_))
        ));
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        let mut doc = example();
        doc.options.clear();
        assert_eq!(
            render(&doc, FormattingFlags::default()),
            Err(PromptError::InvalidDocument(DocumentError::NoOptions))
        );
    }

    #[test]
    fn test_doc_to_text_follows_detection() {
        let legacy = detect(&ModelSignal::new("", "/path/to/deepseek-r1-distill-qwen-7b", ""));
        let modern = detect(&ModelSignal::new("", "/weights/DeepSeek-R1-0528-Qwen3-8B", ""));

        assert!(doc_to_text(&example(), &legacy).unwrap().contains("<think>"));
        assert!(doc_to_text_math(&example(), &legacy).unwrap().contains("<think>"));
        assert!(!doc_to_text(&example(), &modern).unwrap().contains("<think>"));
        assert!(doc_to_text_math(&example(), &modern).unwrap().contains("\\boxed{}"));
        assert!(fewshot_to_text(&example()).unwrap().ends_with("\n\n"));
        assert!(fewshot_to_text_math(&example()).unwrap().ends_with("\n\n"));
    }

    #[test]
    fn test_system_prompt_priority() {
        let ctx = FewShotContext::new()
            .system_instruction("instruction")
            .system_prompt("config prompt");
        assert_eq!(ctx.resolved_system(), Some("config prompt"));

        let ctx = FewShotContext::new().system_instruction("instruction");
        assert_eq!(ctx.resolved_system(), Some("instruction"));

        assert_eq!(FewShotContext::new().resolved_system(), None);
    }

    #[test]
    fn test_blank_system_prompt_falls_back_to_instruction() {
        let ctx = FewShotContext::new()
            .system_prompt("   \n")
            .system_instruction("instruction");
        assert_eq!(ctx.resolved_system(), Some("instruction"));

        let ctx = FewShotContext::new()
            .system_prompt("")
            .system_instruction(" ");
        assert_eq!(ctx.resolved_system(), None);
    }

    #[test]
    fn test_context_folds_system_prompt_for_legacy_models() {
        let ctx = FewShotContext::new()
            .description(default_description("math"))
            .system_prompt("You are an expert.");
        let exemplars = vec![example()];

        let modern = detect(&ModelSignal::new("deepseek-r1-0528", "", ""));
        let chat = ctx.build(&exemplars, &example(), true, &modern).unwrap();
        assert_eq!(chat.system.as_deref(), Some("You are an expert."));
        assert!(chat.user.starts_with("The following are multiple choice questions"));
        assert_eq!(chat.user.matches("Question:\n").count(), 2);

        let legacy = detect(&ModelSignal::new("deepseek-r1", "", ""));
        let chat = ctx.build(&exemplars, &example(), true, &legacy).unwrap();
        assert!(chat.system.is_none());
        assert!(chat.user.starts_with("You are an expert.\n\nThe following"));
        assert!(chat.user.ends_with("Answer: <think>\n"));
    }
}
