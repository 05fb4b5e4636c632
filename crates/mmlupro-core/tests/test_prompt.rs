//! Property-based tests for prompt rendering

use mmlupro_core::prompt::THINK_DIRECTIVE;
use mmlupro_core::{render, Document, FormattingFlags, CHOICES};
use proptest::prelude::*;

fn document(options: Vec<String>) -> Document {
    Document::new("Which option?", options, "A", "other")
        .with_cot("A: Let's think step by step. The answer is (A).")
}

fn option_lines(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .skip_while(|line| *line != "Options:")
        .skip(1)
        .take_while(|line| !line.starts_with("Answer:"))
        .map(str::to_string)
        .collect()
}

proptest! {
    #[test]
    fn test_one_labelled_line_per_option(options in prop::collection::vec("[a-z]{1,12}", 1..=10)) {
        let prompt = render(&document(options.clone()), FormattingFlags::default()).unwrap();
        let lines = option_lines(&prompt);

        prop_assert_eq!(lines.len(), options.len());
        for (i, (line, option)) in lines.iter().zip(options.iter()).enumerate() {
            prop_assert_eq!(line, &format!("{}. {}", CHOICES[i], option));
        }
    }

    #[test]
    fn test_options_past_tenth_are_dropped(extra in prop::collection::vec("[0-9]{3}", 1..6)) {
        let mut options: Vec<String> = (0..10).map(|i| format!("keep{}", i)).collect();
        options.extend(extra.iter().map(|e| format!("drop{}", e)));

        let prompt = render(&document(options), FormattingFlags::default()).unwrap();
        prop_assert_eq!(option_lines(&prompt).len(), 10);
        prop_assert!(!prompt.contains("drop"));
    }

    #[test]
    fn test_exemplars_never_carry_directive(is_math in any::<bool>(), force in any::<bool>()) {
        let flags = FormattingFlags { including_answer: true, is_math, force_directive: force };
        let prompt = render(&document(vec!["yes".into(), "no".into()]), flags).unwrap();

        prop_assert!(!prompt.contains(THINK_DIRECTIVE));
        prop_assert!(prompt.ends_with("\n\n"));
    }

    #[test]
    fn test_render_is_deterministic(
        options in prop::collection::vec("[ -~]{0,20}", 1..12),
        is_math in any::<bool>(),
        force in any::<bool>(),
    ) {
        let doc = document(options);
        let flags = FormattingFlags::target(is_math, force);
        prop_assert_eq!(render(&doc, flags).unwrap(), render(&doc, flags).unwrap());
    }
}
