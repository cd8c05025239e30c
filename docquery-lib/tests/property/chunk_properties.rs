use docquery_lib::chunk::chunk_text;
use docquery_lib::question::{extract_questions, is_question, LEAD_WORDS};
use proptest::prelude::*;

/// Everything except periods and whitespace, in order.
fn content(s: &str) -> String {
    s.chars().filter(|c| *c != '.' && !c.is_whitespace()).collect()
}

proptest! {
    #[test]
    fn chunks_respect_limit_unless_single_sentence(
        text in "[a-zA-Z ,.\n]{0,400}",
        max in 1usize..120,
    ) {
        for chunk in chunk_text(&text, max) {
            if chunk.chars().count() > max {
                // only a lone sentence may overflow
                prop_assert!(
                    !chunk.contains(". "),
                    "multi-sentence chunk {:?} exceeds {}",
                    chunk,
                    max
                );
            }
        }
    }

    #[test]
    fn chunks_preserve_content(
        text in "[a-zA-Z ,.\n]{0,400}",
        max in 1usize..120,
    ) {
        let chunks = chunk_text(&text, max);
        prop_assert_eq!(content(&chunks.concat()), content(&text));
    }

    #[test]
    fn chunks_are_trimmed_and_terminated(
        text in "[a-z .\n]{0,300}",
        max in 1usize..80,
    ) {
        for chunk in chunk_text(&text, max) {
            prop_assert!(!chunk.is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
            prop_assert!(chunk.ends_with('.'));
        }
    }

    #[test]
    fn chunking_is_deterministic(text in ".{0,200}", max in 1usize..200) {
        prop_assert_eq!(chunk_text(&text, max), chunk_text(&text, max));
    }

    #[test]
    fn lead_word_and_question_mark_make_a_question(
        idx in 0..LEAD_WORDS.len(),
        upper in any::<bool>(),
        rest in "[a-z ]{0,20}",
    ) {
        let lead = if upper { LEAD_WORDS[idx].to_uppercase() } else { LEAD_WORDS[idx].to_string() };
        let line = format!("  {lead} {rest}?  ");
        prop_assert!(is_question(&line));
    }

    #[test]
    fn no_question_mark_is_never_a_question(line in "[a-zA-Z ]{0,40}") {
        prop_assert!(!is_question(&line));
    }

    #[test]
    fn extracted_questions_are_questions(text in "[a-zA-Z ?\n]{0,300}") {
        let questions = extract_questions(&text);
        prop_assert!(questions.len() <= text.lines().count());
        for question in &questions {
            prop_assert!(is_question(question));
            prop_assert!(text.lines().any(|line| line.trim() == question));
        }
    }
}
