//! Question extraction
//!
//! Finds lines that read as questions so a document of questions can be
//! answered as a batch.

/// Words a question may start with.
pub const LEAD_WORDS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "is", "are", "do", "does", "did", "can",
    "could", "would", "should", "will", "has", "have", "had",
];

/// Returns `true` if the trimmed line starts with an interrogative lead word
/// and ends with `?`.
///
/// The lead word is matched case-insensitively and must be a whole word, so
/// `"Isolation?"` is not a question but `"Is it?"` is.
pub fn is_question(line: &str) -> bool {
    let line = line.trim();
    if !line.ends_with('?') {
        return false;
    }

    let word_end = line
        .find(|c: char| !c.is_alphanumeric())
        .unwrap_or(line.len());
    let lead = &line[..word_end];

    LEAD_WORDS.iter().any(|word| lead.eq_ignore_ascii_case(word))
}

/// Extract every question line from `text`, trimmed, in order.
///
/// Duplicates are kept.
pub fn extract_questions(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| is_question(line))
        .map(|line| line.trim().to_string())
        .collect()
}
