use crate::chunk::{Chunker, DEFAULT_MAX_CHUNK_CHARS};

/// Sentence chunker - packs whole sentences into chunks of bounded size
///
/// Sentences are found by splitting on `". "` after newlines have been
/// collapsed to spaces. A sentence is never split, so one longer than
/// `max_chunk_chars` becomes a chunk of its own.
pub struct SentenceChunker {
    pub max_chunk_chars: usize,
}

impl SentenceChunker {
    #[must_use]
    pub fn new(max_chunk_chars: usize) -> Self {
        Self { max_chunk_chars }
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_CHARS)
    }
}

impl Chunker for SentenceChunker {
    fn name(&self) -> &str {
        "sentence"
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.replace(['\r', '\n'], " ");

        let mut chunks = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        // length of buffer.join(" ") in chars
        let mut length = 0;
        for sentence in sentences(&normalized) {
            let len = sentence.chars().count();
            let joined = match buffer.len() {
                0 => len,
                _ => length + 1 + len,
            };

            if joined > self.max_chunk_chars && !buffer.is_empty() {
                // close the current chunk and start a new one with this sentence
                chunks.push(buffer.join(" "));
                buffer.clear();
                length = len;
            } else {
                length = joined;
            }
            buffer.push(sentence);
        }

        // flush buffer chunk
        if !buffer.is_empty() {
            chunks.push(buffer.join(" "));
        }

        chunks
    }
}

/// Split text into chunks of at most `max_chunk_chars` using [`SentenceChunker`].
pub fn chunk_text(text: &str, max_chunk_chars: usize) -> Vec<String> {
    SentenceChunker::new(max_chunk_chars).chunk(text)
}

/// Trimmed, non-empty, period-terminated sentences of `text`.
fn sentences(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.ends_with('.') {
                s.to_string()
            } else {
                format!("{s}.")
            }
        })
}
