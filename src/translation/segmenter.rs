/*!
 * Sentence-safe segmentation of document text.
 *
 * Text is normalized (every whitespace run becomes one space), split into
 * sentences on Latin and CJK terminators, and sentences are packed greedily
 * into chunks bounded by a character budget. A sentence is never split; a
 * sentence longer than the budget becomes a chunk of its own.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// An ordered, immutable unit of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in document order
    pub index: usize,
    /// Normalized source text
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Whether the chunk carries no translatable text
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？')
}

// Closing marks that belong to the sentence they follow
fn is_closing_mark(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | '»' | ')' | ']' | '」' | '』' | '）' | '】')
}

/// Collapse all whitespace runs to single spaces and trim the ends
pub fn normalize(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Split normalized text into sentences.
///
/// A sentence runs up to a terminator, absorbing any terminators and closing
/// marks that immediately follow it. Text after the last terminator forms a
/// final sentence. Concatenating the result yields the input unchanged.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        while let Some(&(_, next)) = chars.peek() {
            if is_terminator(next) || is_closing_mark(next) {
                chars.next();
            } else {
                break;
            }
        }
        let end = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());
        sentences.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

/// Segment text into ordered chunks of at most `max_chunk_size` characters.
///
/// The input is normalized first. Chunks keep the single spaces between
/// sentences, so concatenating every chunk text reproduces `normalize(text)`.
pub fn segment(text: &str, max_chunk_size: usize) -> Vec<Chunk> {
    let normalized = normalize(text);
    segment_normalized(&normalized, max_chunk_size)
}

/// Segment text that has already been normalized
pub fn segment_normalized(normalized: &str, max_chunk_size: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(normalized) {
        let sentence_len = sentence.chars().count();
        if current_len + sentence_len <= max_chunk_size {
            current.push_str(sentence);
            current_len += sentence_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(chunks.len(), std::mem::take(&mut current)));
        }
        current.push_str(sentence);
        current_len = sentence_len;
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(chunks.len(), current));
    }

    chunks
}
