//! Overlapping text chunking for document ingestion.
//!
//! Splits a document body into fixed-size segments that share a configured
//! number of characters with their predecessor. Segment ends prefer natural
//! boundaries (paragraph, sentence, word) over hard character cuts.

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared with the previous chunk.
    pub chunk_overlap: usize,
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ApiError> {
        if chunk_size == 0 {
            return Err(ApiError::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ApiError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

/// Splits text into overlapping segments.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Lazily iterate over the segments of `text`.
    ///
    /// Empty input yields an empty iterator. The final segment may be
    /// shorter than the configured size.
    pub fn split(&self, text: &str) -> Chunks {
        Chunks {
            chars: text.chars().collect(),
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            start: 0,
            done: text.is_empty(),
        }
    }
}

/// Iterator over overlapping chunks of a text body.
///
/// Each segment after the first begins `chunk_overlap` characters before the
/// end of its predecessor, so re-joining segments recovers the input with no
/// characters dropped at boundaries.
pub struct Chunks {
    chars: Vec<char>,
    chunk_size: usize,
    chunk_overlap: usize,
    start: usize,
    done: bool,
}

impl Chunks {
    fn window_end(&self) -> usize {
        let hard_end = (self.start + self.chunk_size).min(self.chars.len());
        if hard_end == self.chars.len() {
            return hard_end;
        }
        find_break(&self.chars[self.start..hard_end]).map_or(hard_end, |cut| self.start + cut)
    }
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let end = self.window_end();
        let segment: String = self.chars[self.start..end].iter().collect();

        if end >= self.chars.len() {
            self.done = true;
        } else {
            // Overlap is measured back from the actual segment end, not a
            // fixed stride, so a boundary-shortened segment never leaves a
            // gap before the next one. The max() guarantees forward progress
            // even when a snapped boundary lands inside the overlap region.
            self.start = (end - self.chunk_overlap.min(end)).max(self.start + 1);
        }

        Some(segment)
    }
}

/// Find a natural break near the end of a window.
///
/// Looks in the final fifth of the window for, in order of preference, a
/// paragraph break, a sentence end, then a word break. Returns the index one
/// past the break, or `None` when no separator is present.
fn find_break(window: &[char]) -> Option<usize> {
    if window.len() < 2 {
        return None;
    }
    let search_start = window.len() - (window.len() / 5).max(1);

    if let Some(cut) = rfind_paragraph(window, search_start) {
        return Some(cut);
    }
    if let Some(cut) = rfind_sentence(window, search_start) {
        return Some(cut);
    }
    rfind_word(window, search_start)
}

fn rfind_paragraph(window: &[char], from: usize) -> Option<usize> {
    (from..window.len().saturating_sub(1))
        .rev()
        .find(|&i| window[i] == '\n' && window[i + 1] == '\n')
        .map(|i| i + 2)
}

fn rfind_sentence(window: &[char], from: usize) -> Option<usize> {
    (from..window.len().saturating_sub(1))
        .rev()
        .find(|&i| matches!(window[i], '.' | '!' | '?') && matches!(window[i + 1], ' ' | '\n'))
        .map(|i| i + 2)
}

fn rfind_word(window: &[char], from: usize) -> Option<usize> {
    (from..window.len())
        .rev()
        .find(|&i| window[i] == ' ')
        .map(|i| i + 1)
}
