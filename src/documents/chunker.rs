//! Word-aligned text chunking with overlap

use super::{Chunk, Document};
use crate::answering::token_estimator::TokenEstimator;

/// Longest run of non-whitespace characters kept as one word
const MAX_WORD_CHARS: usize = 4_096;

/// Splits text into chunks of at most `chunk_size` estimated tokens.
///
/// Consecutive chunks share up to `chunk_overlap` tokens of trailing words.
/// A word longer than `chunk_size` (or than `MAX_WORD_CHARS`) is cut into
/// pieces that fit.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    estimator: TokenEstimator,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, estimator: TokenEstimator) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            estimator,
        }
    }

    /// Longest piece, in characters, an oversized word is cut into
    fn piece_chars(&self) -> usize {
        self.estimator
            .chars_for_tokens(self.chunk_size)
            .map_or(MAX_WORD_CHARS, |chars| chars.min(MAX_WORD_CHARS))
            .max(1)
    }

    /// Whitespace-separated words, with oversized words cut into pieces
    fn words<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let piece_chars = self.piece_chars();
        let mut words = Vec::new();

        for word in text.split_whitespace() {
            let fits = self.estimator.estimate_word(word) <= self.chunk_size
                && word.chars().count() <= MAX_WORD_CHARS;
            if fits {
                words.push(word);
                continue;
            }

            let mut start = 0;
            for (count, (offset, _)) in word.char_indices().enumerate() {
                if count > 0 && count % piece_chars == 0 {
                    words.push(&word[start..offset]);
                    start = offset;
                }
            }
            words.push(&word[start..]);
        }

        words
    }

    /// Split raw text
    pub fn split(&self, text: &str) -> Vec<String> {
        let words: Vec<(&str, usize)> = self
            .words(text)
            .into_iter()
            .map(|w| (w, self.estimator.estimate_word(w)))
            .collect();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let mut end = start;
            let mut tokens = 0;
            while end < words.len() && (end == start || tokens + words[end].1 <= self.chunk_size) {
                tokens += words[end].1;
                end += 1;
            }

            chunks.push(
                words[start..end]
                    .iter()
                    .map(|(w, _)| *w)
                    .collect::<Vec<_>>()
                    .join(" "),
            );

            if end == words.len() {
                break;
            }

            // Step back over trailing words that fit in the overlap
            let mut next = end;
            let mut overlap = 0;
            while next > start + 1 && overlap + words[next - 1].1 <= self.chunk_overlap {
                overlap += words[next - 1].1;
                next -= 1;
            }
            start = next;
        }

        chunks
    }

    /// Split a document into positioned chunks
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.text)
            .into_iter()
            .enumerate()
            .map(|(position, text)| Chunk {
                source: document.source.clone(),
                text,
                position,
            })
            .collect()
    }
}
