use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::Chunk;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
    #[error("max chunks per document must be greater than zero")]
    ZeroMaxChunks,
}

/// Word-count windowing parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub max_chunks: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 6000,
            overlap: 500,
            max_chunks: 10,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::ZeroChunkSize);
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            });
        }
        if self.max_chunks == 0 {
            return Err(ChunkError::ZeroMaxChunks);
        }
        Ok(())
    }

    /// Distance between the starts of two consecutive windows. Always >= 1
    /// for a validated config.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Lazily window `text` into overlapping word-bounded chunks.
    pub fn chunks<'a>(&self, doc_id: &'a str, text: &'a str) -> Chunks<'a> {
        Chunks {
            doc_id,
            text,
            words: text.split_whitespace().collect(),
            chunk_size: self.config.chunk_size,
            step: self.config.step(),
            remaining: self.config.max_chunks,
            start: 0,
            index: 0,
            done: false,
        }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        self.chunks(doc_id, text).collect()
    }
}

pub struct Chunks<'a> {
    doc_id: &'a str,
    text: &'a str,
    words: Vec<&'a str>,
    chunk_size: usize,
    step: usize,
    remaining: usize,
    start: usize,
    index: usize,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done || self.remaining == 0 || self.words.is_empty() {
            return None;
        }

        let total = self.words.len();

        // Short documents are passed through untouched
        if total <= self.chunk_size {
            self.done = true;
            return Some(Chunk::new(self.doc_id, 0, self.text.to_string(), (0, total)));
        }

        let end = (self.start + self.chunk_size).min(total);
        let chunk = Chunk::new(
            self.doc_id,
            self.index,
            self.words[self.start..end].join(" "),
            (self.start, end),
        );

        if end >= total {
            self.done = true;
        } else {
            self.start += self.step;
        }
        self.index += 1;
        self.remaining -= 1;

        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn chunker(chunk_size: usize, overlap: usize, max_chunks: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size,
            overlap,
            max_chunks,
        })
        .unwrap()
    }

    #[test]
    fn test_short_text_is_single_untouched_chunk() {
        let text = "Grant call\n\nDeadline:  tomorrow";
        let chunks = chunker(10, 2, 5).chunk_text("doc", text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].offset, (0, 5));
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(chunker(10, 2, 5).chunk_text("doc", "  \n ").is_empty());
    }

    #[test]
    fn test_consecutive_chunks_overlap_exactly() {
        let text = numbered_words(25);
        let chunks = chunker(10, 3, 10).chunk_text("doc", &text);

        // starts at 0, 7, 14, 21
        assert_eq!(chunks.len(), 4);
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].text.split_whitespace().collect();
            let next: Vec<&str> = pair[1].text.split_whitespace().collect();
            assert_eq!(&prev[prev.len() - 3..], &next[..3]);
        }
        assert_eq!(chunks.last().unwrap().offset, (21, 25));
    }

    #[test]
    fn test_dropping_overlap_reconstructs_words() {
        let text = numbered_words(31);
        let chunks = chunker(8, 2, 100).chunk_text("doc", &text);

        let mut rebuilt: Vec<String> = Vec::new();
        for chunk in &chunks {
            let skip = rebuilt.len() - chunk.offset.0;
            rebuilt.extend(chunk.text.split_whitespace().skip(skip).map(String::from));
        }
        let original: Vec<String> = text.split_whitespace().map(String::from).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_truncates_to_max_chunks() {
        let text = numbered_words(100);
        let chunks = chunker(10, 0, 3).chunk_text("doc", &text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].index, 2);
        assert_eq!(chunks[2].offset, (20, 30));
    }

    #[test]
    fn test_chunk_ids_are_stable() {
        let text = numbered_words(30);
        let a = chunker(10, 2, 10).chunk_text("doc", &text);
        let b = chunker(10, 2, 10).chunk_text("doc", &text);

        assert_eq!(a[1].chunk_id, b[1].chunk_id);
        assert_ne!(a[0].chunk_id, a[1].chunk_id);
    }

    #[test]
    fn test_invalid_configs_fail_fast() {
        let overlap = Chunker::new(ChunkerConfig {
            chunk_size: 10,
            overlap: 10,
            max_chunks: 1,
        });
        assert_eq!(
            overlap.err(),
            Some(ChunkError::OverlapTooLarge {
                overlap: 10,
                chunk_size: 10
            })
        );

        let zero = ChunkerConfig {
            chunk_size: 0,
            overlap: 0,
            max_chunks: 1,
        };
        assert_eq!(zero.validate(), Err(ChunkError::ZeroChunkSize));

        let no_chunks = ChunkerConfig {
            chunk_size: 5,
            overlap: 1,
            max_chunks: 0,
        };
        assert_eq!(no_chunks.validate(), Err(ChunkError::ZeroMaxChunks));
    }
}
