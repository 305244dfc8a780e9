//! Recursive character chunking with fixed overlap
//!
//! Sizes are counted in chars. A window of `chunk_size` chars is cut at the
//! last separator it contains, trying separator levels in priority order and
//! hard-cutting at the window end when none applies. The next window starts
//! `chunk_overlap` chars before the cut, pulled back to a word start when one
//! is close.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};

/// Separator levels, highest priority first
const SEPARATORS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// A chunk of text with its char offsets `[start, end)` in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextSpan {
    /// Length in chars
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    /// Maximum chunk size in chars
    chunk_size: usize,
    /// Minimum shared chars between consecutive chunks
    overlap: usize,
}

/// Char view of a text: chars plus the byte offset of each char (and of the end)
struct CharIndex<'a> {
    text: &'a str,
    chars: Vec<char>,
    offsets: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (offset, c) in text.char_indices() {
            offsets.push(offset);
            chars.push(c);
        }
        offsets.push(text.len());
        Self {
            text,
            chars,
            offsets,
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    /// Char position of a byte offset that lies on a char boundary
    fn char_pos(&self, byte: usize) -> usize {
        self.offsets.partition_point(|&o| o < byte)
    }

    /// A word starts at `pos` when whitespace precedes a non-whitespace char
    fn is_word_start(&self, pos: usize) -> bool {
        pos > 0
            && pos < self.chars.len()
            && self.chars[pos - 1].is_whitespace()
            && !self.chars[pos].is_whitespace()
    }
}

impl RecursiveChunker {
    /// Create a new chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk size must be greater than zero"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping spans
    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        if text.is_empty() {
            return Vec::new();
        }

        let index = CharIndex::new(text);
        let total = index.len();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut prev_end = 0;

        loop {
            if total - start <= self.chunk_size {
                spans.push(Self::span(&index, start, total));
                break;
            }

            let window_end = start + self.chunk_size;
            // A cut must add chars beyond the previous chunk and the overlap
            let min_cut = prev_end.max(start + self.overlap);
            let cut = Self::find_cut(&index, start, window_end, min_cut);

            spans.push(Self::span(&index, start, cut));
            prev_end = cut;
            start = self.next_start(&index, start, cut);
        }

        spans
    }

    fn span(index: &CharIndex<'_>, start: usize, end: usize) -> TextSpan {
        TextSpan {
            start,
            end,
            text: index.slice(start, end).to_string(),
        }
    }

    /// Last separator cut in `(min_cut, window_end]`, by separator priority
    fn find_cut(index: &CharIndex<'_>, start: usize, window_end: usize, min_cut: usize) -> usize {
        let window = index.slice(start, window_end);
        let window_offset = index.offsets[start];

        for level in SEPARATORS {
            let best = level
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
                .max();

            if let Some(byte_cut) = best {
                let cut = index.char_pos(window_offset + byte_cut);
                if cut > min_cut {
                    return cut;
                }
            }
        }

        window_end
    }

    /// Start of the chunk after a cut: `overlap` chars back, moved to a word start if one is near
    fn next_start(&self, index: &CharIndex<'_>, start: usize, cut: usize) -> usize {
        let target = cut - self.overlap;
        if self.overlap == 0 {
            return target;
        }

        let max_extra = (self.chunk_size - self.overlap) / 2;
        let limit = cut
            .saturating_sub(self.overlap + max_extra)
            .max(start + 1);

        (limit..=target)
            .rev()
            .find(|&pos| index.is_word_start(pos))
            .unwrap_or(target)
    }
}
