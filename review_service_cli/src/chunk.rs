//! Length-bounded splitting of page text.
//!
//! Chunks are cut purely by character count, without looking for sentence or
//! paragraph boundaries. Concatenating every chunk yields the input exactly.

use std::iter::FusedIterator;
use std::num::NonZeroUsize;

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(6000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Split `text` into consecutive pieces of at most `max_chars` characters.
///
/// The returned iterator is lazy and `Clone`, so the sequence can be
/// restarted from any point.
pub fn split_text(text: &str, max_chars: NonZeroUsize) -> Chunks<'_> {
    Chunks {
        rest: text,
        max_chars: max_chars.get(),
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        // Byte offset of the first char past the bound, or the whole rest.
        let end = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.rest.is_empty() {
            return (0, Some(0));
        }
        // Every char is at most 4 bytes and at least 1.
        let min_chars = self.rest.len().div_ceil(4);
        (
            min_chars.div_ceil(self.max_chars),
            Some(self.rest.len().div_ceil(self.max_chars)),
        )
    }
}

impl FusedIterator for Chunks<'_> {}
