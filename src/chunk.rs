//! Fixed-size sliding-window text chunker.
//!
//! Splits document text into overlapping character windows: the first window
//! covers characters `[0, size)`, each subsequent window starts
//! `size - overlap` characters after the previous one, and the final window
//! is whatever remains. Windows are trimmed of surrounding whitespace and
//! whitespace-only windows are dropped.
//!
//! Windows are measured in Unicode scalar values, not bytes, so multi-byte
//! text never splits mid-character.

use anyhow::{bail, Result};

/// Validated chunking parameters.
///
/// Construction enforces `overlap < size`; with that invariant the window
/// start strictly advances on every step, so [`split`](ChunkPolicy::split)
/// always terminates.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    size: usize,
    overlap: usize,
}

impl ChunkPolicy {
    /// Create a policy, rejecting parameter combinations that would make the
    /// window step zero or negative.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            size: chunk_size,
            overlap: chunk_overlap,
        })
    }

    /// Split text into overlapping windows, trimmed, empties dropped.
    /// Returns windows in document order.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        if len == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = (start + self.size).min(len);
            let window: String = chars[start..end].iter().collect();
            let trimmed = window.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
            if end == len {
                break;
            }
            // overlap < size, so the next start is strictly greater
            start = end - self.overlap;
        }

        chunks
    }
}
