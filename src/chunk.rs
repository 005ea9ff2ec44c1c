//! Sentence-boundary-aware sliding-window chunker.
//!
//! Splits extracted text into overlapping chunks of at most `chunk_size`
//! characters. Each window is scanned backwards for a sentence ending so that
//! chunks break at natural boundaries when one exists near the end of the
//! window; the configured overlap is then subtracted from the break point, so
//! chunk boundaries drift relative to a fixed-size sliding window.
//!
//! All positions are character (code point) offsets, never byte offsets.

use anyhow::{bail, Result};

/// How far back from the end of a window to look for a sentence ending.
const BOUNDARY_SCAN_CHARS: usize = 200;

/// Characters that can end a sentence for break-point purposes.
const SENTENCE_ENDINGS: [char; 4] = ['.', '!', '?', '\n'];

/// Validated chunking parameters.
///
/// Construction fails when `overlap >= chunk_size`: the cursor advances by
/// at most `chunk_size - overlap` per iteration, so that configuration could
/// never terminate.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkPolicy {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if overlap >= chunk_size {
            bail!(
                "overlap must be < chunk_size ({} >= {})",
                overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Split text into overlapping chunks, breaking at sentence boundaries when
/// one falls within the last [`BOUNDARY_SCAN_CHARS`] characters of a window.
///
/// Chunks that are empty after trimming are dropped; text no longer than
/// `chunk_size` yields a single trimmed chunk (or none, if blank).
pub fn chunk_text(text: &str, policy: &ChunkPolicy) -> Vec<String> {
    let size = policy.chunk_size;
    let overlap = policy.overlap;

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut chunks: Vec<String> = Vec::new();

    if total <= size {
        push_trimmed(&mut chunks, &chars);
        return chunks;
    }

    let mut start = 0usize;
    while start < total {
        let end = start + size;

        if end >= total {
            push_trimmed(&mut chunks, &chars[start..]);
            break;
        }

        let window = &chars[start..end];
        let next_start = match find_sentence_break(window) {
            Some(break_at) => {
                push_trimmed(&mut chunks, &chars[start..start + break_at]);
                // Overlap counts back from the break point, not the window end.
                (start + break_at).saturating_sub(overlap)
            }
            None => {
                push_trimmed(&mut chunks, window);
                end - overlap
            }
        };

        // A break point inside the overlap region would move the cursor
        // backwards and never terminate; fall back to the fixed-size advance.
        start = if next_start > start {
            next_start
        } else {
            end - overlap
        };
    }

    chunks
}

/// Scan backwards through the window for the rightmost sentence ending that
/// is followed by whitespace or an uppercase letter. Returns the offset just
/// past the ending character.
fn find_sentence_break(window: &[char]) -> Option<usize> {
    let len = window.len();
    if len < 2 {
        return None;
    }

    // The scan stops before this index, matching the window cap.
    let lower_bound = len.saturating_sub(BOUNDARY_SCAN_CHARS);

    let mut i = len - 1;
    while i > lower_bound {
        if i < len - 1 && SENTENCE_ENDINGS.contains(&window[i]) {
            let next = window[i + 1];
            if next.is_whitespace() || next.is_uppercase() {
                return Some(i + 1);
            }
        }
        i -= 1;
    }

    None
}

fn push_trimmed(chunks: &mut Vec<String>, chars: &[char]) {
    let chunk: String = chars.iter().collect();
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
