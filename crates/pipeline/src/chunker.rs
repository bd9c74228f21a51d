//! Overlapping window chunker.
//!
//! Walks the document with a cursor. Each step looks at the next
//! `chunk_size` characters, picks a cut point, emits everything up to the
//! cut, then moves the cursor to the cut and back by `overlap_chars`. The
//! retreat means neighbouring chunks share `overlap_chars` characters; the
//! reassembler removes the duplicate later.
//!
//! Cut priority inside a window:
//! 1. a chapter heading more than [`HEADING_MIN_OFFSET`] chars in (`heading` only)
//! 2. the last paragraph break at or after 60% of the window
//! 3. the last sentence terminal + whitespace at or after 60%, terminals tried in order
//! 4. the full window
//!
//! `fixed` skips 1-3.

use regex::Regex;
use scrivener_core::{Chunk, PipelineError, SplitMethod};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::text::SENTENCE_TERMINALS;

/// A heading must start further than this into the window to be used as a cut.
pub const HEADING_MIN_OFFSET: usize = 100;

/// Chapter-style headings at line start: English, Chinese/Japanese, Russian.
///
/// A roman numeral must end the line or be followed by `.`/`:` so prose such
/// as "Part did not" is not taken for a heading.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^(?:(?:chapter|part|book)\s+(?:\d+\b|[ivxlcdm]+(?:[ \t]*$|[.:]))|第[0-9０-９零〇一二三四五六七八九十百千]+[章节節回卷部篇話]|глава\s+(?:\d+\b|[ivxlcdm]+(?:[ \t]*$|[.:])))",
    )
    .expect("hardcoded heading pattern is valid")
});

/// Splits documents into overlapping [`Chunk`]s.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap_chars: usize,
    method: SplitMethod,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap_chars: usize, method: SplitMethod) -> Self {
        Self {
            chunk_size,
            overlap_chars,
            method,
        }
    }

    /// Split `text` into ordered chunks.
    ///
    /// Fails with [`PipelineError::BoundaryStall`] instead of looping when a
    /// cut does not exceed the overlap, and with `InvalidSettings` for a zero
    /// chunk size.
    pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>, PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::InvalidSettings("chunk_size must be > 0".into()));
        }

        // Byte offset of every char, plus the end of the string.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut chunks = Vec::new();
        let mut pos = 0;

        while pos < total {
            let index = chunks.len();

            if total - pos <= self.chunk_size {
                chunks.push(Chunk {
                    text: text[offsets[pos]..].to_string(),
                    index,
                    source_offset: pos,
                });
                break;
            }

            let window = &text[offsets[pos]..offsets[pos + self.chunk_size]];
            let cut = self.find_cut(window);
            trace!(index, pos, cut, "Chunk boundary chosen");

            chunks.push(Chunk {
                text: text[offsets[pos]..offsets[pos + cut]].to_string(),
                index,
                source_offset: pos,
            });

            let next = (pos + cut).saturating_sub(self.overlap_chars);
            if next <= pos {
                return Err(PipelineError::BoundaryStall {
                    position: pos,
                    cut,
                    overlap: self.overlap_chars,
                });
            }
            pos = next;
        }

        debug!(
            chunks = chunks.len(),
            total_chars = total,
            method = ?self.method,
            "Document chunked"
        );
        Ok(chunks)
    }

    /// Cut offset in chars, relative to the window start.
    fn find_cut(&self, window: &str) -> usize {
        if self.method == SplitMethod::Heading {
            if let Some(cut) = heading_cut(window) {
                return cut;
            }
        }

        let chars: Vec<char> = window.chars().collect();

        if self.method != SplitMethod::Fixed {
            let threshold = self.chunk_size * 6 / 10;
            if let Some(cut) = paragraph_cut(&chars, threshold) {
                return cut;
            }
            if let Some(cut) = sentence_cut(&chars, threshold) {
                return cut;
            }
        }

        chars.len()
    }
}

/// First heading starting beyond [`HEADING_MIN_OFFSET`].
fn heading_cut(window: &str) -> Option<usize> {
    HEADING_RE
        .find_iter(window)
        .map(|m| window[..m.start()].chars().count())
        .find(|&offset| offset > HEADING_MIN_OFFSET)
}

/// Start of the last `\n\n`, if it is at or after `threshold`.
fn paragraph_cut(chars: &[char], threshold: usize) -> Option<usize> {
    chars
        .windows(2)
        .rposition(|w| w[0] == '\n' && w[1] == '\n')
        .filter(|&i| i >= threshold && i > 0)
}

/// Just past the last terminal + whitespace at or after `threshold`,
/// trying terminals in priority order.
fn sentence_cut(chars: &[char], threshold: usize) -> Option<usize> {
    SENTENCE_TERMINALS.iter().find_map(|&terminal| {
        chars
            .windows(2)
            .rposition(|w| w[0] == terminal && w[1].is_whitespace())
            .filter(|&i| i >= threshold)
            .map(|i| i + 2)
    })
}

/// Convenience wrapper over [`Chunker::chunk`].
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap_chars: usize,
    method: SplitMethod,
) -> Result<Vec<Chunk>, PipelineError> {
    Chunker::new(chunk_size, overlap_chars, method).chunk(text)
}
