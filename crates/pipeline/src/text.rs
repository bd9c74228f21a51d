//! Character-indexed string helpers.
//!
//! Every size and offset in the pipeline counts `char`s, so multi-byte
//! scripts are cut on character boundaries and measured the way a reader
//! would measure them.

/// Sentence-terminal punctuation, in the priority order the chunker tries them.
pub const SENTENCE_TERMINALS: [char; 7] = ['.', '!', '?', '。', '！', '？', '…'];

pub fn is_terminal(c: char) -> bool {
    SENTENCE_TERMINALS.contains(&c)
}

/// The last `n` characters of `text` (all of it when shorter).
pub fn suffix_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &text[i..],
        None => text,
    }
}

/// Byte offset of the `n`th character (or `text.len()` past the end).
pub fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}
