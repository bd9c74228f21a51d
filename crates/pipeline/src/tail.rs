//! Tail extraction: the short, sentence-aligned fragment of the latest edit
//! that is shown to the next generation call for continuity.

use crate::text::{is_terminal, suffix_chars};

/// Lower bound on the tail length used by the stage runner.
pub const MIN_TAIL_CHARS: usize = 200;

/// Tail length for a given overlap setting.
pub fn tail_budget(overlap_chars: usize) -> usize {
    MIN_TAIL_CHARS.max(overlap_chars)
}

/// Bounded trailing fragment of `text`.
///
/// Looks at the last `max_chars` characters and drops everything up to the
/// first sentence boundary in that window (terminal punctuation followed by
/// whitespace, or a newline), so the fragment starts on a sentence. When the
/// window has no usable boundary the whole window is returned, trimmed.
pub fn tail_of(text: &str, max_chars: usize) -> String {
    let window = suffix_chars(text, max_chars);

    let mut chars = window.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary_end = if c == '\n' {
            Some(i + c.len_utf8())
        } else if is_terminal(c) {
            chars
                .peek()
                .filter(|(_, next)| next.is_whitespace())
                .map(|_| i + c.len_utf8())
        } else {
            None
        };

        if let Some(end) = boundary_end {
            let rest = window[end..].trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
            break;
        }
    }

    window.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_without_inner_boundary_is_kept_whole() {
        assert_eq!(tail_of("Hello world. This is a tail.", 10), "is a tail.");
    }

    #[test]
    fn drops_partial_leading_sentence() {
        assert_eq!(tail_of("First one. Second part here.", 20), "Second part here.");
    }

    #[test]
    fn uses_first_boundary_in_window() {
        assert_eq!(
            tail_of("One. Two. Three.", 100),
            "Two. Three."
        );
    }

    #[test]
    fn newline_is_a_boundary() {
        assert_eq!(tail_of("heading line\nbody text", 100), "body text");
    }

    #[test]
    fn cjk_terminal_with_space() {
        assert_eq!(tail_of("第一句。 第二句。", 100), "第二句。");
    }

    #[test]
    fn boundary_at_window_end_returns_window() {
        assert_eq!(tail_of("  only one line\n", 100), "only one line");
    }

    #[test]
    fn short_text_without_boundary_is_trimmed_whole() {
        assert_eq!(tail_of("  no boundary here  ", 100), "no boundary here");
    }

    #[test]
    fn empty_text() {
        assert_eq!(tail_of("", 200), "");
    }

    #[test]
    fn never_exceeds_budget() {
        let text = "Sentence one goes here. ".repeat(50);
        for max in [1, 5, 24, 25, 200] {
            assert!(tail_of(&text, max).chars().count() <= max);
        }
    }

    #[test]
    fn budget_has_floor() {
        assert_eq!(tail_budget(50), 200);
        assert_eq!(tail_budget(350), 350);
    }
}
