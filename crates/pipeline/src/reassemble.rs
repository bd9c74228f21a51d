//! Reassembly of edited chunks into one document.
//!
//! Neighbouring chunks were cut with a shared overlap. If that overlap
//! survived editing verbatim, it is removed once; otherwise the chunks are
//! joined with a blank line and the seam stays visible.

use crate::text::byte_offset;

/// Overlaps shorter than this are treated as coincidence.
pub const MIN_OVERLAP: usize = 20;

const SEAM: &str = "\n\n";

/// Decides how many leading characters of `next` duplicate the end of `acc`.
///
/// `max_check` is already bounded by the overlap hint and by half of each
/// side. Return `None` when no overlap of at least [`MIN_OVERLAP`] is found.
pub trait OverlapMatcher {
    fn overlap(&self, acc: &str, next: &str, max_check: usize) -> Option<usize>;
}

/// Literal suffix/prefix equality, longest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl OverlapMatcher for ExactMatcher {
    fn overlap(&self, acc: &str, next: &str, max_check: usize) -> Option<usize> {
        if max_check < MIN_OVERLAP {
            return None;
        }
        let tail: Vec<char> = acc.chars().rev().take(max_check).collect();
        let head: Vec<char> = next.chars().take(max_check).collect();

        (MIN_OVERLAP..=max_check).rev().find(|&k| {
            // tail is reversed: its first k chars are the last k of acc.
            tail[..k].iter().rev().eq(head[..k].iter())
        })
    }
}

/// Join chunks with [`ExactMatcher`].
pub fn reassemble<S: AsRef<str>>(chunks: &[S], overlap_hint: usize) -> String {
    reassemble_with(&ExactMatcher, chunks, overlap_hint)
}

/// Join chunks, dropping the duplicated overlap `matcher` finds at each seam.
pub fn reassemble_with<S: AsRef<str>>(
    matcher: &dyn OverlapMatcher,
    chunks: &[S],
    overlap_hint: usize,
) -> String {
    let mut iter = chunks.iter().map(|c| c.as_ref());
    let Some(first) = iter.next() else {
        return String::new();
    };

    let mut acc = first.to_string();
    let mut acc_chars = acc.chars().count();

    for next in iter {
        let next_chars = next.chars().count();
        let max_check = overlap_hint.min(acc_chars / 2).min(next_chars / 2);

        match matcher.overlap(&acc, next, max_check) {
            Some(k) => {
                let k = k.min(next_chars);
                let skip = byte_offset(next, k);
                acc.push_str(&next[skip..]);
                acc_chars += next_chars - k;
            }
            None => {
                acc.push_str(SEAM);
                acc.push_str(next);
                acc_chars += SEAM.len() + next_chars;
            }
        }
    }

    acc
}
