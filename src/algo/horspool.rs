//! Boyer-Moore-Horspool, the general-purpose single-pattern default.
//!
//! A 256-entry bad-character table gives the shift distance for the byte
//! under the window's last position; mismatches skip ahead without
//! re-examining text. Degrades on repetitive patterns, which the selector
//! routes to KMP instead.

use std::borrow::Cow;

use super::{Emitter, ScanContext};

/// Scans `haystack` for `pattern`, offering every occurrence (including
/// overlapping ones) to the emitter in left-to-right order.
pub fn search(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    debug_assert!(!pattern.is_empty());
    let n = pattern.len();
    if haystack.len() < n {
        return;
    }

    let pattern = folded_pattern(ctx, pattern);
    let shift = build_shift_table(ctx, &pattern);

    let mut pos = 0;
    while pos + n <= haystack.len() {
        let mut j = n;
        while j > 0 && ctx.fold_byte(haystack[pos + j - 1]) == pattern[j - 1] {
            j -= 1;
        }
        if j == 0 {
            if em.emit(pos, pos + n).is_break() {
                return;
            }
            pos += 1;
        } else {
            let last = ctx.fold_byte(haystack[pos + n - 1]);
            pos += shift[last as usize].max(1);
        }
    }
}

/// Bad-character table over the (folded) pattern. When case-insensitive,
/// both case variants of each pattern byte carry the same shift so lookups
/// work on raw or folded text bytes alike.
fn build_shift_table(ctx: &ScanContext, pattern: &[u8]) -> [usize; 256] {
    let n = pattern.len();
    let mut shift = [n; 256];
    for (i, &b) in pattern.iter().enumerate().take(n - 1) {
        shift[b as usize] = n - 1 - i;
        if ctx.case_insensitive && b.is_ascii_lowercase() {
            shift[b.to_ascii_uppercase() as usize] = n - 1 - i;
        }
    }
    shift
}

pub(super) fn folded_pattern<'p>(ctx: &ScanContext, pattern: &'p [u8]) -> Cow<'p, [u8]> {
    if ctx.case_insensitive {
        Cow::Owned(pattern.iter().map(|&b| ctx.fold[b as usize]).collect())
    } else {
        Cow::Borrowed(pattern)
    }
}
