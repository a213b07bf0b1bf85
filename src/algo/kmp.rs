//! Knuth-Morris-Pratt for repetitive patterns.
//!
//! Horspool's bad-character shifts collapse to 1 on periodic patterns like
//! `"abab"` or `"aaaa"`; KMP's failure function handles those without ever
//! retreating the text pointer. After a full match the state falls back via
//! the LPS table, so self-overlapping occurrences are all reported.

use super::{horspool::folded_pattern, Emitter, ScanContext};

/// Standard two-pointer scan over the LPS (longest proper prefix-suffix)
/// table built from the folded pattern.
pub fn search(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    debug_assert!(!pattern.is_empty());
    let pattern = folded_pattern(ctx, pattern);
    let n = pattern.len();
    if haystack.len() < n {
        return;
    }

    let lps = build_lps(&pattern);
    let mut matched = 0;
    for (i, &raw) in haystack.iter().enumerate() {
        let b = ctx.fold_byte(raw);
        while matched > 0 && pattern[matched] != b {
            matched = lps[matched - 1];
        }
        if pattern[matched] == b {
            matched += 1;
        }
        if matched == n {
            let start = i + 1 - n;
            if em.emit(start, i + 1).is_break() {
                return;
            }
            matched = lps[n - 1];
        }
    }
}

/// `lps[i]` = length of the longest proper prefix of `pattern[..=i]` that is
/// also a suffix of it.
fn build_lps(pattern: &[u8]) -> Vec<usize> {
    let mut lps = vec![0; pattern.len()];
    let mut len = 0;
    let mut i = 1;
    while i < pattern.len() {
        if pattern[i] == pattern[len] {
            len += 1;
            lps[i] = len;
            i += 1;
        } else if len > 0 {
            len = lps[len - 1];
        } else {
            lps[i] = 0;
            i += 1;
        }
    }
    lps
}

/// Repetitiveness test backing the selector: a run of identical bytes at
/// least half the pattern long, or a short period that tiles the whole
/// pattern.
pub fn is_repetitive(pattern: &[u8]) -> bool {
    let n = pattern.len();
    if n < 2 {
        return false;
    }

    let mut run = 1;
    let mut best_run = 1;
    for w in pattern.windows(2) {
        if w[0] == w[1] {
            run += 1;
            best_run = best_run.max(run);
        } else {
            run = 1;
        }
    }
    if best_run * 2 >= n {
        return true;
    }

    for period in 1..=n / 2 {
        if n % period == 0 && pattern.iter().zip(&pattern[period..]).all(|(a, b)| a == b) {
            return true;
        }
    }
    false
}
