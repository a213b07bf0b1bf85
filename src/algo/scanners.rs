//! memchr-backed scanners for 1-3 byte patterns.
//!
//! The byte-search primitive finds candidate first-byte positions (both case
//! variants at once when insensitive, via `memchr2`); candidates are batched
//! into a small fixed-size buffer before flushing through the emitter so the
//! per-position bookkeeping amortizes over a full batch.

use memchr::{memchr2_iter, memchr_iter};
use std::ops::ControlFlow;

use super::{Emitter, ScanContext};

const BATCH: usize = 64;

/// Trivial single-byte scan (plus case-alternate when insensitive).
pub fn single_byte(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    debug_assert_eq!(pattern.len(), 1);
    let _ = scan_first_byte(ctx, pattern[0], haystack, |batch| {
        for &pos in batch {
            em.emit(pos, pos + 1)?;
        }
        ControlFlow::Continue(())
    });
}

/// 2-3 byte patterns: byte-search the first byte, verify the remaining 1-2
/// bytes directly.
pub fn short_scan(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    debug_assert!((2..=3).contains(&pattern.len()));
    let n = pattern.len();
    if haystack.len() < n {
        return;
    }
    let tail_limit = haystack.len() - n;

    let _ = scan_first_byte(ctx, pattern[0], haystack, |batch| {
        for &pos in batch {
            if pos > tail_limit {
                // Too close to the end for a full window; later candidates
                // only sit further right, but the batch must still drain.
                continue;
            }
            if ctx.window_eq_tail(&pattern[1..], &haystack[pos + 1..pos + n]) {
                em.emit(pos, pos + n)?;
            }
        }
        ControlFlow::Continue(())
    });
}

/// Runs the byte-search primitive over the haystack, handing candidate
/// positions to `flush` in batches of at most [`BATCH`].
fn scan_first_byte<F>(
    ctx: &ScanContext,
    first: u8,
    haystack: &[u8],
    mut flush: F,
) -> ControlFlow<()>
where
    F: FnMut(&[usize]) -> ControlFlow<()>,
{
    let mut batch = [0usize; BATCH];
    let mut filled = 0;

    let alternate = case_alternate(ctx, first);
    macro_rules! drain {
        ($iter:expr) => {
            for pos in $iter {
                batch[filled] = pos;
                filled += 1;
                if filled == BATCH {
                    flush(&batch[..filled])?;
                    filled = 0;
                }
            }
        };
    }

    match alternate {
        Some(alt) => drain!(memchr2_iter(first, alt, haystack)),
        None => drain!(memchr_iter(first, haystack)),
    }

    if filled > 0 {
        flush(&batch[..filled])?;
    }
    ControlFlow::Continue(())
}

fn case_alternate(ctx: &ScanContext, b: u8) -> Option<u8> {
    if !ctx.case_insensitive || !b.is_ascii_alphabetic() {
        return None;
    }
    Some(b ^ 0x20)
}

impl ScanContext {
    /// Verifies the 1-2 trailing bytes of a short pattern. The pattern side
    /// arrives as configured; folding is applied to both sides here.
    #[inline]
    fn window_eq_tail(&self, pattern_tail: &[u8], window: &[u8]) -> bool {
        pattern_tail
            .iter()
            .zip(window)
            .all(|(&p, &w)| self.fold_byte(p) == self.fold_byte(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::results::MatchStore;

    fn run_single(pattern: &[u8], haystack: &[u8], ci: bool) -> Vec<(usize, usize)> {
        let ctx = ScanContext::new(ci);
        let config = SearchConfig::default();
        let mut store = MatchStore::with_capacity(0).unwrap();
        let mut em = Emitter::new(haystack, haystack.len(), &config, Some(&mut store));
        single_byte(&ctx, pattern, haystack, &mut em);
        store.iter().map(|s| (s.start, s.end)).collect()
    }

    fn run_short(pattern: &[u8], haystack: &[u8], ci: bool) -> Vec<(usize, usize)> {
        let ctx = ScanContext::new(ci);
        let config = SearchConfig::default();
        let mut store = MatchStore::with_capacity(0).unwrap();
        let mut em = Emitter::new(haystack, haystack.len(), &config, Some(&mut store));
        short_scan(&ctx, pattern, haystack, &mut em);
        store.iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn test_single_byte_positions() {
        let spans = run_single(b"o", b"foo bor", false);
        assert_eq!(spans, vec![(1, 2), (2, 3), (5, 6)]);
    }

    #[test]
    fn test_single_byte_case_insensitive() {
        let spans = run_single(b"a", b"AbaBA", true);
        assert_eq!(spans, vec![(0, 1), (2, 3), (4, 5)]);
    }

    #[test]
    fn test_short_two_bytes() {
        let spans = run_short(b"ab", b"ab cab ab", false);
        assert_eq!(spans, vec![(0, 2), (4, 6), (7, 9)]);
    }

    #[test]
    fn test_short_three_bytes() {
        let spans = run_short(b"abc", b"abcabcab", false);
        assert_eq!(spans, vec![(0, 3), (3, 6)]);
    }

    #[test]
    fn test_short_case_insensitive() {
        let spans = run_short(b"aB", b"ab AB Ab xx", true);
        assert_eq!(spans, vec![(0, 2), (3, 5), (6, 8)]);
    }

    #[test]
    fn test_short_candidate_at_buffer_edge() {
        // First byte matches at the last position but no room for the tail
        let spans = run_short(b"ab", b"cba", false);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_batched_flush_beyond_batch_size() {
        let haystack = vec![b'x'; 1000];
        let spans = run_single(b"x", &haystack, false);
        assert_eq!(spans.len(), 1000);
        assert_eq!(spans[999], (999, 1000));
    }

    #[test]
    fn test_cap_respected_across_batches() {
        let ctx = ScanContext::new(false);
        let config = SearchConfig {
            max_count: Some(70),
            track_positions: false,
            ..SearchConfig::default()
        };
        let haystack = vec![b'x'; 1000];
        let mut em = Emitter::new(&haystack, haystack.len(), &config, None);
        single_byte(&ctx, b"x", &haystack, &mut em);
        assert_eq!(em.count(), 70);
    }
}
