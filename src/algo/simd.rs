//! Vectorized first-byte scanners, 128-bit (SSE2) and 256-bit (AVX2).
//!
//! Both broadcast the pattern's first byte across a vector register,
//! compare a loaded window of text, extract a candidate bit-mask, and
//! verify every candidate with a direct byte comparison before accepting
//! it. The 256-bit variant additionally folds the loaded window A-Z to a-z
//! in-register, which is what allows it to serve case-insensitive
//! searches. Unaligned tails shorter than one vector go through the scalar
//! fallback. Feature presence is detected at runtime; the selector never
//! routes here when the CPU lacks the instruction set.

use std::ops::ControlFlow;

use super::horspool::folded_pattern;
use super::{Emitter, ScanContext};

/// Longest pattern the 128-bit scanner accepts.
pub const SIMD128_MAX_PATTERN: usize = 16;
/// Longest pattern the 256-bit scanner accepts.
pub const SIMD256_MAX_PATTERN: usize = 32;

pub fn simd128_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("sse2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

pub fn simd256_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("avx2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// 128-bit scanner; case-sensitive patterns up to 16 bytes.
pub fn search_128(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    debug_assert!(!pattern.is_empty() && pattern.len() <= SIMD128_MAX_PATTERN);
    debug_assert!(!ctx.case_insensitive);
    if haystack.len() < pattern.len() {
        return;
    }

    #[cfg(target_arch = "x86_64")]
    if is_x86_feature_detected!("sse2") {
        // Safety: SSE2 presence just checked.
        unsafe { search_128_impl(ctx, pattern, haystack, em) };
        return;
    }

    let _ = scalar_scan(ctx, pattern, haystack, 0, em);
}

/// 256-bit scanner; patterns up to 32 bytes, case-insensitive supported.
pub fn search_256(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    debug_assert!(!pattern.is_empty() && pattern.len() <= SIMD256_MAX_PATTERN);
    if haystack.len() < pattern.len() {
        return;
    }
    let pattern = folded_pattern(ctx, pattern);

    #[cfg(target_arch = "x86_64")]
    if is_x86_feature_detected!("avx2") {
        // Safety: AVX2 presence just checked.
        unsafe { search_256_impl(ctx, &pattern, haystack, em) };
        return;
    }

    let _ = scalar_scan(ctx, &pattern, haystack, 0, em);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn search_128_impl(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    use std::arch::x86_64::*;

    let n = pattern.len();
    let first = _mm_set1_epi8(pattern[0] as i8);

    let mut i = 0;
    while i + 16 <= haystack.len() {
        let window = _mm_loadu_si128(haystack.as_ptr().add(i) as *const __m128i);
        let mut mask = _mm_movemask_epi8(_mm_cmpeq_epi8(window, first)) as u32;
        while mask != 0 {
            let pos = i + mask.trailing_zeros() as usize;
            mask &= mask - 1;
            if pos + n <= haystack.len() && &haystack[pos..pos + n] == pattern {
                if em.emit(pos, pos + n).is_break() {
                    return;
                }
            }
        }
        i += 16;
    }

    let _ = scalar_scan(ctx, pattern, haystack, i, em);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn search_256_impl(ctx: &ScanContext, pattern: &[u8], haystack: &[u8], em: &mut Emitter) {
    use std::arch::x86_64::*;

    let n = pattern.len();
    let first = _mm256_set1_epi8(pattern[0] as i8);

    let mut i = 0;
    while i + 32 <= haystack.len() {
        let mut window = _mm256_loadu_si256(haystack.as_ptr().add(i) as *const __m256i);
        if ctx.case_insensitive {
            window = fold_window_avx2(window);
        }
        let mut mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(window, first)) as u32;
        while mask != 0 {
            let pos = i + mask.trailing_zeros() as usize;
            mask &= mask - 1;
            if pos + n <= haystack.len() && ctx.window_eq(pattern, &haystack[pos..pos + n]) {
                if em.emit(pos, pos + n).is_break() {
                    return;
                }
            }
        }
        i += 32;
    }

    let _ = scalar_scan(ctx, pattern, haystack, i, em);
}

/// Vectorized A-Z to a-z: set bit 0x20 on every byte in the uppercase
/// range, leave everything else untouched (bytes >= 0x80 compare negative
/// under signed epi8 and fall outside the range).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn fold_window_avx2(
    window: std::arch::x86_64::__m256i,
) -> std::arch::x86_64::__m256i {
    use std::arch::x86_64::*;

    let below_a = _mm256_set1_epi8((b'A' - 1) as i8);
    let above_z = _mm256_set1_epi8((b'Z' + 1) as i8);
    let is_upper = _mm256_and_si256(
        _mm256_cmpgt_epi8(window, below_a),
        _mm256_cmpgt_epi8(above_z, window),
    );
    _mm256_or_si256(window, _mm256_and_si256(is_upper, _mm256_set1_epi8(0x20)))
}

/// Byte-at-a-time verify loop covering candidate starts from `from` to the
/// last full window; also the whole search on targets without the vector
/// units. Expects the pattern pre-folded when case-insensitive.
fn scalar_scan(
    ctx: &ScanContext,
    pattern: &[u8],
    haystack: &[u8],
    from: usize,
    em: &mut Emitter,
) -> ControlFlow<()> {
    let n = pattern.len();
    if n == 0 || haystack.len() < n {
        return ControlFlow::Continue(());
    }
    let mut pos = from;
    while pos + n <= haystack.len() {
        if ctx.window_eq(pattern, &haystack[pos..pos + n]) {
            em.emit(pos, pos + n)?;
        }
        pos += 1;
    }
    ControlFlow::Continue(())
}
