pub mod horspool;
pub mod kmp;
pub mod scanners;
pub mod simd;

use dashmap::DashMap;
use memchr::memchr;
use once_cell::sync::Lazy;
use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::automaton::Automaton;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::folding::{self, FoldTable};
use crate::pattern::PatternSet;
use crate::results::MatchStore;

/// Patterns at or above this length never take the KMP route; Horspool's
/// bad-character shifts dominate once windows get long.
const REPETITIVE_MAX_LEN: usize = 64;

static REGEX_CACHE: Lazy<DashMap<String, Arc<Regex>>> = Lazy::new(DashMap::new);

/// Shared read-only inputs for one scan: the process-wide folding table and
/// the sensitivity flag, injected into every algorithm call.
#[derive(Clone, Copy)]
pub struct ScanContext {
    pub fold: &'static FoldTable,
    pub case_insensitive: bool,
}

impl ScanContext {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            fold: folding::table(),
            case_insensitive,
        }
    }

    /// Folds `b` when running case-insensitively, otherwise passes it
    /// through untouched.
    #[inline]
    pub fn fold_byte(&self, b: u8) -> u8 {
        if self.case_insensitive {
            self.fold[b as usize]
        } else {
            b
        }
    }

    /// Compares a window of text against an (already folded, if insensitive)
    /// pattern.
    #[inline]
    pub fn window_eq(&self, pattern: &[u8], window: &[u8]) -> bool {
        if self.case_insensitive {
            pattern
                .iter()
                .zip(window)
                .all(|(&p, &w)| p == self.fold[w as usize])
        } else {
            pattern == window
        }
    }
}

/// Central match-acceptance pipeline shared by every algorithm.
///
/// Each candidate a scan discovers is pushed through `emit`, which applies
/// in order: the ownership window (overlap bytes at a chunk's tail are
/// scan-only lookahead and never reported), whole-word filtering, per-line
/// deduplication in line-counting mode, store insertion when positions are
/// tracked, and the exclusive match cap. `emit` returning `Break` obliges
/// the algorithm to stop scanning immediately.
pub struct Emitter<'a> {
    haystack: &'a [u8],
    owned_len: usize,
    whole_word: bool,
    count_lines: bool,
    remaining: Option<u64>,
    count: u64,
    next_countable: usize,
    store: Option<&'a mut MatchStore>,
    dropped: u64,
    prev_byte: Option<u8>,
    next_byte: Option<u8>,
}

impl<'a> Emitter<'a> {
    pub fn new(
        haystack: &'a [u8],
        owned_len: usize,
        config: &SearchConfig,
        store: Option<&'a mut MatchStore>,
    ) -> Self {
        Self {
            haystack,
            owned_len,
            whole_word: config.whole_word,
            count_lines: config.count_lines,
            remaining: config.max_count,
            count: 0,
            next_countable: 0,
            store,
            dropped: 0,
            prev_byte: None,
            next_byte: None,
        }
    }

    /// Declares the bytes adjacent to this buffer in the surrounding text.
    /// A chunk's slice edges are not real text boundaries, so whole-word
    /// checks must see the true neighbor bytes where they exist.
    pub fn with_neighbors(mut self, prev: Option<u8>, next: Option<u8>) -> Self {
        self.prev_byte = prev;
        self.next_byte = next;
        self
    }

    /// True once the match cap has been reached; no further match may be
    /// recorded.
    pub fn capped(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Offers a candidate match. `Break` means the cap is reached and the
    /// scan must halt without processing another byte.
    pub fn emit(&mut self, start: usize, end: usize) -> ControlFlow<()> {
        debug_assert!(start <= end && end <= self.haystack.len());
        if self.capped() {
            return ControlFlow::Break(());
        }
        if start >= self.owned_len && !(start == 0 && self.owned_len == 0) {
            // Lookahead-only region of an overlapped chunk; a later chunk
            // owns this position.
            return ControlFlow::Continue(());
        }
        if self.whole_word && !self.word_bounded(start, end) {
            return ControlFlow::Continue(());
        }
        if self.count_lines {
            if start < self.next_countable {
                return ControlFlow::Continue(());
            }
            self.next_countable = match memchr(b'\n', &self.haystack[end..]) {
                Some(i) => end + i + 1,
                None => self.haystack.len().max(1),
            };
        }

        self.count += 1;
        if let Some(store) = self.store.as_deref_mut() {
            if let Err(e) = store.add(start, end) {
                // Degraded mode: the match stays counted but its position is
                // lost. The reported count may exceed the stored list.
                warn!("dropping match position [{start}, {end}): {e}");
                self.dropped += 1;
            }
        }

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn word_bounded(&self, start: usize, end: usize) -> bool {
        let before = if start == 0 {
            self.prev_byte
        } else {
            Some(self.haystack[start - 1])
        };
        let after = if end >= self.haystack.len() {
            self.next_byte
        } else {
            Some(self.haystack[end])
        };
        before.map_or(true, |b| !is_word_byte(b)) && after.map_or(true, |b| !is_word_byte(b))
    }
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Selectable single-pattern routines, for the forced-algorithm override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    SingleByte,
    ShortScan,
    Simd128,
    Simd256,
    Kmp,
    Horspool,
    AhoCorasick,
}

impl AlgorithmKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleByte => "single-byte",
            Self::ShortScan => "short-scan",
            Self::Simd128 => "simd-128",
            Self::Simd256 => "simd-256",
            Self::Kmp => "kmp",
            Self::Horspool => "horspool",
            Self::AhoCorasick => "aho-corasick",
        }
    }
}

/// The routine the selector settled on, carrying whatever that routine
/// needs: the literal pattern, the prebuilt automaton, or the compiled
/// regex. Dispatch is a plain `match`; the variant also knows its display
/// name for diagnostics.
pub enum SelectedAlgo {
    /// Single empty literal pattern: one match at the start of the text.
    EmptyPattern,
    SingleByte(Vec<u8>),
    ShortScan(Vec<u8>),
    Simd128(Vec<u8>),
    Simd256(Vec<u8>),
    Kmp(Vec<u8>),
    Horspool(Vec<u8>),
    AhoCorasick(Automaton),
    Regex(Arc<Regex>),
}

impl SelectedAlgo {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmptyPattern => "empty-pattern",
            Self::SingleByte(_) => AlgorithmKind::SingleByte.name(),
            Self::ShortScan(_) => AlgorithmKind::ShortScan.name(),
            Self::Simd128(_) => AlgorithmKind::Simd128.name(),
            Self::Simd256(_) => AlgorithmKind::Simd256.name(),
            Self::Kmp(_) => AlgorithmKind::Kmp.name(),
            Self::Horspool(_) => AlgorithmKind::Horspool.name(),
            Self::AhoCorasick(_) => AlgorithmKind::AhoCorasick.name(),
            Self::Regex(_) => "regex",
        }
    }

    /// Runs the selected routine over one buffer. `at_text_start` is true
    /// only for the chunk at offset zero, so empty-pattern matches fire
    /// exactly once per text.
    pub fn run(&self, ctx: &ScanContext, haystack: &[u8], at_text_start: bool, em: &mut Emitter) {
        if em.capped() {
            return;
        }
        match self {
            Self::EmptyPattern => {
                if at_text_start {
                    let _ = em.emit(0, 0);
                }
            }
            Self::SingleByte(p) => scanners::single_byte(ctx, p, haystack, em),
            Self::ShortScan(p) => scanners::short_scan(ctx, p, haystack, em),
            Self::Simd128(p) => simd::search_128(ctx, p, haystack, em),
            Self::Simd256(p) => simd::search_256(ctx, p, haystack, em),
            Self::Kmp(p) => kmp::search(ctx, p, haystack, em),
            Self::Horspool(p) => horspool::search(ctx, p, haystack, em),
            Self::AhoCorasick(automaton) => automaton.search(ctx, haystack, at_text_start, em),
            Self::Regex(re) => {
                for m in re.find_iter(haystack) {
                    if em.emit(m.start(), m.end()).is_break() {
                        return;
                    }
                }
            }
        }
    }
}

/// Maps the shape of the pattern set to a concrete routine. Pure decision
/// function: regex delegates out, multiple literals go to Aho-Corasick,
/// single literals pick by length, SIMD fit, and repetitiveness.
pub fn select(config: &SearchConfig, set: &PatternSet) -> SearchResult<SelectedAlgo> {
    if config.is_regex {
        return Ok(SelectedAlgo::Regex(compile_regex(
            &config.patterns,
            config.case_insensitive,
        )?));
    }
    if set.is_empty() {
        return Err(SearchError::invalid_pattern("empty pattern set"));
    }
    if set.len() > 1 {
        return Ok(SelectedAlgo::AhoCorasick(Automaton::build(
            set,
            config.case_insensitive,
        )));
    }

    let pattern = set.get(0).unwrap_or_default().to_vec();
    if pattern.is_empty() {
        return Ok(SelectedAlgo::EmptyPattern);
    }

    if let Some(kind) = config.force_algorithm {
        match force(kind, &pattern, config, set) {
            Some(algo) => {
                debug!("forced algorithm: {}", algo.name());
                return Ok(algo);
            }
            None => {
                warn!(
                    "forced algorithm {} not applicable to this pattern, falling back to policy",
                    kind.name()
                );
            }
        }
    }

    let simd_ok = !config.no_simd;
    let ci = config.case_insensitive;
    let algo = match pattern.len() {
        1 => SelectedAlgo::SingleByte(pattern),
        2..=3 => {
            if simd_ok && !ci && simd::simd128_available() {
                SelectedAlgo::Simd128(pattern)
            } else {
                SelectedAlgo::ShortScan(pattern)
            }
        }
        len => {
            if simd_ok && simd::simd256_available() && len <= simd::SIMD256_MAX_PATTERN {
                SelectedAlgo::Simd256(pattern)
            } else if simd_ok
                && !ci
                && simd::simd128_available()
                && len <= simd::SIMD128_MAX_PATTERN
            {
                SelectedAlgo::Simd128(pattern)
            } else if len < REPETITIVE_MAX_LEN && kmp::is_repetitive(&pattern) {
                SelectedAlgo::Kmp(pattern)
            } else {
                SelectedAlgo::Horspool(pattern)
            }
        }
    };
    Ok(algo)
}

/// Validates a forced override against the pattern it would run on. Returns
/// `None` when the routine cannot handle the request.
fn force(
    kind: AlgorithmKind,
    pattern: &[u8],
    config: &SearchConfig,
    set: &PatternSet,
) -> Option<SelectedAlgo> {
    let p = pattern.to_vec();
    match kind {
        AlgorithmKind::SingleByte if p.len() == 1 => Some(SelectedAlgo::SingleByte(p)),
        AlgorithmKind::ShortScan if (2..=3).contains(&p.len()) => Some(SelectedAlgo::ShortScan(p)),
        AlgorithmKind::Simd128
            if !config.case_insensitive
                && p.len() <= simd::SIMD128_MAX_PATTERN
                && simd::simd128_available() =>
        {
            Some(SelectedAlgo::Simd128(p))
        }
        AlgorithmKind::Simd256
            if p.len() <= simd::SIMD256_MAX_PATTERN && simd::simd256_available() =>
        {
            Some(SelectedAlgo::Simd256(p))
        }
        AlgorithmKind::Kmp => Some(SelectedAlgo::Kmp(p)),
        AlgorithmKind::Horspool => Some(SelectedAlgo::Horspool(p)),
        AlgorithmKind::AhoCorasick => Some(SelectedAlgo::AhoCorasick(Automaton::build(
            set,
            config.case_insensitive,
        ))),
        _ => None,
    }
}

/// Compiles the pattern list into one byte-oriented regex, joining multiple
/// patterns into a non-capturing alternation. Compiled handles are cached
/// process-wide keyed by (flags, source).
fn compile_regex(patterns: &[String], case_insensitive: bool) -> SearchResult<Arc<Regex>> {
    if patterns.is_empty() {
        return Err(SearchError::invalid_pattern("empty pattern set"));
    }

    let source = if patterns.len() == 1 {
        patterns[0].clone()
    } else {
        // Guard the combined buffer size before building the alternation.
        let mut combined = 0usize;
        for p in patterns {
            combined = combined
                .checked_add(p.len())
                .and_then(|n| n.checked_add(5))
                .ok_or(SearchError::CapacityOverflow("combined pattern"))?;
        }
        let mut source = String::with_capacity(combined);
        for (i, p) in patterns.iter().enumerate() {
            if i > 0 {
                source.push('|');
            }
            source.push_str("(?:");
            source.push_str(p);
            source.push(')');
        }
        source
    };

    let key = format!("{}\u{1}{}", case_insensitive as u8, source);
    if let Some(entry) = REGEX_CACHE.get(&key) {
        return Ok(entry.clone());
    }

    let regex = RegexBuilder::new(&source)
        .case_insensitive(case_insensitive)
        .unicode(false)
        .build()
        .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
    let regex = Arc::new(regex);
    REGEX_CACHE.insert(key, regex.clone());
    Ok(regex)
}
