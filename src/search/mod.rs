mod chunked;

use std::sync::Arc;
use tracing::{debug, info};

use crate::algo::{self, ScanContext, SelectedAlgo};
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::pattern::PatternSet;
use crate::pool::ThreadPool;
use crate::results::SearchOutcome;

use self::chunked::Emitted;

/// Compiled search engine: the pattern set, the routine the selector chose
/// for it, and a worker pool for chunked file searches. Construction does
/// all the fallible pattern work (regex compilation, automaton build) so
/// each subsequent search only scans.
pub struct SearchEngine {
    config: Arc<SearchConfig>,
    patterns: Arc<PatternSet>,
    algo: Arc<SelectedAlgo>,
    pool: ThreadPool,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("algo", &self.algo.name())
            .field("patterns", &self.config.patterns)
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        if config.patterns.is_empty() {
            return Err(SearchError::invalid_pattern("no search patterns provided"));
        }
        if config.min_chunk_size == 0 {
            // Chunk planning divides by this; zero is reachable from a
            // config file and must be rejected up front.
            return Err(SearchError::config_error("min_chunk_size must be at least 1"));
        }

        let patterns = PatternSet::from_strings(&config.patterns);
        let algo = algo::select(&config, &patterns)?;
        info!(
            "selected algorithm {} for {} pattern(s)",
            algo.name(),
            patterns.len()
        );

        let pool = ThreadPool::new(config.thread_count)?;
        Ok(Self {
            config: Arc::new(config),
            patterns: Arc::new(patterns),
            algo: Arc::new(algo),
            pool,
        })
    }

    /// Display name of the routine the selector picked, for diagnostics.
    pub fn algorithm_name(&self) -> &'static str {
        self.algo.name()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches an in-memory buffer on the calling thread.
    pub fn search_slice(&self, haystack: &[u8]) -> SearchResult<SearchOutcome> {
        debug!("slice search over {} bytes", haystack.len());
        let ctx = ScanContext::new(self.config.case_insensitive);
        let Emitted {
            count,
            dropped,
            store,
        } = chunked::run_span(
            &self.algo,
            &self.config,
            &ctx,
            haystack,
            haystack.len(),
            true,
            (None, None),
        )?;

        let spans = store.map(|mut s| {
            s.sort();
            s
        });
        Ok(SearchOutcome {
            count,
            spans,
            dropped,
        })
    }

    /// Searches a file with memory-mapped, chunked, multithreaded scanning.
    /// See [`chunked`] for the orchestration contract.
    ///
    /// Chunk overlap is sized from the pattern bytes, so for regex patterns
    /// a match that is longer than its pattern source and straddles a chunk
    /// boundary can be missed. When a regex can match more bytes than its
    /// source text, search the whole buffer with
    /// [`SearchEngine::search_slice`] instead.
    pub fn search_file(&self, path: &std::path::Path) -> SearchResult<SearchOutcome> {
        chunked::search_file(
            path,
            &self.config,
            &self.patterns,
            &self.algo,
            &self.pool,
        )
    }
}

/// One-shot convenience: build an engine and search a UTF-8 string.
pub fn search_str(config: SearchConfig, haystack: &str) -> SearchResult<SearchOutcome> {
    SearchEngine::new(config)?.search_slice(haystack.as_bytes())
}
