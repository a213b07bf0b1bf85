//! Chunked multithreaded file search.
//!
//! One invocation walks OPEN, MAP, CHUNK, DISPATCH, JOIN, MERGE, REPORT;
//! every exit path, error or not, releases the map, the chunk slots, and
//! the local stores through ordinary scope-bound drops.
//!
//! The file is mapped read-only and partitioned into per-worker chunks.
//! Every chunk except the last is extended by `max_pattern_len - 1`
//! lookahead bytes so a match straddling a chunk boundary is fully visible
//! to the chunk that owns its start position; the emitter's ownership
//! window keeps the lookahead region report-free, so each match is reported
//! by exactly one chunk. Workers share nothing mutable: each owns its slice
//! view, its emitter, and its local store until the merge after
//! `wait_all`.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace, warn};

use crate::algo::{Emitter, ScanContext, SelectedAlgo};
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::pattern::PatternSet;
use crate::pool::ThreadPool;
use crate::results::{MatchStore, SearchOutcome};

/// What one emitter run produced: the count, any dropped positions, and the
/// local store when positions are tracked.
pub(crate) struct Emitted {
    pub count: u64,
    pub dropped: u64,
    pub store: Option<MatchStore>,
}

/// Per-chunk slice of the mapped file. `scan_len` includes the lookahead
/// overlap; `owned_len` is the range this chunk reports matches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkDescriptor {
    start: usize,
    owned_len: usize,
    scan_len: usize,
}

/// Runs the selected routine over one span of text with a fresh emitter and
/// (when tracking) a fresh local store. `neighbors` carries the bytes
/// adjacent to `haystack` in the surrounding text, `None` at a real text
/// edge; whole-word checks depend on them at chunk seams.
pub(crate) fn run_span(
    algo: &SelectedAlgo,
    config: &SearchConfig,
    ctx: &ScanContext,
    haystack: &[u8],
    owned_len: usize,
    at_text_start: bool,
    neighbors: (Option<u8>, Option<u8>),
) -> SearchResult<Emitted> {
    let mut store = if config.track_positions {
        Some(MatchStore::with_capacity(0)?)
    } else {
        None
    };
    let mut em = Emitter::new(haystack, owned_len, config, store.as_mut())
        .with_neighbors(neighbors.0, neighbors.1);
    algo.run(ctx, haystack, at_text_start, &mut em);
    Ok(Emitted {
        count: em.count(),
        dropped: em.dropped(),
        store,
    })
}

pub(crate) fn search_file(
    path: &Path,
    config: &Arc<SearchConfig>,
    patterns: &Arc<PatternSet>,
    algo: &Arc<SelectedAlgo>,
    pool: &ThreadPool,
) -> SearchResult<SearchOutcome> {
    // OPEN
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SearchError::file_not_found(path),
        std::io::ErrorKind::PermissionDenied => SearchError::permission_denied(path),
        _ => SearchError::IoError(e),
    })?;
    let size = file.metadata().map_err(SearchError::IoError)?.len() as usize;
    let ctx = ScanContext::new(config.case_insensitive);

    if size == 0 {
        // Terminal fast path; an empty pattern still matches the empty file.
        let emitted = run_span(algo, config, &ctx, b"", 0, true, (None, None))?;
        return Ok(finish(emitted.count, emitted.dropped, emitted.store, config));
    }

    // MAP
    let data = Arc::new(map_file(&file)?);

    // CHUNK
    let chunks = plan_chunks(size, patterns.max_len(), config);
    debug!(
        "searching {} in {} chunk(s) of ~{} bytes",
        path.display(),
        chunks.len(),
        chunks[0].owned_len
    );

    // DISPATCH: one task per chunk, each writing its own slot.
    let slots: Vec<Arc<Mutex<Option<SearchResult<Emitted>>>>> = (0..chunks.len())
        .map(|_| Arc::new(Mutex::new(None)))
        .collect();

    for (chunk, slot) in chunks.iter().copied().zip(&slots) {
        let data = Arc::clone(&data);
        let algo = Arc::clone(algo);
        let config = Arc::clone(config);
        let slot = Arc::clone(slot);
        let task = move || {
            trace!("chunk at {} scanning {} bytes", chunk.start, chunk.scan_len);
            let slice = &data[chunk.start..chunk.start + chunk.scan_len];
            let neighbors = (
                chunk.start.checked_sub(1).map(|i| data[i]),
                data.get(chunk.start + chunk.scan_len).copied(),
            );
            let result = run_span(
                &algo,
                &config,
                &ctx,
                slice,
                chunk.owned_len,
                chunk.start == 0,
                neighbors,
            );
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        };
        if let Err(task) = pool.execute(task) {
            warn!("thread pool rejected chunk task, running inline");
            task();
        }
    }

    // JOIN
    pool.wait_all();

    // MERGE
    let mut total = 0u64;
    let mut dropped = 0u64;
    let mut global = if config.track_positions {
        Some(MatchStore::with_capacity(0)?)
    } else {
        None
    };
    for (chunk, slot) in chunks.iter().zip(slots) {
        let result = slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| {
                SearchError::chunk_failed(format!("chunk at offset {} never ran", chunk.start))
            })?;
        let emitted = result?;
        total += emitted.count;
        dropped += emitted.dropped;
        if let (Some(global), Some(local)) = (global.as_mut(), emitted.store.as_ref()) {
            global.merge(local, chunk.start)?;
        }
    }

    // REPORT; CLEANUP happens on drop of the map and slots.
    Ok(finish(total, dropped, global, config))
}

/// Sorts the global store and clamps count and spans to the match cap. Each
/// chunk honors the cap locally, so the merged sum may exceed it.
fn finish(
    count: u64,
    dropped: u64,
    mut spans: Option<MatchStore>,
    config: &SearchConfig,
) -> SearchOutcome {
    let count = match config.max_count {
        Some(cap) => count.min(cap),
        None => count,
    };
    if let Some(store) = spans.as_mut() {
        store.sort();
        if let Some(cap) = config.max_count {
            store.truncate(cap as usize);
        }
    }
    SearchOutcome {
        count,
        spans,
        dropped,
    }
}

/// Maps the file read-only, preferring a page-populating mapping where the
/// platform offers one.
fn map_file(file: &File) -> SearchResult<Mmap> {
    #[cfg(target_os = "linux")]
    {
        match unsafe { memmap2::MmapOptions::new().populate().map(file) } {
            Ok(map) => return Ok(map),
            Err(e) => debug!("populated mapping failed ({e}), using plain mapping"),
        }
    }
    unsafe { Mmap::map(file) }.map_err(SearchError::IoError)
}

/// Partitions `size` bytes into per-worker chunks. Thread count is capped
/// by the file size so tiny files stay single-threaded; every chunk but the
/// last carries `max_pattern_len - 1` bytes of scan-only lookahead.
fn plan_chunks(size: usize, max_pattern_len: usize, config: &SearchConfig) -> Vec<ChunkDescriptor> {
    let overlap = max_pattern_len.saturating_sub(1);
    let by_size = (size / config.min_chunk_size).max(1);
    let threads = config.thread_count.get().min(by_size);
    let mut chunk_len = size.div_ceil(threads);
    if size > config.min_chunk_size {
        chunk_len = chunk_len.max(config.min_chunk_size);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < size {
        let owned_end = (start + chunk_len).min(size);
        let scan_end = (owned_end + overlap).min(size);
        chunks.push(ChunkDescriptor {
            start,
            owned_len: owned_end - start,
            scan_len: scan_end - start,
        });
        start = owned_end;
    }
    chunks
}
