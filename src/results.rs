use crate::errors::{SearchError, SearchResult};

/// Minimum number of slots a store allocates when created with a zero
/// capacity hint.
const DEFAULT_CAPACITY: usize = 64;

/// A single match as a half-open byte range, relative to the buffer handed
/// to the algorithm that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Growable, ordered list of match positions.
///
/// One store exists per chunk-local search plus one file-global aggregate;
/// a store is only ever written by the thread that owns it, and chunk-local
/// stores are folded into the global one with [`MatchStore::merge`] after all
/// workers have drained. Growth doubles the capacity and fails explicitly
/// (rather than aborting) on allocation errors or capacity arithmetic that
/// would wrap.
#[derive(Debug, Default)]
pub struct MatchStore {
    spans: Vec<MatchSpan>,
}

impl MatchStore {
    /// Creates a store with at least `capacity` slots reserved. A zero hint
    /// falls back to a small default.
    pub fn with_capacity(capacity: usize) -> SearchResult<Self> {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        let mut spans = Vec::new();
        spans
            .try_reserve_exact(capacity)
            .map_err(|e| SearchError::allocation_failed(format!("match store: {e}")))?;
        Ok(Self { spans })
    }

    /// Appends a span, doubling the backing buffer when full.
    ///
    /// A failure here is reported to the caller, not fatal: the search
    /// continues with the match counted but its position dropped.
    pub fn add(&mut self, start: usize, end: usize) -> SearchResult<()> {
        debug_assert!(start <= end);
        if self.spans.len() == self.spans.capacity() {
            let grown = self
                .spans
                .capacity()
                .max(DEFAULT_CAPACITY)
                .checked_mul(2)
                .ok_or(SearchError::CapacityOverflow("match store"))?;
            self.spans
                .try_reserve_exact(grown - self.spans.len())
                .map_err(|e| SearchError::allocation_failed(format!("match store: {e}")))?;
        }
        self.spans.push(MatchSpan::new(start, end));
        Ok(())
    }

    /// Appends every span of `source` with `offset` added to both ends,
    /// rebiasing a chunk-local store into file coordinates.
    pub fn merge(&mut self, source: &MatchStore, offset: usize) -> SearchResult<()> {
        self.spans
            .try_reserve(source.len())
            .map_err(|e| SearchError::allocation_failed(format!("match store merge: {e}")))?;
        for span in &source.spans {
            let start = span
                .start
                .checked_add(offset)
                .ok_or(SearchError::CapacityOverflow("merge offset"))?;
            let end = span
                .end
                .checked_add(offset)
                .ok_or(SearchError::CapacityOverflow("merge offset"))?;
            self.spans.push(MatchSpan::new(start, end));
        }
        Ok(())
    }

    /// Sorts by start offset, ties broken by end offset. Chunk interleaving
    /// from parallel workers means merged results are not globally ordered
    /// until this runs.
    pub fn sort(&mut self) {
        self.spans.sort_unstable_by_key(|s| (s.start, s.end));
    }

    /// Drops all spans past the first `n`, used to clamp a file-global store
    /// to the configured match cap after merging.
    pub fn truncate(&mut self, n: usize) {
        self.spans.truncate(n);
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[MatchSpan] {
        &self.spans
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchSpan> {
        self.spans.iter()
    }
}

/// Outcome of one search invocation over a string slice or a whole file.
///
/// `spans` is populated only when position tracking is enabled; in pure
/// counting mode no store is ever allocated. In degraded mode (a store
/// insertion failed mid-search) `count` may exceed `spans.len()`.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Total matches, or matched lines in line-counting mode.
    pub count: u64,
    /// Sorted match positions in buffer/file byte coordinates.
    pub spans: Option<MatchStore>,
    /// Positions dropped because a store insertion failed.
    pub dropped: u64,
}

impl SearchOutcome {
    pub fn matched(&self) -> bool {
        self.count > 0
    }

    /// Process exit status for the CLI layer: 0 = match found, 1 = no match.
    /// Errors never reach this point; they map to 2 via
    /// [`SearchError::exit_code`].
    pub fn exit_code(&self) -> i32 {
        if self.matched() {
            0
        } else {
            1
        }
    }
}
