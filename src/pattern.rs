/// An ordered, immutable collection of literal byte patterns.
///
/// The set is built once per search invocation and then only borrowed: every
/// algorithm, the automaton builder, and the chunk orchestrator share it by
/// reference (or `Arc`) for the duration of the search. An empty byte
/// sequence is a legal member and means "match once at the start of the
/// text".
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Vec<u8>>,
    max_len: usize,
}

impl PatternSet {
    pub fn new(patterns: Vec<Vec<u8>>) -> Self {
        let max_len = patterns.iter().map(Vec::len).max().unwrap_or(0);
        Self { patterns, max_len }
    }

    pub fn from_strings(patterns: &[String]) -> Self {
        Self::new(patterns.iter().map(|p| p.as_bytes().to_vec()).collect())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Length of the longest member pattern; zero for an empty set.
    /// Chunk overlap is derived from this (`max_len - 1` lookahead bytes).
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// True when every member is the empty byte sequence.
    pub fn all_empty(&self) -> bool {
        !self.patterns.is_empty() && self.max_len == 0
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.patterns.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.patterns.iter().map(Vec::as_slice)
    }
}
