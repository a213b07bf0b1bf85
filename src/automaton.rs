//! Arena-based Aho-Corasick automaton for simultaneous multi-pattern search.
//!
//! All nodes live in one `Vec` and refer to each other by index: child links
//! are sparse `(byte, index)` pairs and failure links are plain back-indices,
//! never owning pointers. The whole trie is released in one bulk
//! deallocation, so pathological pattern sets cannot blow the stack on
//! teardown. Built once per pattern set, then read-only and shared across
//! worker threads without synchronization.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use tracing::warn;

use crate::algo::{Emitter, ScanContext};
use crate::folding;
use crate::pattern::PatternSet;

const ROOT: u32 = 0;

#[derive(Debug)]
struct Node {
    /// Sparse child transitions, keyed by (folded) byte value.
    children: Vec<(u8, u32)>,
    /// Back-reference to the longest proper suffix state; root fails to
    /// itself.
    fail: u32,
    /// Indices of patterns ending exactly at this node.
    outputs: Vec<u32>,
}

impl Node {
    fn new() -> Self {
        Self {
            children: Vec::new(),
            fail: ROOT,
            outputs: Vec::new(),
        }
    }
}

/// Trie + failure links over a pattern set. Search runs in
/// O(text + total pattern length + matches), independent of how many
/// patterns are active.
pub struct Automaton {
    nodes: Vec<Node>,
    pattern_lens: Vec<usize>,
    /// Pattern indices for zero-length members; they match once at the
    /// start of the text and never participate in the byte scan.
    empty_patterns: Vec<u32>,
    case_insensitive: bool,
}

impl Automaton {
    /// Inserts every pattern byte-wise (folded at insertion time when
    /// case-insensitive), then wires failure links breadth-first.
    pub fn build(set: &PatternSet, case_insensitive: bool) -> Self {
        let mut nodes = vec![Node::new()];
        let mut pattern_lens = Vec::with_capacity(set.len());
        let mut empty_patterns = Vec::new();

        for (index, pattern) in set.iter().enumerate() {
            pattern_lens.push(pattern.len());
            if pattern.is_empty() {
                empty_patterns.push(index as u32);
                continue;
            }
            let mut current = ROOT;
            for &raw in pattern {
                let byte = if case_insensitive {
                    folding::fold(raw)
                } else {
                    raw
                };
                current = match child_of(&nodes, current, byte) {
                    Some(next) => next,
                    None => {
                        let next = nodes.len() as u32;
                        nodes.push(Node::new());
                        nodes[current as usize].children.push((byte, next));
                        next
                    }
                };
            }
            nodes[current as usize].outputs.push(index as u32);
        }

        // Failure links, breadth-first: root's direct children fail to the
        // root; deeper nodes follow the parent's failure chain until a
        // matching transition exists.
        let mut queue = VecDeque::new();
        for &(_, child) in &nodes[ROOT as usize].children {
            queue.push_back(child);
        }
        while let Some(node) = queue.pop_front() {
            let transitions = nodes[node as usize].children.clone();
            for (byte, child) in transitions {
                let mut probe = nodes[node as usize].fail;
                let fail = loop {
                    if let Some(next) = child_of(&nodes, probe, byte) {
                        break next;
                    }
                    if probe == ROOT {
                        break ROOT;
                    }
                    probe = nodes[probe as usize].fail;
                };
                nodes[child as usize].fail = fail;
                queue.push_back(child);
            }
        }

        Self {
            nodes,
            pattern_lens,
            empty_patterns,
            case_insensitive,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Single left-to-right pass. Per byte: follow failure links until a
    /// transition exists, take it, then report every pattern ending at the
    /// reached state (walking the failure chain for suffix outputs). Returns
    /// the instant the emitter signals the match cap.
    pub fn search(
        &self,
        ctx: &ScanContext,
        haystack: &[u8],
        at_text_start: bool,
        em: &mut Emitter,
    ) {
        if self.nodes.is_empty() {
            // Cannot happen through build(); treated as no matches rather
            // than indexing into a missing root.
            warn!("automaton has no root node, reporting no matches");
            return;
        }

        if at_text_start {
            // Empty patterns match empty text too; the byte loop below never
            // runs on zero-length input.
            for _ in &self.empty_patterns {
                if em.emit(0, 0).is_break() {
                    return;
                }
            }
        }

        let mut state = ROOT;
        for (i, &raw) in haystack.iter().enumerate() {
            let byte = if self.case_insensitive {
                ctx.fold[raw as usize]
            } else {
                raw
            };

            loop {
                if let Some(next) = child_of(&self.nodes, state, byte) {
                    state = next;
                    break;
                }
                if state == ROOT {
                    break;
                }
                state = self.nodes[state as usize].fail;
            }

            if self.report_outputs(state, i + 1, em).is_break() {
                return;
            }
        }
    }

    /// Emits every output reachable from `state` via failure links, each as
    /// a half-open span ending at `end`.
    fn report_outputs(&self, state: u32, end: usize, em: &mut Emitter) -> ControlFlow<()> {
        let mut current = state;
        loop {
            for &pattern in &self.nodes[current as usize].outputs {
                let len = self.pattern_lens[pattern as usize];
                em.emit(end - len, end)?;
            }
            if current == ROOT {
                return ControlFlow::Continue(());
            }
            current = self.nodes[current as usize].fail;
        }
    }
}

fn child_of(nodes: &[Node], node: u32, byte: u8) -> Option<u32> {
    nodes[node as usize]
        .children
        .iter()
        .find(|&&(b, _)| b == byte)
        .map(|&(_, child)| child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::results::MatchStore;

    fn run(
        patterns: &[&str],
        haystack: &[u8],
        case_insensitive: bool,
    ) -> (u64, Vec<(usize, usize)>) {
        let set = PatternSet::from_strings(
            &patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        );
        let automaton = Automaton::build(&set, case_insensitive);
        let ctx = ScanContext::new(case_insensitive);
        let config = SearchConfig::default();
        let mut store = MatchStore::with_capacity(0).unwrap();
        let mut em = Emitter::new(haystack, haystack.len(), &config, Some(&mut store));
        automaton.search(&ctx, haystack, true, &mut em);
        let count = em.count();
        (count, store.iter().map(|s| (s.start, s.end)).collect())
    }

    #[test]
    fn test_classic_ushers() {
        let (count, spans) = run(&["he", "she", "his", "hers"], b"ushers", false);
        assert_eq!(count, 3);
        assert_eq!(spans, vec![(1, 4), (2, 4), (2, 6)]);
        // she@[1,4), he@[2,4), hers@[2,6)
    }

    #[test]
    fn test_singleton_set_matches_plain_scan() {
        let (count, spans) = run(&["ab"], b"ababab", false);
        assert_eq!(count, 3);
        assert_eq!(spans, vec![(0, 2), (2, 4), (4, 6)]);
    }

    #[test]
    fn test_overlapping_outputs_at_one_position() {
        let (count, spans) = run(&["a", "aa", "aaa"], b"aaa", false);
        // position 1: a; position 2: a, aa; position 3: a, aa, aaa
        assert_eq!(count, 6);
        assert!(spans.contains(&(0, 3)));
    }

    #[test]
    fn test_case_insensitive_build_and_scan() {
        let (count, spans) = run(&["AbC"], b"xxabcXXABCxx", true);
        assert_eq!(count, 2);
        assert_eq!(spans, vec![(2, 5), (7, 10)]);
    }

    #[test]
    fn test_empty_pattern_on_empty_text() {
        let (count, spans) = run(&[""], b"", false);
        assert_eq!(count, 1);
        assert_eq!(spans, vec![(0, 0)]);
    }

    #[test]
    fn test_empty_pattern_on_nonempty_text() {
        let (count, spans) = run(&[""], b"abc", false);
        assert_eq!(count, 1);
        assert_eq!(spans, vec![(0, 0)]);
    }

    #[test]
    fn test_mixed_empty_and_literal_patterns() {
        let (count, spans) = run(&["", "bc"], b"abc", false);
        assert_eq!(count, 2);
        assert_eq!(spans, vec![(0, 0), (1, 3)]);
    }

    #[test]
    fn test_no_matches() {
        let (count, spans) = run(&["xyz", "qrs"], b"abcdefg", false);
        assert_eq!(count, 0);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_cap_halts_scan() {
        let set = PatternSet::from_strings(&["a".to_string()]);
        let automaton = Automaton::build(&set, false);
        let ctx = ScanContext::new(false);
        let config = SearchConfig {
            max_count: Some(3),
            track_positions: false,
            ..SearchConfig::default()
        };
        let hay = b"aaaaaaaaaa";
        let mut em = Emitter::new(hay, hay.len(), &config, None);
        automaton.search(&ctx, hay, true, &mut em);
        assert_eq!(em.count(), 3);
    }

    #[test]
    fn test_shared_prefix_trie_is_compact() {
        let set = PatternSet::from_strings(&["abcd".to_string(), "abce".to_string()]);
        let automaton = Automaton::build(&set, false);
        // root + a,b,c shared + d + e
        assert_eq!(automaton.node_count(), 6);
    }
}
