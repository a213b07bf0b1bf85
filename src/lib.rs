pub mod algo;
pub mod automaton;
pub mod config;
pub mod errors;
pub mod folding;
pub mod logging;
pub mod pattern;
pub mod pool;
pub mod results;
pub mod search;

pub use algo::AlgorithmKind;
pub use config::SearchConfig;
pub use errors::{SearchError, SearchResult};
pub use pattern::PatternSet;
pub use results::{MatchSpan, MatchStore, SearchOutcome};
pub use search::SearchEngine;
