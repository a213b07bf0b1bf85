use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::algo::AlgorithmKind;
use crate::errors::{SearchError, SearchResult};

/// Configuration consumed by every search algorithm and the chunk
/// orchestrator. Immutable once the engine is constructed.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of
/// precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.turbogrep.yaml` in the current directory
/// 3. Global `$HOME/.config/turbogrep/config.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// patterns: ["he", "she", "hers"]
/// case_insensitive: true
/// whole_word: false
/// max_count: 100
/// count_lines: false
/// thread_count: 4
/// log_level: "info"
/// ```
///
/// Command-line arguments take precedence over config file values; the
/// merging behavior is defined in `merge_with_cli`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The search patterns (literals, or regexes when `is_regex` is set)
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Treat patterns as regular expressions, delegated to the regex engine
    #[serde(default)]
    pub is_regex: bool,

    /// ASCII-only case-insensitive matching via the folding table
    #[serde(default)]
    pub case_insensitive: bool,

    /// Only accept matches bounded by non-word bytes
    #[serde(default)]
    pub whole_word: bool,

    /// Stop the search the instant this many matches have been recorded.
    /// `None` means unlimited.
    #[serde(default)]
    pub max_count: Option<u64>,

    /// Count lines containing at least one match instead of individual
    /// matches (at most one count per line)
    #[serde(default)]
    pub count_lines: bool,

    /// Record match positions in a store. When false, searches run in pure
    /// counting mode and never allocate a store.
    #[serde(default = "default_track_positions")]
    pub track_positions: bool,

    /// Disable the SIMD scanners even when the CPU supports them
    #[serde(default)]
    pub no_simd: bool,

    /// Bypass the selection policy for a single literal pattern
    #[serde(default)]
    pub force_algorithm: Option<AlgorithmKind>,

    /// Number of worker threads for chunked file searches.
    /// Defaults to the number of CPU cores.
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Smallest chunk worth dispatching to a worker; files below this are
    /// searched on a single thread
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_track_positions() -> bool {
    true
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap()
}

fn default_min_chunk_size() -> usize {
    256 * 1024
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            is_regex: false,
            case_insensitive: false,
            whole_word: false,
            max_count: None,
            count_lines: false,
            track_positions: default_track_positions(),
            no_simd: false,
            force_algorithm: None,
            thread_count: default_thread_count(),
            min_chunk_size: default_min_chunk_size(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Convenience constructor for a single-literal search with defaults.
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            patterns: vec![pattern.into()],
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        // Default config locations
        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("turbogrep/config.yaml")),
            // Local config
            Some(PathBuf::from(".turbogrep.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        // Add existing config files
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // Build and deserialize
        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))
    }

    /// Merges CLI arguments with configuration file values. CLI values take
    /// precedence over anything read from a file.
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        if !cli_config.patterns.is_empty() {
            self.patterns = cli_config.patterns;
        }
        if cli_config.is_regex {
            self.is_regex = true;
        }
        if cli_config.case_insensitive {
            self.case_insensitive = true;
        }
        if cli_config.whole_word {
            self.whole_word = true;
        }
        if cli_config.max_count.is_some() {
            self.max_count = cli_config.max_count;
        }
        if cli_config.count_lines {
            self.count_lines = true;
        }
        if !cli_config.track_positions {
            self.track_positions = false;
        }
        if cli_config.no_simd {
            self.no_simd = true;
        }
        if cli_config.force_algorithm.is_some() {
            self.force_algorithm = cli_config.force_algorithm;
        }
        // Always use CLI thread count if specified
        self.thread_count = cli_config.thread_count;
        if cli_config.min_chunk_size != default_min_chunk_size() {
            self.min_chunk_size = cli_config.min_chunk_size;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        self
    }
}
