use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::num::NonZeroUsize;
use tempfile::tempdir;
use turbogrep::{AlgorithmKind, SearchConfig, SearchEngine, SearchError};

fn create_test_file(dir: &tempfile::TempDir, name: &str, lines: usize) -> Result<std::path::PathBuf> {
    let path = dir.path().join(name);
    let mut file = File::create(&path)?;
    for i in 0..lines {
        writeln!(file, "line {} in the haystack: TODO implement this", i)?;
        writeln!(file, "another line {} with nothing special", i)?;
        writeln!(file, "FIXME: this is a bug on line {}", i)?;
    }
    Ok(path)
}

fn config(patterns: &[&str]) -> SearchConfig {
    SearchConfig {
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        thread_count: NonZeroUsize::new(4).unwrap(),
        ..SearchConfig::default()
    }
}

#[test]
fn test_simple_pattern_over_file() -> Result<()> {
    let dir = tempdir()?;
    let path = create_test_file(&dir, "simple.txt", 100)?;

    let engine = SearchEngine::new(config(&["TODO"]))?;
    let outcome = engine.search_file(&path)?;
    assert_eq!(outcome.count, 100);
    assert!(outcome.matched());
    assert_eq!(outcome.exit_code(), 0);
    Ok(())
}

#[test]
fn test_no_match_exit_code() -> Result<()> {
    let dir = tempdir()?;
    let path = create_test_file(&dir, "nomatch.txt", 10)?;

    let engine = SearchEngine::new(config(&["NOWHERE"]))?;
    let outcome = engine.search_file(&path)?;
    assert_eq!(outcome.count, 0);
    assert_eq!(outcome.exit_code(), 1);
    Ok(())
}

#[test]
fn test_error_exit_code() -> Result<()> {
    let engine = SearchEngine::new(config(&["x"]))?;
    let err = engine
        .search_file(std::path::Path::new("no/such/file"))
        .unwrap_err();
    assert!(matches!(err, SearchError::FileNotFound(_)));
    assert_eq!(err.exit_code(), 2);
    Ok(())
}

#[test]
fn test_multi_pattern_over_file() -> Result<()> {
    let dir = tempdir()?;
    let path = create_test_file(&dir, "multi.txt", 50)?;

    let engine = SearchEngine::new(config(&["TODO", "FIXME"]))?;
    assert_eq!(engine.algorithm_name(), "aho-corasick");

    let outcome = engine.search_file(&path)?;
    assert_eq!(outcome.count, 100);
    Ok(())
}

#[test]
fn test_file_matches_agree_with_slice() -> Result<()> {
    let dir = tempdir()?;
    let path = create_test_file(&dir, "agree.txt", 500)?;
    let content = std::fs::read(&path)?;

    let mut cfg = config(&["bug"]);
    cfg.min_chunk_size = 1024; // force several chunks
    let engine = SearchEngine::new(cfg)?;

    let from_file = engine.search_file(&path)?;
    let from_slice = engine.search_slice(&content)?;
    assert_eq!(from_file.count, from_slice.count);
    assert_eq!(
        from_file.spans.unwrap().spans(),
        from_slice.spans.unwrap().spans()
    );
    Ok(())
}

#[test]
fn test_forced_algorithms_agree_over_file() -> Result<()> {
    let dir = tempdir()?;
    let path = create_test_file(&dir, "parity.txt", 300)?;

    let mut baseline = None;
    for kind in [
        AlgorithmKind::Horspool,
        AlgorithmKind::Kmp,
        AlgorithmKind::AhoCorasick,
    ] {
        let mut cfg = config(&["line"]);
        cfg.force_algorithm = Some(kind);
        cfg.no_simd = true;
        cfg.min_chunk_size = 2048;
        let engine = SearchEngine::new(cfg)?;
        let outcome = engine.search_file(&path)?;
        let spans: Vec<_> = outcome
            .spans
            .unwrap()
            .iter()
            .map(|s| (s.start, s.end))
            .collect();
        match &baseline {
            None => baseline = Some((outcome.count, spans)),
            Some((count, expected)) => {
                assert_eq!(outcome.count, *count, "{:?} count diverged", kind);
                assert_eq!(&spans, expected, "{:?} spans diverged", kind);
            }
        }
    }
    Ok(())
}

#[test]
fn test_count_lines_over_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("lines.txt");
    std::fs::write(&path, "hit hit hit\nmiss\nhit\nhit hit\n")?;

    let mut cfg = config(&["hit"]);
    cfg.count_lines = true;
    let engine = SearchEngine::new(cfg)?;
    let outcome = engine.search_file(&path)?;
    assert_eq!(outcome.count, 3);
    Ok(())
}

#[test]
fn test_whole_word_over_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("words.txt");
    std::fs::write(&path, "cat catalog\nbobcat cat-flap cat_like\ncat\n")?;

    let mut cfg = config(&["cat"]);
    cfg.whole_word = true;
    let engine = SearchEngine::new(cfg)?;
    // "cat", "cat" in "cat-flap" (hyphen is not a word byte), "cat"
    assert_eq!(engine.search_file(&path)?.count, 3);
    Ok(())
}

#[test]
fn test_case_insensitive_over_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("case.txt");
    std::fs::write(&path, "Error ERROR error eRRoR")?;

    let mut cfg = config(&["error"]);
    cfg.case_insensitive = true;
    let engine = SearchEngine::new(cfg)?;
    assert_eq!(engine.search_file(&path)?.count, 4);

    let engine = SearchEngine::new(config(&["error"]))?;
    assert_eq!(engine.search_file(&path)?.count, 1);
    Ok(())
}

#[test]
fn test_max_count_over_file() -> Result<()> {
    let dir = tempdir()?;
    let path = create_test_file(&dir, "capped.txt", 100)?;

    let mut cfg = config(&["line"]);
    cfg.max_count = Some(7);
    let engine = SearchEngine::new(cfg)?;
    let outcome = engine.search_file(&path)?;
    assert_eq!(outcome.count, 7);
    assert_eq!(outcome.spans.unwrap().len(), 7);
    Ok(())
}

#[test]
fn test_config_loaded_from_yaml() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("search.yaml");
    std::fs::write(
        &config_path,
        "patterns:\n  - TODO\ncase_insensitive: true\nmax_count: 3\n",
    )?;
    let data_path = create_test_file(&dir, "data.txt", 20)?;

    let cfg = SearchConfig::load_from(Some(&config_path))?;
    assert_eq!(cfg.patterns, vec!["TODO".to_string()]);
    assert!(cfg.case_insensitive);

    let engine = SearchEngine::new(cfg)?;
    assert_eq!(engine.search_file(&data_path)?.count, 3);
    Ok(())
}

#[test]
fn test_large_repetitive_file_overlapping_matches() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("repetitive.bin");
    std::fs::write(&path, vec![b'a'; 10])?;

    let mut cfg = config(&["aaaa"]);
    cfg.no_simd = true;
    let engine = SearchEngine::new(cfg)?;
    assert_eq!(engine.algorithm_name(), "kmp");
    // one occurrence per start position 0..=6
    assert_eq!(engine.search_file(&path)?.count, 7);
    Ok(())
}
