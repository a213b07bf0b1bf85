use once_cell::sync::Lazy;

/// 256-entry byte-to-lowercase table. All case-insensitive comparisons in the
/// engine index through this table instead of calling a locale-aware
/// lowercasing routine, so folding stays O(1), deterministic, and ASCII-only.
pub type FoldTable = [u8; 256];

static FOLD_TABLE: Lazy<FoldTable> = Lazy::new(|| {
    let mut table = [0u8; 256];
    for (b, slot) in table.iter_mut().enumerate() {
        *slot = (b as u8).to_ascii_lowercase();
    }
    table
});

/// Returns the process-wide folding table, built on first use.
pub fn table() -> &'static FoldTable {
    &FOLD_TABLE
}

/// Folds a single byte to its ASCII lowercase form.
#[inline]
pub fn fold(b: u8) -> u8 {
    FOLD_TABLE[b as usize]
}
