//! Chunking and per-item outcomes of transactional batches.

use strata_core::storage::REASON_NONE;

/// Splits `items` into owned chunks of at most `size` elements.
pub fn chunked<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size.max(1)));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Per-item outcomes of a canceled chunk of `len` operations.
///
/// Reason `"None"` at position `i` means item `i` was fine; any other code
/// means it failed. Items without a reported reason count as failed.
pub fn chunk_outcomes(reasons: &[String], len: usize) -> Vec<bool> {
    (0..len)
        .map(|i| reasons.get(i).is_some_and(|r| r == REASON_NONE))
        .collect()
}
