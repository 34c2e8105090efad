// crates/bipers-matrix/src/column.rs

//! Lazy-heap mod-2 columns.
//!
//! A column is a binary max-heap of row indices in which duplicates are
//! allowed and cancel pairwise. Additions concatenate entry by entry and the
//! owner prunes once the insert debt exceeds the column length. A pruned
//! ("finalized") column holds unique entries sorted descending, so its first
//! element is the pivot and can be read without popping.
//!
//! The heap order is taken through a key function so that row-permuted
//! matrices can share this code: plain matrices pass the identity, permuted
//! matrices pass `perm[raw]`.

/// A column: raw entries arranged as a binary max-heap under the caller's key.
pub type Column = Vec<u32>;

#[inline]
fn sift_up<K: Fn(u32) -> u32>(heap: &mut [u32], mut idx: usize, key: &K) {
    while idx > 0 {
        let parent = (idx - 1) / 2;
        if key(heap[parent]) >= key(heap[idx]) {
            break;
        }
        heap.swap(parent, idx);
        idx = parent;
    }
}

#[inline]
fn sift_down<K: Fn(u32) -> u32>(heap: &mut [u32], mut idx: usize, key: &K) {
    let len = heap.len();
    loop {
        let left = 2 * idx + 1;
        if left >= len {
            break;
        }
        let right = left + 1;
        let mut largest = idx;
        if key(heap[left]) > key(heap[largest]) {
            largest = left;
        }
        if right < len && key(heap[right]) > key(heap[largest]) {
            largest = right;
        }
        if largest == idx {
            break;
        }
        heap.swap(idx, largest);
        idx = largest;
    }
}

/// Push a single entry, maintaining the heap.
#[inline]
pub fn heap_push<K: Fn(u32) -> u32>(col: &mut Column, entry: u32, key: &K) {
    col.push(entry);
    let idx = col.len() - 1;
    sift_up(col, idx, key);
}

/// Remove and return the maximal entry without cancelling duplicates.
#[inline]
fn heap_pop<K: Fn(u32) -> u32>(col: &mut Column, key: &K) -> Option<u32> {
    if col.is_empty() {
        return None;
    }
    let last = col.len() - 1;
    col.swap(0, last);
    let top = col.pop();
    sift_down(col, 0, key);
    top
}

/// Pop the maximal entry with pairwise cancellation of duplicates.
///
/// Returns `None` when the column is (effectively) empty.
pub fn heap_pop_max<K: Fn(u32) -> u32>(col: &mut Column, key: &K) -> Option<u32> {
    let mut max = heap_pop(col, key)?;
    while let Some(&top) = col.first() {
        if top != max {
            return Some(max);
        }
        // Duplicate: the candidate and this copy cancel; take a fresh candidate.
        heap_pop(col, key);
        max = heap_pop(col, key)?;
    }
    Some(max)
}

/// Read the maximal entry (with cancellation), leaving it in the column.
pub fn heap_max<K: Fn(u32) -> u32>(col: &mut Column, key: &K) -> Option<u32> {
    let max = heap_pop_max(col, key)?;
    heap_push(col, max, key);
    Some(max)
}

/// Materialise the canonical form: unique entries, sorted descending by key.
///
/// A descending array satisfies the max-heap property, so the result is also
/// a valid heap and its first element is the pivot.
pub fn prune<K: Fn(u32) -> u32>(col: &mut Column, key: &K) {
    let mut canonical = Vec::with_capacity(col.len());
    while let Some(entry) = heap_pop_max(col, key) {
        canonical.push(entry);
    }
    *col = canonical;
}

/// Re-establish the heap property over arbitrary contents (Floyd build).
pub fn heapify<K: Fn(u32) -> u32>(col: &mut Column, key: &K) {
    let len = col.len();
    for idx in (0..len / 2).rev() {
        sift_down(col, idx, key);
    }
}
