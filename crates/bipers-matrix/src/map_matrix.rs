// crates/bipers-matrix/src/map_matrix.rs

//! Column-sparse mod-2 matrices.
//!
//! [`MapMatrix`] is the plain variant used by the reduction and presentation
//! stages. [`PermMatrix`] adds an implicit row permutation plus pivot arrays
//! and carries the RU-decomposition; [`RowPriorityMatrix`] stores the
//! upper-triangular factor row-sparse with an implicit column permutation.

use crate::column::{heap_max, heap_pop_max, heap_push, heapify, prune, Column};
use bipers_core::{Error, Result};

fn two_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// Prune a target column when the insert debt exceeds half its length.
macro_rules! maybe_prune {
    ($self:ident, $col:expr, $key:expr) => {
        if 2 * $self.inserts_since_prune[$col] > $self.columns[$col].len() {
            prune(&mut $self.columns[$col], $key);
            $self.inserts_since_prune[$col] = 0;
        }
    };
}

/// Plain column-sparse mod-2 matrix over lazy-heap columns.
#[derive(Clone, Debug, Default)]
pub struct MapMatrix {
    columns: Vec<Column>,
    inserts_since_prune: Vec<usize>,
    num_rows: u32,
}

const ID_KEY: fn(u32) -> u32 = |v| v;

impl MapMatrix {
    /// All-zero matrix of the given size.
    #[must_use]
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            columns: vec![Column::new(); cols as usize],
            inserts_since_prune: vec![0; cols as usize],
            num_rows: rows,
        }
    }

    /// Square identity matrix.
    #[must_use]
    pub fn identity(size: u32) -> Self {
        let mut mat = Self::new(size, size);
        for i in 0..size {
            mat.columns[i as usize].push(i);
        }
        mat
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.columns.len() as u32
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.num_rows
    }

    /// Set (toggle on) a single entry, maintaining the heap.
    pub fn set_entry(&mut self, row: u32, col: u32) {
        heap_push(&mut self.columns[col as usize], row, &ID_KEY);
    }

    /// Largest row index in the column, or `None` if (effectively) empty.
    pub fn max_index(&mut self, col: u32) -> Option<u32> {
        heap_max(&mut self.columns[col as usize], &ID_KEY)
    }

    /// Pivot of a finalized column, read without popping.
    #[must_use]
    pub fn low_finalized(&self, col: u32) -> Option<u32> {
        self.columns[col as usize].first().copied()
    }

    /// Pop the pivot (with cancellation).
    pub fn remove_low(&mut self, col: u32) -> Option<u32> {
        heap_pop_max(&mut self.columns[col as usize], &ID_KEY)
    }

    /// Push an entry back (used to restore a popped pivot).
    pub fn push_index(&mut self, col: u32, entry: u32) {
        heap_push(&mut self.columns[col as usize], entry, &ID_KEY);
    }

    pub fn is_col_empty(&mut self, col: u32) -> bool {
        self.max_index(col).is_none()
    }

    /// Add column `src` into column `tgt` (mod 2).
    pub fn add_column(&mut self, src: u32, tgt: u32) {
        let (s, t) = two_mut(&mut self.columns, src as usize, tgt as usize);
        for &entry in s.iter() {
            heap_push(t, entry, &ID_KEY);
        }
        self.inserts_since_prune[tgt as usize] += self.columns[src as usize].len();
        maybe_prune!(self, tgt as usize, &ID_KEY);
    }

    /// Add column `src` of `other` into column `tgt` of `self`.
    pub fn add_column_from(&mut self, other: &Self, src: u32, tgt: u32) {
        let source = &other.columns[src as usize];
        let target = &mut self.columns[tgt as usize];
        for &entry in source {
            heap_push(target, entry, &ID_KEY);
        }
        self.inserts_since_prune[tgt as usize] += source.len();
        maybe_prune!(self, tgt as usize, &ID_KEY);
    }

    /// Fast path of the standard reduction: add finalized column `src` into
    /// column `tgt` whose pivot has already been popped. The shared pivot is
    /// the source's first entry and is skipped.
    pub fn add_column_popped(&mut self, src: u32, tgt: u32) {
        let (s, t) = two_mut(&mut self.columns, src as usize, tgt as usize);
        for &entry in s.iter().skip(1) {
            heap_push(t, entry, &ID_KEY);
        }
        let added = self.columns[src as usize].len().saturating_sub(1);
        self.inserts_since_prune[tgt as usize] += added;
        maybe_prune!(self, tgt as usize, &ID_KEY);
    }

    /// As [`Self::add_column_popped`], with the source column in `other`.
    pub fn add_column_popped_from(&mut self, other: &Self, src: u32, tgt: u32) {
        let source = &other.columns[src as usize];
        let target = &mut self.columns[tgt as usize];
        for &entry in source.iter().skip(1) {
            heap_push(target, entry, &ID_KEY);
        }
        self.inserts_since_prune[tgt as usize] += source.len().saturating_sub(1);
        maybe_prune!(self, tgt as usize, &ID_KEY);
    }

    /// Materialise the canonical (unique, descending) form of a column.
    pub fn finalize(&mut self, col: u32) {
        prune(&mut self.columns[col as usize], &ID_KEY);
        self.inserts_since_prune[col as usize] = 0;
    }

    /// Append a copy of column `src` of `other` to the right of this matrix.
    pub fn append_col_copy(&mut self, other: &Self, src: u32) {
        self.columns.push(other.columns[src as usize].clone());
        self.inserts_since_prune.push(0);
    }

    /// Append column `src` of `other`, clearing the original.
    pub fn move_col_from(&mut self, other: &mut Self, src: u32) {
        self.columns.push(std::mem::take(&mut other.columns[src as usize]));
        self.inserts_since_prune.push(0);
        other.inserts_since_prune[src as usize] = 0;
    }

    /// Overwrite column `to` with column `from`, clearing `from`.
    pub fn move_col_within(&mut self, from: u32, to: u32) {
        if from == to {
            return;
        }
        self.columns[to as usize] = std::mem::take(&mut self.columns[from as usize]);
        self.inserts_since_prune[to as usize] = self.inserts_since_prune[from as usize];
        self.inserts_since_prune[from as usize] = 0;
    }

    /// Truncate to the given size (keeps the leftmost columns).
    pub fn resize(&mut self, rows: u32, cols: u32) {
        self.columns.truncate(cols as usize);
        self.inserts_since_prune.truncate(cols as usize);
        self.num_rows = rows;
    }

    /// Entry test by parity; works on any (even unfinalized) column.
    #[must_use]
    pub fn entry(&self, row: u32, col: u32) -> bool {
        self.columns[col as usize]
            .iter()
            .filter(|&&e| e == row)
            .count()
            % 2
            == 1
    }

    /// Iterate the raw entries of a finalized column (unique, descending).
    #[must_use]
    pub fn col_entries(&self, col: u32) -> &[u32] {
        &self.columns[col as usize]
    }

    // ---- sorted-column operations (presentation minimisation) ----

    /// Canonicalise and re-sort a column ascending. Afterwards only the
    /// `*_sorted` operations below may touch it.
    pub fn sort_col(&mut self, col: u32) {
        prune(&mut self.columns[col as usize], &ID_KEY);
        self.columns[col as usize].reverse();
    }

    /// Pivot of an ascending-sorted column.
    #[must_use]
    pub fn low_sorted(&self, col: u32) -> Option<u32> {
        self.columns[col as usize].last().copied()
    }

    /// Entry test on an ascending-sorted column.
    #[must_use]
    pub fn entry_sorted(&self, row: u32, col: u32) -> bool {
        self.columns[col as usize].binary_search(&row).is_ok()
    }

    /// Merge-add ascending-sorted column `src` into ascending-sorted `tgt`,
    /// cancelling shared entries.
    pub fn add_column_sorted(&mut self, src: u32, tgt: u32) {
        let (s, t) = two_mut(&mut self.columns, src as usize, tgt as usize);
        let mut merged = Vec::with_capacity(s.len() + t.len());
        let (mut i, mut j) = (0, 0);
        while i < s.len() && j < t.len() {
            match s[i].cmp(&t[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(s[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(t[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&s[i..]);
        merged.extend_from_slice(&t[j..]);
        *t = merged;
        self.inserts_since_prune[tgt as usize] = 0;
    }

    /// Rewrite the row indices of a column through `row_map`.
    ///
    /// # Errors
    /// [`Error::Invariant`] if an entry maps to a deleted row.
    pub fn reindex_column(&mut self, col: u32, row_map: &[i64]) -> Result<()> {
        for entry in &mut self.columns[col as usize] {
            let mapped = row_map[*entry as usize];
            if mapped < 0 {
                return Err(Error::invariant(
                    "map_matrix::reindex_column",
                    format!("row {entry} of column {col} was deleted"),
                ));
            }
            *entry = mapped as u32;
        }
        Ok(())
    }
}

/// Column-sparse matrix with an implicit row permutation and pivot arrays,
/// supporting the vineyard updates and fast rebuild-from-pristine resets.
///
/// Entries are stored as raw row ids in the initial order; `perm` maps raw
/// ids to current positions and `mrep` is its inverse. Heaps are ordered by
/// the permuted position.
#[derive(Clone, Debug)]
pub struct PermMatrix {
    columns: Vec<Column>,
    inserts_since_prune: Vec<usize>,
    perm: Vec<u32>,
    mrep: Vec<u32>,
    low_by_row: Vec<Option<u32>>,
    low_by_col: Vec<Option<u32>>,
}

impl PermMatrix {
    #[must_use]
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            columns: vec![Column::new(); cols as usize],
            inserts_since_prune: vec![0; cols as usize],
            perm: (0..rows).collect(),
            mrep: (0..rows).collect(),
            low_by_row: vec![None; rows as usize],
            low_by_col: vec![None; cols as usize],
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.columns.len() as u32
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.perm.len() as u32
    }

    /// Install a column from raw (initial-order) entries.
    pub fn set_col(&mut self, col: u32, entries: &[u32]) {
        let perm = &self.perm;
        let column = &mut self.columns[col as usize];
        column.clear();
        column.extend_from_slice(entries);
        heapify(column, &|v| perm[v as usize]);
        self.inserts_since_prune[col as usize] = 0;
    }

    /// Install a column, mapping each entry through `row_map` (negative =
    /// dropped row).
    pub fn set_col_mapped(&mut self, col: u32, entries: &[u32], row_map: &[i64]) {
        let perm = &self.perm;
        let column = &mut self.columns[col as usize];
        column.clear();
        for &entry in entries {
            let mapped = row_map[entry as usize];
            if mapped >= 0 {
                column.push(mapped as u32);
            }
        }
        heapify(column, &|v| perm[v as usize]);
        self.inserts_since_prune[col as usize] = 0;
    }

    /// Pivot (current row index) of column `col`, from the pivot array.
    #[inline]
    #[must_use]
    pub fn low(&self, col: u32) -> Option<u32> {
        self.low_by_col[col as usize]
    }

    /// Column whose pivot is the current row `row`, if any.
    #[inline]
    #[must_use]
    pub fn find_low(&self, row: u32) -> Option<u32> {
        self.low_by_row[row as usize]
    }

    pub fn col_is_empty(&mut self, col: u32) -> bool {
        self.max_index(col).is_none()
    }

    /// Entry test in current coordinates, by parity.
    #[must_use]
    pub fn entry(&self, row: u32, col: u32) -> bool {
        let raw = self.mrep[row as usize];
        self.columns[col as usize]
            .iter()
            .filter(|&&e| e == raw)
            .count()
            % 2
            == 1
    }

    /// Largest current row index of the column, leaving the column intact.
    pub fn max_index(&mut self, col: u32) -> Option<u32> {
        let perm = &self.perm;
        heap_max(&mut self.columns[col as usize], &|v| perm[v as usize]).map(|raw| perm[raw as usize])
    }

    /// Pop the pivot (with cancellation); returns the current row index.
    pub fn remove_low(&mut self, col: u32) -> Option<u32> {
        let perm = &self.perm;
        heap_pop_max(&mut self.columns[col as usize], &|v| perm[v as usize])
            .map(|raw| perm[raw as usize])
    }

    /// Push an entry given in current coordinates.
    pub fn push_index(&mut self, col: u32, row: u32) {
        let raw = self.mrep[row as usize];
        let perm = &self.perm;
        heap_push(&mut self.columns[col as usize], raw, &|v| perm[v as usize]);
    }

    /// Add column `src` into column `tgt`.
    pub fn add_column(&mut self, src: u32, tgt: u32) {
        let perm = &self.perm;
        let (s, t) = two_mut(&mut self.columns, src as usize, tgt as usize);
        for &entry in s.iter() {
            heap_push(t, entry, &|v| perm[v as usize]);
        }
        self.inserts_since_prune[tgt as usize] += self.columns[src as usize].len();
        let perm = &self.perm;
        maybe_prune!(self, tgt as usize, &|v| perm[v as usize]);
    }

    /// Popped-pivot fast path, as in [`MapMatrix::add_column_popped`].
    pub fn add_column_popped(&mut self, src: u32, tgt: u32) {
        let perm = &self.perm;
        let (s, t) = two_mut(&mut self.columns, src as usize, tgt as usize);
        for &entry in s.iter().skip(1) {
            heap_push(t, entry, &|v| perm[v as usize]);
        }
        self.inserts_since_prune[tgt as usize] += self.columns[src as usize].len().saturating_sub(1);
        let perm = &self.perm;
        maybe_prune!(self, tgt as usize, &|v| perm[v as usize]);
    }

    pub fn finalize(&mut self, col: u32) {
        let perm = &self.perm;
        prune(&mut self.columns[col as usize], &|v| perm[v as usize]);
        self.inserts_since_prune[col as usize] = 0;
    }

    /// Swap columns `col` and `col + 1`.
    pub fn swap_columns(&mut self, col: u32, update_lows: bool) {
        self.columns.swap(col as usize, col as usize + 1);
        self.inserts_since_prune.swap(col as usize, col as usize + 1);
        if update_lows {
            let l = self.low_by_col[col as usize];
            let k = self.low_by_col[col as usize + 1];
            self.low_by_col[col as usize] = k;
            self.low_by_col[col as usize + 1] = l;
            if let Some(l) = l {
                self.low_by_row[l as usize] = Some(col + 1);
            }
            if let Some(k) = k {
                self.low_by_row[k as usize] = Some(col);
            }
        }
    }

    /// Swap (implicitly) rows `row` and `row + 1`.
    ///
    /// The pivot arrays go stale exactly in the Vineyards case 1.1 situation;
    /// the caller detects that and repairs with a column addition.
    pub fn swap_rows(&mut self, row: u32, update_lows: bool) {
        let a = self.mrep[row as usize];
        let b = self.mrep[row as usize + 1];
        self.perm.swap(a as usize, b as usize);
        self.mrep[row as usize] = b;
        self.mrep[row as usize + 1] = a;

        if update_lows {
            let l = self.low_by_row[row as usize];
            let k = self.low_by_row[row as usize + 1];
            self.low_by_row[row as usize] = k;
            self.low_by_row[row as usize + 1] = l;
            if let Some(l) = l {
                self.low_by_col[l as usize] = Some(row + 1);
            }
            if let Some(k) = k {
                self.low_by_col[k as usize] = Some(row);
            }
        }
    }

    /// Left-to-right reduction producing the upper-triangular factor, so that
    /// the original matrix equals `R · U`. Initialises the pivot arrays as a
    /// side effect. Only valid before any rows are swapped.
    pub fn decompose_ru(&mut self) -> RowPriorityMatrix {
        let mut u = RowPriorityMatrix::identity(self.width());
        for j in 0..self.width() {
            let mut changing = false;
            let mut low = self.remove_low(j);
            if let Some(row) = low {
                if self.low_by_row[row as usize].is_some() {
                    changing = true;
                }
            }
            while let Some(row) = low {
                let Some(c) = self.low_by_row[row as usize] else {
                    break;
                };
                self.add_column_popped(c, j);
                u.add_row(j, c);
                low = self.remove_low(j);
            }
            if let Some(row) = low {
                self.push_index(j, row);
                self.low_by_col[j as usize] = Some(row);
                self.low_by_row[row as usize] = Some(j);
            }
            if changing {
                self.finalize(j);
            }
        }
        u
    }

    /// Clear and rebuild from a pristine reference with columns permuted by
    /// `col_order` (reference column `j` lands at `col_order[j]`). Resets the
    /// row permutation and pivot arrays.
    pub fn rebuild(&mut self, reference: &Self, col_order: &[u32]) {
        self.reset_perm_and_lows();
        for j in 0..self.columns.len() {
            let target = col_order[j] as usize;
            self.columns[target] = reference.columns[j].clone();
            self.inserts_since_prune[target] = 0;
            // Reference columns are stored under the identity permutation, so
            // their heap order is already valid here.
        }
    }

    /// As [`Self::rebuild`], also mapping row ids through `row_order`.
    pub fn rebuild_with_rows(&mut self, reference: &Self, col_order: &[u32], row_order: &[u32]) {
        self.reset_perm_and_lows();
        for j in 0..self.columns.len() {
            let target = col_order[j] as usize;
            let column = &mut self.columns[target];
            column.clear();
            column.extend(reference.columns[j].iter().map(|&r| row_order[r as usize]));
            heapify(column, &ID_KEY);
            self.inserts_since_prune[target] = 0;
        }
    }

    fn reset_perm_and_lows(&mut self) {
        for (i, p) in self.perm.iter_mut().enumerate() {
            *p = i as u32;
        }
        for (i, m) in self.mrep.iter_mut().enumerate() {
            *m = i as u32;
        }
        self.low_by_row.iter_mut().for_each(|l| *l = None);
        self.low_by_col.iter_mut().for_each(|l| *l = None);
    }

    /// Dense expansion in current coordinates; debug/test helper.
    #[must_use]
    pub fn to_dense(&self) -> Vec<Vec<bool>> {
        let mut dense = vec![vec![false; self.width() as usize]; self.height() as usize];
        for (j, column) in self.columns.iter().enumerate() {
            for &raw in column {
                let row = self.perm[raw as usize] as usize;
                dense[row][j] ^= true;
            }
        }
        dense
    }
}

/// Row-sparse upper-triangular factor with an implicit column permutation.
///
/// Stored transposed: `rows[i]` lists the raw column ids of the nonzero
/// entries of row `i`, duplicates cancelling by parity.
#[derive(Clone, Debug)]
pub struct RowPriorityMatrix {
    rows: Vec<Vec<u32>>,
    inserts_since_prune: Vec<usize>,
    perm: Vec<u32>,
    mrep: Vec<u32>,
}

impl RowPriorityMatrix {
    #[must_use]
    pub fn identity(size: u32) -> Self {
        Self {
            rows: (0..size).map(|i| vec![i]).collect(),
            inserts_since_prune: vec![0; size as usize],
            perm: (0..size).collect(),
            mrep: (0..size).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Entry test in current coordinates, by parity.
    #[must_use]
    pub fn entry(&self, row: u32, col: u32) -> bool {
        let raw = self.mrep[col as usize];
        self.rows[row as usize].iter().filter(|&&e| e == raw).count() % 2 == 1
    }

    /// Add row `src` into row `tgt` (mod 2).
    pub fn add_row(&mut self, src: u32, tgt: u32) {
        let (s, t) = two_mut(&mut self.rows, src as usize, tgt as usize);
        t.extend_from_slice(s);
        self.inserts_since_prune[tgt as usize] += self.rows[src as usize].len();
        if 2 * self.inserts_since_prune[tgt as usize] > self.rows[tgt as usize].len() {
            Self::prune_row(&mut self.rows[tgt as usize]);
            self.inserts_since_prune[tgt as usize] = 0;
        }
    }

    /// Swap rows `row` and `row + 1`.
    pub fn swap_rows(&mut self, row: u32) {
        self.rows.swap(row as usize, row as usize + 1);
        self.inserts_since_prune.swap(row as usize, row as usize + 1);
    }

    /// Swap (implicitly) columns `col` and `col + 1`.
    pub fn swap_columns(&mut self, col: u32) {
        let a = self.mrep[col as usize];
        let b = self.mrep[col as usize + 1];
        self.perm.swap(a as usize, b as usize);
        self.mrep[col as usize] = b;
        self.mrep[col as usize + 1] = a;
    }

    /// Force entry `(row, col)` to zero. Only legal when the corresponding
    /// column of `R` is zero, so the represented product is unchanged.
    pub fn clear(&mut self, row: u32, col: u32) {
        if self.entry(row, col) {
            let raw = self.mrep[col as usize];
            self.rows[row as usize].push(raw);
        }
    }

    fn prune_row(row: &mut Vec<u32>) {
        row.sort_unstable();
        let mut canonical = Vec::with_capacity(row.len());
        let mut idx = 0;
        while idx < row.len() {
            let mut run = 1;
            while idx + run < row.len() && row[idx + run] == row[idx] {
                run += 1;
            }
            if run % 2 == 1 {
                canonical.push(row[idx]);
            }
            idx += run;
        }
        *row = canonical;
    }

    /// Dense expansion in current coordinates; debug/test helper.
    #[must_use]
    pub fn to_dense(&self) -> Vec<Vec<bool>> {
        let size = self.size() as usize;
        let mut dense = vec![vec![false; size]; size];
        for (i, row) in self.rows.iter().enumerate() {
            for &raw in row {
                let col = self.perm[raw as usize] as usize;
                dense[i][col] ^= true;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_mul(r: &[Vec<bool>], u: &[Vec<bool>]) -> Vec<Vec<bool>> {
        let rows = r.len();
        let mid = u.len();
        let cols = u[0].len();
        let mut out = vec![vec![false; cols]; rows];
        for i in 0..rows {
            for j in 0..cols {
                let mut acc = false;
                for k in 0..mid {
                    acc ^= r[i][k] && u[k][j];
                }
                out[i][j] = acc;
            }
        }
        out
    }

    #[test]
    fn add_column_cancels() {
        let mut m = MapMatrix::new(4, 2);
        m.set_entry(0, 0);
        m.set_entry(3, 0);
        m.set_entry(3, 1);
        m.set_entry(1, 1);
        m.add_column(0, 1);
        m.finalize(1);
        // column 1 = {3,1} + {3,0} = {0,1}
        assert_eq!(m.col_entries(1), &[1, 0]);
    }

    #[test]
    fn decompose_ru_reduces_and_preserves_product() {
        // Boundary of a triangle: edges 0,1,2 over vertices 0,1,2.
        let mut r = PermMatrix::new(3, 3);
        r.set_col(0, &[0, 1]);
        r.set_col(1, &[1, 2]);
        r.set_col(2, &[0, 2]);
        let original = r.to_dense();
        let u = r.decompose_ru();

        // Reduced: pivots distinct, third column zero.
        assert_eq!(r.low(0), Some(1));
        assert_eq!(r.low(1), Some(2));
        assert_eq!(r.low(2), None);
        assert_eq!(dense_mul(&r.to_dense(), &u.to_dense()), original);
    }

    #[test]
    fn perm_swap_rows_relabels_entries() {
        let mut m = PermMatrix::new(2, 1);
        m.set_col(0, &[1]);
        assert!(m.entry(1, 0));
        m.swap_rows(0, false);
        assert!(m.entry(0, 0));
        assert!(!m.entry(1, 0));
        assert_eq!(m.max_index(0), Some(0));
    }

    #[test]
    fn rebuild_restores_pristine_columns_in_new_order() {
        let mut reference = PermMatrix::new(3, 2);
        reference.set_col(0, &[0, 1]);
        reference.set_col(1, &[1, 2]);
        let mut working = reference.clone();
        let _u = working.decompose_ru();
        working.rebuild(&reference, &[1, 0]);
        assert!(working.entry(0, 1));
        assert!(working.entry(1, 1));
        assert!(working.entry(1, 0));
        assert!(working.entry(2, 0));
        assert_eq!(working.low(0), None, "pivot arrays reset by rebuild");
    }

    #[test]
    fn row_priority_clear_and_parity() {
        let mut u = RowPriorityMatrix::identity(3);
        u.add_row(2, 0); // U[0,2] = 1
        assert!(u.entry(0, 2));
        u.clear(0, 2);
        assert!(!u.entry(0, 2));
        u.swap_columns(0);
        assert!(u.entry(0, 1)); // diagonal entry of raw column 0 moved
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn column_strategy() -> impl Strategy<Value = Vec<u32>> {
            proptest::collection::vec(0u32..32, 0..12)
        }

        proptest! {
            /// Mod-2: adding the same column twice is a no-op.
            #[test]
            fn double_add_is_identity(a in column_strategy(), b in column_strategy()) {
                let mut m = MapMatrix::new(32, 2);
                for &e in &a {
                    m.set_entry(e, 0);
                }
                for &e in &b {
                    m.set_entry(e, 1);
                }
                m.finalize(1);
                let before = m.col_entries(1).to_vec();
                m.add_column(0, 1);
                m.add_column(0, 1);
                m.finalize(1);
                prop_assert_eq!(m.col_entries(1), &before[..]);
            }

            /// The reduction always leaves distinct pivots and preserves the
            /// product with its upper-triangular factor.
            #[test]
            fn decompose_ru_preserves_product(
                cols in proptest::collection::vec(column_strategy(), 1..10)
            ) {
                let rows = 32u32;
                let mut r = PermMatrix::new(rows, cols.len() as u32);
                for (j, col) in cols.iter().enumerate() {
                    let mut entries = col.clone();
                    entries.sort_unstable();
                    entries.dedup();
                    r.set_col(j as u32, &entries);
                }
                let original = r.to_dense();
                let u = r.decompose_ru();
                prop_assert_eq!(dense_mul(&r.to_dense(), &u.to_dense()), original);

                let mut seen = std::collections::HashSet::new();
                for j in 0..cols.len() as u32 {
                    if let Some(pivot) = r.low(j) {
                        prop_assert!(seen.insert(pivot), "duplicate pivot {}", pivot);
                    }
                }
            }
        }
    }

    #[test]
    fn sorted_ops_merge_and_search() {
        let mut m = MapMatrix::new(6, 2);
        for e in [5, 1, 3] {
            m.set_entry(e, 0);
        }
        for e in [5, 2] {
            m.set_entry(e, 1);
        }
        m.sort_col(0);
        m.sort_col(1);
        assert_eq!(m.low_sorted(0), Some(5));
        assert!(m.entry_sorted(3, 0));
        m.add_column_sorted(0, 1);
        // {5,2} + {1,3,5} = {1,2,3}
        assert!(!m.entry_sorted(5, 1));
        assert_eq!(m.low_sorted(1), Some(3));
        assert!(m.entry_sorted(1, 1));
        assert!(m.entry_sorted(2, 1));
    }
}
