// crates/bipers-matrix/src/bigraded.rs

//! Bigraded matrices: a column-sparse matrix paired with an index matrix
//! recording where each bigrade's columns end.
//!
//! The colex form owns the kernel computation: a bigraded reduction with a
//! slave identity matrix whose columns become kernel generators whenever a
//! matrix column zeroes out.

use crate::index_matrix::{IndexMatrix, IndexMatrixLex};
use crate::map_matrix::MapMatrix;
use bipers_core::Result;

/// Bigraded matrix in colex column order.
#[derive(Clone, Debug)]
pub struct BigradedMatrix {
    pub mat: MapMatrix,
    pub ind: IndexMatrix,
}

/// Bigraded matrix in lex column order.
#[derive(Clone, Debug)]
pub struct BigradedMatrixLex {
    pub mat: MapMatrix,
    pub ind: IndexMatrixLex,
}

impl BigradedMatrix {
    #[must_use]
    pub fn new(rows: u32, cols: u32, y_grades: u32, x_grades: u32) -> Self {
        Self {
            mat: MapMatrix::new(rows, cols),
            ind: IndexMatrix::new(y_grades, x_grades),
        }
    }

    /// Compute a colex-ordered basis of the kernel via the standard bigraded
    /// reduction with a slave identity matrix.
    ///
    /// Bigrades are visited in lex order; at bigrade `(x, y)` every column in
    /// row `y` with x-grade ≤ `x` is (re)considered, so a column first
    /// reduced at its own bigrade may be zeroed later, once columns at
    /// incomparable bigrades become legal reducers. A column that zeroes out
    /// at visit `(x, y)` donates its slave column as a kernel generator at
    /// `(x, y)`; a column that is already empty at its own bigrade donates
    /// the identity slave column.
    ///
    /// # Errors
    /// Propagates invariant failures from column bookkeeping.
    pub fn kernel(&mut self) -> Result<Self> {
        let width = self.mat.width();
        let height = self.mat.height();
        let (grid_y, grid_x) = (self.ind.height(), self.ind.width());

        let mut slave = MapMatrix::identity(width);
        let mut ker_lex = MapMatrix::new(width, 0);
        let mut ker_grades: Vec<(u32, u32)> = Vec::new();

        let mut lows: Vec<Option<u32>> = vec![None; height as usize];
        let mut harvested: Vec<bool> = vec![false; width as usize];

        for x in 0..grid_x {
            for y in 0..grid_y {
                let first_col = self.ind.start_index(y, 0);
                let last_col = self.ind.get(y, x);
                for j in first_col..=last_col {
                    let j = j as u32;
                    if harvested[j as usize] {
                        continue;
                    }

                    let mut changing = false;
                    let mut low = self.mat.remove_low(j);
                    if let Some(l) = low {
                        if matches!(lows[l as usize], Some(c) if c < j) {
                            changing = true;
                        }
                    }
                    while let Some(l) = low {
                        match lows[l as usize] {
                            Some(c) if c < j => {
                                self.mat.add_column_popped(c, j);
                                slave.add_column(c, j);
                                low = self.mat.remove_low(j);
                            }
                            _ => break,
                        }
                    }

                    if let Some(l) = low {
                        self.mat.push_index(j, l);
                        if changing {
                            self.mat.finalize(j);
                        }
                        lows[l as usize] = Some(j);
                    } else {
                        // Column j is zero: its slave column is a kernel
                        // generator at the current visit bigrade.
                        slave.finalize(j);
                        ker_lex.move_col_from(&mut slave, j);
                        ker_grades.push((x, y));
                        harvested[j as usize] = true;
                    }
                }
            }
        }

        // Re-bucket the lex-ordered kernel into colex order.
        let mut colex = Self::new(width, 0, grid_y, grid_x);
        let mut order: Vec<u32> = (0..ker_lex.width()).collect();
        order.sort_by_key(|&j| {
            let (x, y) = ker_grades[j as usize];
            (y, x)
        });
        let mut next = 0usize;
        for y in 0..grid_y {
            for x in 0..grid_x {
                while next < order.len() && ker_grades[order[next] as usize] == (x, y) {
                    colex.mat.move_col_from(&mut ker_lex, order[next]);
                    next += 1;
                }
                colex.ind.set(y, x, colex.mat.width() as i64 - 1);
            }
        }
        Ok(colex)
    }
}

impl BigradedMatrixLex {
    #[must_use]
    pub fn new(rows: u32, cols: u32, y_grades: u32, x_grades: u32) -> Self {
        Self {
            mat: MapMatrix::new(rows, cols),
            ind: IndexMatrixLex::new(y_grades, x_grades),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bipers_core::Bigrade;

    /// D_low for two vertices at (0,0) and one edge joining them at (1,1)
    /// does not exist in homology degree 0 (no rows); the kernel is all of
    /// the domain, generated at the column grades.
    #[test]
    fn kernel_of_zero_map_is_everything() {
        let grades = vec![Bigrade::new(0, 0), Bigrade::new(0, 0)];
        let mut mat = BigradedMatrix::new(0, 2, 2, 2);
        mat.ind = IndexMatrix::from_grades(&grades, 2, 2);
        let ker = mat.kernel().unwrap();
        assert_eq!(ker.mat.width(), 2);
        assert_eq!(ker.ind.get(0, 0), 1);
        assert_eq!(ker.mat.col_entries(0), &[0]);
        assert_eq!(ker.mat.col_entries(1), &[1]);
    }

    /// Three edges of a triangle: the kernel is the single cycle, born at the
    /// join of the edge grades.
    #[test]
    fn triangle_cycle_appears_at_join() {
        // edges: 01 at (1,0), 12 at (0,1), 02 at (1,1); vertices rows 0..3
        let grades = vec![Bigrade::new(1, 0), Bigrade::new(0, 1), Bigrade::new(1, 1)];
        let mut mat = BigradedMatrix::new(3, 3, 2, 2);
        mat.ind = IndexMatrix::from_grades(&grades, 2, 2);
        mat.mat.set_entry(0, 0);
        mat.mat.set_entry(1, 0);
        mat.mat.set_entry(1, 1);
        mat.mat.set_entry(2, 1);
        mat.mat.set_entry(0, 2);
        mat.mat.set_entry(2, 2);
        for j in 0..3 {
            mat.mat.finalize(j);
        }

        let ker = mat.kernel().unwrap();
        assert_eq!(ker.mat.width(), 1);
        // generator appears at (1,1): all columns sum to zero there
        assert_eq!(ker.ind.get(0, 0), -1);
        assert_eq!(ker.ind.get(0, 1), -1);
        assert_eq!(ker.ind.get(1, 0), -1);
        assert_eq!(ker.ind.get(1, 1), 0);
        assert_eq!(ker.mat.col_entries(0), &[2, 1, 0]);
    }

    /// A column that is reduced at its own bigrade but only becomes zero at a
    /// later visit, via an incomparable reducer.
    #[test]
    fn duplicate_single_entry_columns_cancel_at_join() {
        // columns: a at (0,1) = {0}, b at (1,0) = {0}, c at (1,1) = {0}
        let grades = vec![Bigrade::new(1, 0), Bigrade::new(0, 1), Bigrade::new(1, 1)];
        let mut mat = BigradedMatrix::new(1, 3, 2, 2);
        mat.ind = IndexMatrix::from_grades(&grades, 2, 2);
        for j in 0..3 {
            mat.mat.set_entry(0, j);
        }
        let ker = mat.kernel().unwrap();
        // kernel rank at (1,1) = 2: {a+b} and {b+c} (or equivalent basis)
        assert_eq!(ker.mat.width(), 2);
        assert_eq!(ker.ind.get(1, 1), 1);
        assert_eq!(ker.ind.get(0, 1), -1);
        assert_eq!(ker.ind.get(1, 0), -1);
    }
}
