// crates/bipers-matrix/src/index_matrix.rs

//! Index matrices: per-bigrade column bookkeeping for bigraded matrices.
//!
//! The colex form stores at `(y, x)` the index of the last column whose
//! bigrade is ≤ `(x, y)` in the colex order (or -1 if there is none); the lex
//! form is the analogue with x outermost. Both expose the product-order
//! column count used by the Hilbert function.

use bipers_core::Bigrade;

/// Colex-ordered index matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexMatrix {
    num_rows: u32, // y extent
    num_cols: u32, // x extent
    data: Vec<i64>,
}

impl IndexMatrix {
    /// All entries initialised to -1.
    #[must_use]
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            num_rows: rows,
            num_cols: cols,
            data: vec![-1; (rows as usize) * (cols as usize)],
        }
    }

    /// Build from a colex-sorted list of column bigrades.
    #[must_use]
    pub fn from_grades(grades: &[Bigrade], rows: u32, cols: u32) -> Self {
        let mut mat = Self::new(rows, cols);
        let mut col = 0usize;
        for y in 0..rows {
            for x in 0..cols {
                while col < grades.len() && grades[col].y == y && grades[col].x == x {
                    col += 1;
                }
                mat.set(y, x, col as i64 - 1);
            }
        }
        mat
    }

    /// Expand back into one bigrade per column, in colex order.
    #[must_use]
    pub fn grades(&self) -> Vec<Bigrade> {
        let mut out = Vec::new();
        let mut prev = -1i64;
        for y in 0..self.num_rows {
            for x in 0..self.num_cols {
                let last = self.get(y, x);
                for _ in prev..last {
                    out.push(Bigrade::new(x, y));
                }
                prev = last;
            }
        }
        out
    }

    #[inline]
    #[must_use]
    pub fn get(&self, y: u32, x: u32) -> i64 {
        self.data[(self.num_cols * y + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, y: u32, x: u32, value: i64) {
        self.data[(self.num_cols * y + x) as usize] = value;
    }

    /// Index of the last column overall.
    #[inline]
    #[must_use]
    pub fn last(&self) -> i64 {
        self.data.last().copied().unwrap_or(-1)
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.num_cols
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.num_rows
    }

    /// First column whose bigrade is at least `(x, y)` in colex order.
    #[must_use]
    pub fn start_index(&self, y: u32, x: u32) -> i64 {
        if x > 0 {
            self.get(y, x - 1) + 1
        } else if y > 0 {
            self.get(y - 1, self.num_cols - 1) + 1
        } else {
            0
        }
    }

    /// Number of columns with bigrade ≤ `(x, y)` in the product order.
    #[must_use]
    pub fn num_columns_leq(&self, y: u32, x: u32) -> u32 {
        let mut count = 0i64;
        for row in 0..=y {
            let row_start = if row > 0 {
                self.get(row - 1, self.num_cols - 1)
            } else {
                -1
            };
            count += self.get(row, x) - row_start;
        }
        count as u32
    }
}

/// Lex-ordered index matrix: `(y, x)` holds the last column ≤ `(x, y)` in lex
/// order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexMatrixLex {
    num_rows: u32,
    num_cols: u32,
    data: Vec<i64>,
}

impl IndexMatrixLex {
    #[must_use]
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            num_rows: rows,
            num_cols: cols,
            data: vec![-1; (rows as usize) * (cols as usize)],
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, y: u32, x: u32) -> i64 {
        self.data[(self.num_cols * y + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, y: u32, x: u32, value: i64) {
        self.data[(self.num_cols * y + x) as usize] = value;
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.num_cols
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.num_rows
    }

    /// First column whose bigrade is at least `(x, y)` in lex order.
    #[must_use]
    pub fn start_index(&self, y: u32, x: u32) -> i64 {
        if y > 0 {
            self.get(y - 1, x) + 1
        } else if x > 0 {
            self.get(self.num_rows - 1, x - 1) + 1
        } else {
            0
        }
    }
}
