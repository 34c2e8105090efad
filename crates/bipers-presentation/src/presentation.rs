// crates/bipers-presentation/src/presentation.rs

//! From FIRep to minimal presentation.
//!
//! Three passes over the boundary matrices:
//! 1. a lex-order bigraded reduction of `D_high` keeping a minimal
//!    generating set of its image (and the pointwise ranks),
//! 2. the kernel of `D_low` with a slave identity matrix,
//! 3. re-expression of each image generator in kernel coordinates, giving
//!    the presentation matrix; minimisation then cancels every column whose
//!    pivot row shares its bigrade.

use crate::firep::Firep;
use bipers_core::{
    Bigrade, CancelFlag, Error, Progress, Result, UnsignedMatrix,
};
use bipers_matrix::{BigradedMatrix, BigradedMatrixLex, IndexMatrix, MapMatrix};
use tracing::{debug, info};

/// A (possibly minimised) presentation of the homology module.
///
/// Rows are kernel generators of `D_low`, columns are relations; both carry
/// bigrades through the index matrices. `hom_dims` is the Hilbert function.
#[derive(Clone, Debug)]
pub struct Presentation {
    pub mat: MapMatrix,
    pub col_ind: IndexMatrix,
    pub row_ind: IndexMatrix,
    pub hom_dims: UnsignedMatrix,
    pub is_minimized: bool,
}

impl Presentation {
    /// Build the (unminimised) presentation of a FIRep.
    ///
    /// # Errors
    /// [`Error::Cancelled`] at a poll point, or [`Error::Invariant`] if a
    /// high column fails to reduce against the kernel (which would mean the
    /// composition precondition was violated).
    pub fn new(firep: &mut Firep, progress: &dyn Progress, cancel: &CancelFlag) -> Result<Self> {
        let grid_x = firep.low.ind.width();
        let grid_y = firep.low.ind.height();

        let mut ranks = UnsignedMatrix::new(grid_x, grid_y);
        let min_gens = min_gens_of_image(&mut firep.high, &mut ranks);
        progress.progress(40);
        cancel.check()?;

        let kernel = firep.low.kernel()?;
        progress.progress(55);
        cancel.check()?;
        debug!(
            generators = kernel.mat.width(),
            relations = min_gens.mat.width(),
            "kernel and image generators computed"
        );

        // Hilbert function: kernel columns minus image rank, pointwise.
        let mut hom_dims = UnsignedMatrix::new(grid_x, grid_y);
        for x in 0..grid_x {
            for y in 0..grid_y {
                let kernel_count = kernel.ind.num_columns_leq(y, x);
                hom_dims.set(x, y, kernel_count - ranks.get(x, y));
            }
        }

        let (mat, col_ind) = kernel_coordinates(min_gens, &kernel)?;
        progress.progress(70);
        cancel.check()?;

        Ok(Self {
            mat,
            col_ind,
            row_ind: kernel.ind,
            hom_dims,
            is_minimized: false,
        })
    }

    /// Row (generator) bigrades, in colex order.
    #[must_use]
    pub fn row_grades(&self) -> Vec<Bigrade> {
        self.row_ind.grades()
    }

    /// Column (relation) bigrades, in colex order.
    #[must_use]
    pub fn col_grades(&self) -> Vec<Bigrade> {
        self.col_ind.grades()
    }

    /// Minimise in place: for every column whose pivot row has the same
    /// bigrade, cancel the pivot row out of all later columns and delete
    /// both; then reindex the surviving rows.
    ///
    /// # Errors
    /// [`Error::Invariant`] if a surviving column references a deleted row.
    pub fn minimize(&mut self) -> Result<()> {
        let col_grades = self.col_ind.grades();
        let row_grades = self.row_ind.grades();
        let width = self.mat.width();
        let height = self.mat.height();

        for j in 0..width {
            self.mat.sort_col(j);
        }

        let mut dead_row = vec![false; height as usize];
        let mut kept_cols: Vec<u32> = Vec::with_capacity(width as usize);

        for i in 0..width {
            let grade = col_grades[i as usize];
            match self.mat.low_sorted(i) {
                Some(pivot) if row_grades[pivot as usize] == grade => {
                    dead_row[pivot as usize] = true;
                    for j in (i + 1)..width {
                        if self.mat.entry_sorted(pivot, j) {
                            self.mat.add_column_sorted(i, j);
                        }
                    }
                    // column i is dropped together with its pivot row
                }
                _ => kept_cols.push(i),
            }
        }

        let mut new_row_indices = vec![-1i64; height as usize];
        let mut surviving_row_grades = Vec::new();
        let mut next = 0i64;
        for (row, dead) in dead_row.iter().enumerate() {
            if !dead {
                new_row_indices[row] = next;
                surviving_row_grades.push(row_grades[row]);
                next += 1;
            }
        }

        let mut kept_col_grades = Vec::with_capacity(kept_cols.len());
        for (slot, &col) in kept_cols.iter().enumerate() {
            self.mat.move_col_within(col, slot as u32);
            kept_col_grades.push(col_grades[col as usize]);
        }
        self.mat.resize(next as u32, kept_cols.len() as u32);
        for j in 0..self.mat.width() {
            self.mat.reindex_column(j, &new_row_indices)?;
        }

        let grid_y = self.col_ind.height();
        let grid_x = self.col_ind.width();
        self.col_ind = IndexMatrix::from_grades(&kept_col_grades, grid_y, grid_x);
        self.row_ind = IndexMatrix::from_grades(&surviving_row_grades, grid_y, grid_x);
        self.is_minimized = true;
        info!(
            rows = surviving_row_grades.len(),
            cols = kept_col_grades.len(),
            "presentation minimised"
        );
        Ok(())
    }
}

/// Lex-order bigraded reduction of `D_high` that copies every surviving
/// column into a lex-ordered minimal generating set of the image, while
/// accumulating the pointwise ranks of the map.
fn min_gens_of_image(high: &mut BigradedMatrix, ranks: &mut UnsignedMatrix) -> BigradedMatrixLex {
    let grid_x = high.ind.width();
    let grid_y = high.ind.height();
    let mut new_high = BigradedMatrixLex::new(high.mat.height(), 0, grid_y, grid_x);
    let mut lows: Vec<Option<u32>> = vec![None; high.mat.height() as usize];

    for x in 0..grid_x {
        for y in 0..grid_y {
            let mut rank_here = if y > 0 { ranks.get(x, y - 1) } else { 0 };
            let first_col = high.ind.start_index(y, 0);
            let last_col = high.ind.get(y, x);
            let own_start = high.ind.start_index(y, x);
            for j in first_col..=last_col {
                let j = j as u32;
                let mut changing = false;
                let mut low = high.mat.remove_low(j);
                if let Some(l) = low {
                    if matches!(lows[l as usize], Some(c) if c < j) {
                        changing = true;
                    }
                }
                while let Some(l) = low {
                    match lows[l as usize] {
                        Some(c) if c < j => {
                            high.mat.add_column_popped(c, j);
                            low = high.mat.remove_low(j);
                        }
                        _ => break,
                    }
                }
                if let Some(l) = low {
                    high.mat.push_index(j, l);
                    if changing {
                        high.mat.finalize(j);
                    }
                    lows[l as usize] = Some(j);
                    rank_here += 1;
                    if i64::from(j) >= own_start {
                        // First visit of a surviving column: a minimal
                        // generator of the image at this bigrade.
                        new_high.mat.append_col_copy(&high.mat, j);
                    }
                }
            }
            ranks.set(x, y, rank_here);
            new_high.ind.set(y, x, i64::from(new_high.mat.width()) - 1);
        }
    }
    new_high
}

/// Re-express each image generator in the kernel basis, in colex order of
/// the generators' bigrades. The recorded coefficients form the presentation
/// matrix.
fn kernel_coordinates(
    mut high: BigradedMatrixLex,
    kernel: &BigradedMatrix,
) -> Result<(MapMatrix, IndexMatrix)> {
    let grid_x = high.ind.width();
    let grid_y = high.ind.height();

    let mut ker_lows: Vec<Option<u32>> = vec![None; kernel.mat.height() as usize];
    for i in 0..kernel.mat.width() {
        if let Some(low) = kernel.mat.low_finalized(i) {
            ker_lows[low as usize] = Some(i);
        }
    }

    let mut pres = MapMatrix::new(kernel.mat.width(), high.mat.width());
    let mut col_ind = IndexMatrix::new(grid_y, grid_x);
    let mut num_added: u32 = 0;

    for y in 0..grid_y {
        for x in 0..grid_x {
            let first_col = high.ind.start_index(y, x);
            let last_col = high.ind.get(y, x);
            for j in first_col..=last_col {
                let j = j as u32;
                let mut low = high.mat.remove_low(j);
                while let Some(l) = low {
                    let c = ker_lows[l as usize].ok_or_else(|| {
                        Error::invariant(
                            "presentation::kernel_coordinates",
                            format!("no kernel column with pivot {l}"),
                        )
                    })?;
                    high.mat.add_column_popped_from(&kernel.mat, c, j);
                    pres.set_entry(c, num_added);
                    low = high.mat.remove_low(j);
                }
                num_added += 1;
            }
            col_ind.set(y, x, i64::from(num_added) - 1);
        }
    }
    for j in 0..pres.width() {
        pres.finalize(j);
    }
    Ok((pres, col_ind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firep::{FirepInput, InputColumn};
    use bipers_core::{Exact, InputParameters, NoProgress};
    use num_bigint::BigInt;

    fn rat(n: i64) -> Exact {
        Exact::from_integer(BigInt::from(n))
    }

    fn build(input: FirepInput) -> Presentation {
        let mut firep = Firep::from_input(input, &InputParameters::default()).unwrap();
        let mut pres =
            Presentation::new(&mut firep, &NoProgress, &CancelFlag::new()).unwrap();
        pres.minimize().unwrap();
        pres
    }

    /// Two vertices joined by one edge: two generators at (0,0), one
    /// relation at (1,1); nothing cancels during minimisation.
    #[test]
    fn two_points_one_bar() {
        let pres = build(FirepInput {
            x_label: String::new(),
            y_label: String::new(),
            xs: vec![rat(0), rat(1)],
            ys: vec![rat(0), rat(1)],
            num_high: 1,
            num_mid: 2,
            num_low: 0,
            high_columns: vec![InputColumn {
                grade: Bigrade::new(1, 1),
                entries: vec![0, 1],
            }],
            low_columns: vec![
                InputColumn {
                    grade: Bigrade::new(0, 0),
                    entries: vec![],
                },
                InputColumn {
                    grade: Bigrade::new(0, 0),
                    entries: vec![],
                },
            ],
        });
        assert_eq!(pres.row_grades(), vec![Bigrade::new(0, 0); 2]);
        assert_eq!(pres.col_grades(), vec![Bigrade::new(1, 1)]);
        // Hilbert: 2 components at (0,0), 1 after the edge appears.
        assert_eq!(pres.hom_dims.get(0, 0), 2);
        assert_eq!(pres.hom_dims.get(1, 0), 2);
        assert_eq!(pres.hom_dims.get(1, 1), 1);
    }

    /// A vertex and an edge appearing at the same bigrade as its second
    /// endpoint: the relation cancels a generator during minimisation.
    #[test]
    fn minimisation_cancels_same_grade_pair() {
        // vertices a at (0,0), b at (1,0); edge ab at (1,0)
        let pres = build(FirepInput {
            x_label: String::new(),
            y_label: String::new(),
            xs: vec![rat(0), rat(1)],
            ys: vec![rat(0)],
            num_high: 1,
            num_mid: 2,
            num_low: 0,
            high_columns: vec![InputColumn {
                grade: Bigrade::new(1, 0),
                entries: vec![0, 1],
            }],
            low_columns: vec![
                InputColumn {
                    grade: Bigrade::new(0, 0),
                    entries: vec![],
                },
                InputColumn {
                    grade: Bigrade::new(1, 0),
                    entries: vec![],
                },
            ],
        });
        // One generator at (0,0) survives; no relations remain.
        assert_eq!(pres.row_grades(), vec![Bigrade::new(0, 0)]);
        assert!(pres.col_grades().is_empty());
        assert_eq!(pres.hom_dims.get(0, 0), 1);
        assert_eq!(pres.hom_dims.get(1, 0), 1);
    }

    /// Hilbert function equals the alternating partial sum of the Betti
    /// numbers (checked in betti.rs tests end-to-end).
    #[test]
    fn empty_firep_yields_empty_presentation() {
        let pres = build(FirepInput {
            x_label: String::new(),
            y_label: String::new(),
            xs: vec![rat(0)],
            ys: vec![rat(0)],
            num_high: 0,
            num_mid: 0,
            num_low: 0,
            high_columns: vec![],
            low_columns: vec![],
        });
        assert!(pres.row_grades().is_empty());
        assert!(pres.col_grades().is_empty());
        assert_eq!(pres.hom_dims.get(0, 0), 0);
    }
}
