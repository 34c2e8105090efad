// crates/bipers-presentation/src/firep.rs

//! FIRep intake and normalisation.
//!
//! A raw FIRep arrives as two column lists with per-column bigrade indices
//! into caller-supplied sorted grade vectors. Normalisation applies axis
//! reversal and optional rebinning, sorts columns into colex order, and
//! verifies that the two boundary maps compose to zero.

use bipers_core::{Bigrade, Error, Exact, InputParameters, Result};
use bipers_matrix::{BigradedMatrix, IndexMatrix, MapMatrix};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use tracing::debug;

/// One sparse column with its bigrade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputColumn {
    pub grade: Bigrade,
    pub entries: Vec<u32>,
}

/// Raw FIRep, exactly as an external builder hands it over.
#[derive(Clone, Debug, Default)]
pub struct FirepInput {
    pub x_label: String,
    pub y_label: String,
    /// Sorted ascending, strictly or weakly.
    pub xs: Vec<Exact>,
    pub ys: Vec<Exact>,
    /// Module dimensions `(n_high, n_mid, n_low)`.
    pub num_high: u32,
    pub num_mid: u32,
    pub num_low: u32,
    /// Columns of `D_high : C_high → C_mid`, entries index `C_mid`.
    pub high_columns: Vec<InputColumn>,
    /// Columns of `D_low : C_mid → C_low`, entries index `C_low`.
    pub low_columns: Vec<InputColumn>,
}

/// Normalised FIRep: both boundary matrices in colex order over a shared
/// grade grid, ready for the bigraded reduction.
#[derive(Clone, Debug)]
pub struct Firep {
    pub x_label: String,
    pub y_label: String,
    pub xs: Vec<Exact>,
    pub ys: Vec<Exact>,
    pub hom_degree: u32,
    /// `D_low`, rows indexing `C_low`, columns indexing `C_mid`.
    pub low: BigradedMatrix,
    pub low_grades: Vec<Bigrade>,
    /// `D_high`, rows indexing `C_mid` (in the colex order of `low_grades`),
    /// columns indexing `C_high`.
    pub high: BigradedMatrix,
    pub high_grades: Vec<Bigrade>,
}

impl Firep {
    /// Normalise a raw FIRep.
    ///
    /// # Errors
    /// [`Error::Input`] on dimension mismatches, out-of-range indices or
    /// bigrades, or a nonzero composition `D_low · D_high`.
    pub fn from_input(input: FirepInput, params: &InputParameters) -> Result<Self> {
        if input.high_columns.len() != input.num_high as usize {
            return Err(Error::Input(format!(
                "expected {} high columns, found {}",
                input.num_high,
                input.high_columns.len()
            )));
        }
        if input.low_columns.len() != input.num_mid as usize {
            return Err(Error::Input(format!(
                "expected {} low columns, found {}",
                input.num_mid,
                input.low_columns.len()
            )));
        }

        let (xs, x_map) = normalise_axis(input.xs, params.x_reverse, params.x_bins)?;
        let (ys, y_map) = normalise_axis(input.ys, params.y_reverse, params.y_bins)?;
        let grid_x = xs.len() as u32;
        let grid_y = ys.len() as u32;

        let map_grade = |g: Bigrade| -> Result<Bigrade> {
            let x = *x_map
                .get(g.x as usize)
                .ok_or_else(|| Error::Input(format!("x-grade index {} out of range", g.x)))?;
            let y = *y_map
                .get(g.y as usize)
                .ok_or_else(|| Error::Input(format!("y-grade index {} out of range", g.y)))?;
            Ok(Bigrade::new(x, y))
        };

        // Sort mid columns into colex order and remember the inverse map so
        // high-column entries can be rewritten.
        let mut mid: Vec<(Bigrade, Vec<u32>)> = Vec::with_capacity(input.low_columns.len());
        for col in input.low_columns {
            for &e in &col.entries {
                if e >= input.num_low {
                    return Err(Error::Input(format!(
                        "low-column entry {e} exceeds row count {}",
                        input.num_low
                    )));
                }
            }
            mid.push((map_grade(col.grade)?, col.entries));
        }
        let mut mid_order: Vec<u32> = (0..mid.len() as u32).collect();
        mid_order.sort_by(|&a, &b| mid[a as usize].0.colex_cmp(&mid[b as usize].0));
        let mut mid_inverse = vec![0u32; mid.len()];
        for (new_idx, &old_idx) in mid_order.iter().enumerate() {
            mid_inverse[old_idx as usize] = new_idx as u32;
        }

        let mut low = BigradedMatrix::new(input.num_low, input.num_mid, grid_y, grid_x);
        let mut low_grades = Vec::with_capacity(mid.len());
        for (j, &old_idx) in mid_order.iter().enumerate() {
            let (grade, entries) = &mid[old_idx as usize];
            for &e in entries {
                low.mat.set_entry(e, j as u32);
            }
            low.mat.finalize(j as u32);
            low_grades.push(*grade);
        }
        low.ind = IndexMatrix::from_grades(&low_grades, grid_y, grid_x);

        // Sort high columns into colex order, rewriting entries through the
        // mid permutation.
        let mut high_cols: Vec<(Bigrade, Vec<u32>)> = Vec::with_capacity(input.high_columns.len());
        for col in input.high_columns {
            let mut entries = Vec::with_capacity(col.entries.len());
            for &e in &col.entries {
                if e >= input.num_mid {
                    return Err(Error::Input(format!(
                        "high-column entry {e} exceeds row count {}",
                        input.num_mid
                    )));
                }
                entries.push(mid_inverse[e as usize]);
            }
            high_cols.push((map_grade(col.grade)?, entries));
        }
        high_cols.sort_by(|a, b| a.0.colex_cmp(&b.0));

        let mut high = BigradedMatrix::new(input.num_mid, input.num_high, grid_y, grid_x);
        let mut high_grades = Vec::with_capacity(high_cols.len());
        for (j, (grade, entries)) in high_cols.iter().enumerate() {
            for &e in entries {
                high.mat.set_entry(e, j as u32);
            }
            high.mat.finalize(j as u32);
            high_grades.push(*grade);
        }
        high.ind = IndexMatrix::from_grades(&high_grades, grid_y, grid_x);

        // Column bigrades must dominate the bigrades of their entries.
        for (j, grade) in high_grades.iter().enumerate() {
            for &e in high.mat.col_entries(j as u32) {
                if !low_grades[e as usize].leq(grade) {
                    return Err(Error::Input(format!(
                        "high column {j} at {grade} has an entry at {}",
                        low_grades[e as usize]
                    )));
                }
            }
        }

        let firep = Self {
            x_label: input.x_label,
            y_label: input.y_label,
            xs,
            ys,
            hom_degree: params.hom_degree,
            low,
            low_grades,
            high,
            high_grades,
        };
        firep.validate_composition()?;
        debug!(
            mid = firep.low_grades.len(),
            high = firep.high_grades.len(),
            "normalised FIRep"
        );
        Ok(firep)
    }

    /// Check `D_low · D_high = 0`.
    ///
    /// # Errors
    /// [`Error::Input`] naming the first offending high column.
    pub fn validate_composition(&self) -> Result<()> {
        for j in 0..self.high.mat.width() {
            let mut acc: Vec<u32> = Vec::new();
            for &mid in self.high.mat.col_entries(j) {
                acc.extend_from_slice(self.low.mat.col_entries(mid));
            }
            acc.sort_unstable();
            let mut idx = 0;
            while idx < acc.len() {
                let mut run = 1;
                while idx + run < acc.len() && acc[idx + run] == acc[idx] {
                    run += 1;
                }
                if run % 2 == 1 {
                    return Err(Error::Input(format!(
                        "boundary composition is nonzero at high column {j}, row {}",
                        acc[idx]
                    )));
                }
                idx += run;
            }
        }
        Ok(())
    }

    /// Wrap a minimal presentation as a FIRep so the barcode-template stage
    /// can consume it: generators become boundaryless low columns, relations
    /// become the high columns.
    #[must_use]
    pub fn from_presentation(
        pres_mat: MapMatrix,
        col_ind: IndexMatrix,
        row_ind: &IndexMatrix,
        xs: Vec<Exact>,
        ys: Vec<Exact>,
        x_label: String,
        y_label: String,
        hom_degree: u32,
    ) -> Self {
        let row_grades = row_ind.grades();
        let col_grades = col_ind.grades();
        let n_gens = row_grades.len() as u32;
        let low = BigradedMatrix {
            mat: MapMatrix::new(0, n_gens),
            ind: row_ind.clone(),
        };
        let high = BigradedMatrix {
            mat: pres_mat,
            ind: col_ind,
        };
        Self {
            x_label,
            y_label,
            xs,
            ys,
            hom_degree,
            low,
            low_grades: row_grades,
            high,
            high_grades: col_grades,
        }
    }
}

/// Apply reversal and rebinning to one axis. Returns the final grade vector
/// and the map from old grade index to new grade index.
fn normalise_axis(values: Vec<Exact>, reverse: bool, bins: u32) -> Result<(Vec<Exact>, Vec<u32>)> {
    let n = values.len();
    let mut values = values;
    let mut index_map: Vec<u32> = (0..n as u32).collect();

    for window in values.windows(2) {
        if window[0] > window[1] {
            return Err(Error::Input("grade vector is not sorted".into()));
        }
    }

    if reverse {
        values = values.into_iter().rev().map(|v| -v).collect();
        for (old, slot) in index_map.iter_mut().enumerate() {
            *slot = (n - 1 - old) as u32;
        }
    }

    if bins > 0 && n > 0 {
        let min = values[0].clone();
        let max = values[n - 1].clone();
        let span = &max - &min;
        let mut bounds = Vec::with_capacity(bins as usize);
        for i in 0..bins {
            // Upper endpoint of bin i.
            bounds.push(&min + &span * Exact::new(BigInt::from(i + 1), BigInt::from(bins)));
        }
        let mut binned_map = vec![0u32; n];
        for (old, slot) in index_map.iter().enumerate() {
            let value = &values[*slot as usize];
            let bin = if span.is_zero() {
                0
            } else {
                let scaled = (value - &min) * Exact::from_integer(BigInt::from(bins)) / &span;
                let floor = scaled.floor().to_integer();
                floor
                    .to_u32()
                    .map_or(bins - 1, |b| b.min(bins - 1))
            };
            binned_map[old] = bin;
        }
        return Ok((bounds, binned_map));
    }

    // Deduplicate equal grade values so indices are canonical.
    let mut dedup: Vec<Exact> = Vec::with_capacity(n);
    let mut slot_to_dedup = vec![0u32; n];
    for (k, value) in values.iter().enumerate() {
        if dedup.last() != Some(value) {
            dedup.push(value.clone());
        }
        slot_to_dedup[k] = dedup.len() as u32 - 1;
    }
    let dedup_map = index_map
        .iter()
        .map(|&slot| slot_to_dedup[slot as usize])
        .collect();
    Ok((dedup, dedup_map))
}
