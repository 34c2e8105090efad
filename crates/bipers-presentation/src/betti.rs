// crates/bipers-presentation/src/betti.rs

//! Bigraded Betti numbers and the template-point support.
//!
//! ξ₀ and ξ₁ are read directly off a minimal presentation (row and column
//! bigrades); ξ₂ follows by inclusion–exclusion against the Hilbert
//! function.

use crate::presentation::Presentation;
use bipers_core::{Error, Result, TemplatePoint, UnsignedMatrix};

/// The three Betti-number grids, indexed `[x][y]`.
#[derive(Clone, Debug)]
pub struct BettiNumbers {
    num_x: u32,
    num_y: u32,
    xi: Vec<[i32; 3]>,
}

impl BettiNumbers {
    /// Read ξ₀/ξ₁ from a minimal presentation and derive ξ₂ from the
    /// Hilbert function.
    ///
    /// # Errors
    /// [`Error::Invariant`] if the presentation was not minimised.
    pub fn from_presentation(pres: &Presentation) -> Result<Self> {
        if !pres.is_minimized {
            return Err(Error::invariant(
                "betti::from_presentation",
                "presentation must be minimised before reading Betti numbers",
            ));
        }
        let num_x = pres.col_ind.width();
        let num_y = pres.col_ind.height();
        let mut betti = Self {
            num_x,
            num_y,
            xi: vec![[0; 3]; (num_x as usize) * (num_y as usize)],
        };
        for grade in pres.row_grades() {
            betti.slot_mut(grade.x, grade.y)[0] += 1;
        }
        for grade in pres.col_grades() {
            betti.slot_mut(grade.x, grade.y)[1] += 1;
        }
        betti.compute_xi2(&pres.hom_dims);
        Ok(betti)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> [i32; 3] {
        self.xi[(x as usize) * (self.num_y as usize) + y as usize]
    }

    fn slot_mut(&mut self, x: u32, y: u32) -> &mut [i32; 3] {
        &mut self.xi[(x as usize) * (self.num_y as usize) + y as usize]
    }

    /// Derive ξ₂ from the Hilbert function by inclusion–exclusion:
    /// the alternating sum of ξ over the lower set of `(x, y)` must equal
    /// `hom_dims(x, y)`.
    fn compute_xi2(&mut self, hom_dims: &UnsignedMatrix) {
        if self.num_x == 0 || self.num_y == 0 {
            return;
        }
        let hom = |x: u32, y: u32| hom_dims.get(x, y) as i32;

        let mut row_sum = self.get(0, 0)[0] - self.get(0, 0)[1];
        self.slot_mut(0, 0)[2] = hom(0, 0) - row_sum;

        for x in 1..self.num_x {
            row_sum += self.get(x - 1, 0)[2] + self.get(x, 0)[0] - self.get(x, 0)[1];
            self.slot_mut(x, 0)[2] = hom(x, 0) - row_sum;
        }

        for y in 1..self.num_y {
            row_sum = self.get(0, y)[0] - self.get(0, y)[1];
            self.slot_mut(0, y)[2] = hom(0, y) - (hom(0, y - 1) + row_sum);

            for x in 1..self.num_x {
                row_sum += self.get(x - 1, y)[2] + self.get(x, y)[0] - self.get(x, y)[1];
                self.slot_mut(x, y)[2] = hom(x, y) - (hom(x, y - 1) + row_sum);
            }
        }
    }

    /// The support: all bigrades with a nonzero multiplicity, in lex order.
    #[must_use]
    pub fn support_points(&self) -> Vec<TemplatePoint> {
        let mut points = Vec::new();
        for x in 0..self.num_x {
            for y in 0..self.num_y {
                let [xi0, xi1, xi2] = self.get(x, y);
                if xi0 != 0 || xi1 != 0 || xi2 != 0 {
                    points.push(TemplatePoint::new(x, y, xi0, xi1, xi2));
                }
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firep::{Firep, FirepInput, InputColumn};
    use bipers_core::{Bigrade, CancelFlag, Exact, InputParameters, NoProgress};
    use num_bigint::BigInt;

    fn rat(n: i64) -> Exact {
        Exact::from_integer(BigInt::from(n))
    }

    fn betti_of(input: FirepInput) -> (BettiNumbers, UnsignedMatrix) {
        let mut firep = Firep::from_input(input, &InputParameters::default()).unwrap();
        let mut pres = Presentation::new(&mut firep, &NoProgress, &CancelFlag::new()).unwrap();
        pres.minimize().unwrap();
        let betti = BettiNumbers::from_presentation(&pres).unwrap();
        (betti, pres.hom_dims.clone())
    }

    fn two_points_input() -> FirepInput {
        FirepInput {
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
        }
    }

    #[test]
    fn two_points_support() {
        let (betti, _) = betti_of(two_points_input());
        assert_eq!(betti.get(0, 0), [2, 0, 0]);
        assert_eq!(betti.get(1, 1), [0, 1, 0]);
        let support = betti.support_points();
        assert_eq!(support.len(), 2);
        assert_eq!(support[0].grade(), Bigrade::new(0, 0));
        assert_eq!(support[1].grade(), Bigrade::new(1, 1));
    }

    /// The alternating sum of Betti numbers over each lower set must give
    /// back the Hilbert function.
    #[test]
    fn euler_characteristic_matches_hilbert() {
        let (betti, hom) = betti_of(two_points_input());
        for x in 0..2u32 {
            for y in 0..2u32 {
                let mut acc = 0i32;
                for xp in 0..=x {
                    for yp in 0..=y {
                        let [a, b, c] = betti.get(xp, yp);
                        acc += a - b + c;
                    }
                }
                assert_eq!(acc, hom.get(x, y) as i32, "mismatch at ({x},{y})");
            }
        }
    }

    #[test]
    fn unminimised_presentation_is_rejected() {
        let mut firep =
            Firep::from_input(two_points_input(), &InputParameters::default()).unwrap();
        let pres = Presentation::new(&mut firep, &NoProgress, &CancelFlag::new()).unwrap();
        assert!(BettiNumbers::from_presentation(&pres).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Random filtered graphs over a 3×3 grid: vertices at arbitrary
        /// bigrades, edges appearing at the join of their endpoints.
        fn graph_strategy() -> impl Strategy<Value = FirepInput> {
            (
                proptest::collection::vec((0u32..3, 0u32..3), 1..6),
                proptest::collection::vec((0usize..16, 0usize..16), 0..8),
            )
                .prop_map(|(vertex_grades, edge_pairs)| {
                    let n = vertex_grades.len();
                    let low_columns: Vec<InputColumn> = vertex_grades
                        .iter()
                        .map(|&(x, y)| InputColumn {
                            grade: Bigrade::new(x, y),
                            entries: vec![],
                        })
                        .collect();
                    let mut high_columns = Vec::new();
                    for (a, b) in edge_pairs {
                        let (a, b) = (a % n, b % n);
                        if a == b {
                            continue;
                        }
                        let (ax, ay) = vertex_grades[a];
                        let (bx, by) = vertex_grades[b];
                        high_columns.push(InputColumn {
                            grade: Bigrade::new(ax.max(bx), ay.max(by)),
                            entries: vec![a as u32, b as u32],
                        });
                    }
                    FirepInput {
                        x_label: String::new(),
                        y_label: String::new(),
                        xs: vec![rat(0), rat(1), rat(2)],
                        ys: vec![rat(0), rat(1), rat(2)],
                        num_high: high_columns.len() as u32,
                        num_mid: n as u32,
                        num_low: 0,
                        high_columns,
                        low_columns,
                    }
                })
        }

        proptest! {
            #[test]
            fn alternating_sum_recovers_hilbert(input in graph_strategy()) {
                let (betti, hom) = betti_of(input);
                for x in 0..3u32 {
                    for y in 0..3u32 {
                        let mut acc = 0i32;
                        for xp in 0..=x {
                            for yp in 0..=y {
                                let [a, b, c] = betti.get(xp, yp);
                                acc += a - b + c;
                            }
                        }
                        prop_assert_eq!(acc, hom.get(x, y) as i32, "at ({},{})", x, y);
                    }
                }
            }
        }
    }
}
