// crates/bipers-arrangement/src/barcode.rs

//! Barcode templates and their numeric rescaling.
//!
//! A template is a multiset of pairs of template-point indices; the numeric
//! barcode only exists relative to a query line and is produced by
//! projecting the template points onto it.

use bipers_core::{Error, Result, TemplatePoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel template-point index for an endpoint at infinity.
pub const INFINITE_INDEX: u32 = u32::MAX;

/// Multiset of `(begin, end)` template-point index pairs.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BarcodeTemplate {
    bars: BTreeMap<(u32, u32), u32>,
}

impl BarcodeTemplate {
    /// Add one bar (or bump its multiplicity).
    pub fn add_bar(&mut self, begin: u32, end: u32) {
        *self.bars.entry((begin, end)).or_insert(0) += 1;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Iterate `(begin, end, multiplicity)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.bars.iter().map(|(&(a, b), &m)| (a, b, m))
    }

    /// Rebuild from serialised triples.
    #[must_use]
    pub fn from_triples(triples: &[(u32, u32, u32)]) -> Self {
        let mut template = Self::default();
        for &(a, b, m) in triples {
            *template.bars.entry((a, b)).or_insert(0) += m;
        }
        template
    }

    /// Rescale onto the line with the given angle (degrees, in `[0, 90]`)
    /// and offset. Bars whose endpoints coincide are dropped; a suppressed
    /// birth endpoint drops the bar.
    ///
    /// # Errors
    /// [`Error::Query`] when the angle is outside `[0, 90]` or a bar
    /// references an unknown template point.
    pub fn rescale(
        &self,
        angle: f64,
        offset: f64,
        template_points: &[TemplatePoint],
        x_grades: &[f64],
        y_grades: &[f64],
    ) -> Result<Barcode> {
        if !(0.0..=90.0).contains(&angle) {
            return Err(Error::Query(format!("angle {angle} outside [0, 90]")));
        }
        let mut barcode = Barcode::default();
        for (begin, end, multiplicity) in self.iter() {
            let birth = project(begin, angle, offset, template_points, x_grades, y_grades)?;
            let Some(birth) = birth else {
                continue; // no projection ⇒ no bar on this line
            };
            let death = if end == INFINITE_INDEX {
                f64::INFINITY
            } else {
                match project(end, angle, offset, template_points, x_grades, y_grades)? {
                    Some(value) => value,
                    None => f64::INFINITY,
                }
            };
            if death > birth {
                barcode.add(birth, death, multiplicity);
            }
        }
        Ok(barcode)
    }
}

/// Project one template point onto the query line; `None` when the point has
/// no projection (possible only for horizontal and vertical lines).
fn project(
    index: u32,
    angle: f64,
    offset: f64,
    template_points: &[TemplatePoint],
    x_grades: &[f64],
    y_grades: &[f64],
) -> Result<Option<f64>> {
    let point = template_points
        .get(index as usize)
        .ok_or_else(|| Error::Query(format!("template point {index} out of range")))?;
    let x = x_grades[point.x as usize];
    let y = y_grades[point.y as usize];

    if angle == 0.0 {
        // Horizontal line: points above it never appear.
        Ok((y <= offset).then_some(x))
    } else if angle == 90.0 {
        // Vertical line at x = -offset.
        Ok((x <= -offset).then_some(y))
    } else {
        let radians = angle.to_radians();
        // Height of the projected point: up to the line when the point is
        // below it, straight across otherwise; arc position follows by
        // dividing out sin.
        let on_line = x * radians.tan() + offset / radians.cos();
        Ok(Some(on_line.max(y) / radians.sin()))
    }
}

/// One numeric bar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub birth: f64,
    /// `f64::INFINITY` for an essential class.
    pub death: f64,
    pub multiplicity: u32,
}

/// A rescaled barcode: numeric bars with multiplicities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    pub bars: Vec<Bar>,
}

impl Barcode {
    fn add(&mut self, birth: f64, death: f64, multiplicity: u32) {
        self.bars.push(Bar {
            birth,
            death,
            multiplicity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag_points() -> Vec<TemplatePoint> {
        vec![
            TemplatePoint::new(0, 0, 2, 0, 0),
            TemplatePoint::new(1, 1, 0, 1, 0),
        ]
    }

    #[test]
    fn diagonal_projection_gives_arc_length() {
        let mut template = BarcodeTemplate::default();
        template.add_bar(0, 1);
        let barcode = template
            .rescale(45.0, 0.0, &diag_points(), &[0.0, 1.0], &[0.0, 1.0])
            .unwrap();
        assert_eq!(barcode.bars.len(), 1);
        let bar = barcode.bars[0];
        assert!((bar.birth - 0.0).abs() < 1e-12);
        assert!((bar.death - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn infinite_bars_survive() {
        let mut template = BarcodeTemplate::default();
        template.add_bar(0, INFINITE_INDEX);
        let barcode = template
            .rescale(45.0, 0.0, &diag_points(), &[0.0, 1.0], &[0.0, 1.0])
            .unwrap();
        assert_eq!(barcode.bars.len(), 1);
        assert!(barcode.bars[0].death.is_infinite());
    }

    #[test]
    fn horizontal_line_suppresses_points_above() {
        let mut template = BarcodeTemplate::default();
        template.add_bar(1, INFINITE_INDEX); // point at height 1
        let below = template
            .rescale(0.0, 0.5, &diag_points(), &[0.0, 1.0], &[0.0, 1.0])
            .unwrap();
        assert!(below.bars.is_empty());
        let above = template
            .rescale(0.0, 1.5, &diag_points(), &[0.0, 1.0], &[0.0, 1.0])
            .unwrap();
        assert_eq!(above.bars.len(), 1);
        assert!((above.bars[0].birth - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_length_bars_are_dropped() {
        let mut template = BarcodeTemplate::default();
        template.add_bar(0, 0);
        let barcode = template
            .rescale(45.0, 0.0, &diag_points(), &[0.0, 1.0], &[0.0, 1.0])
            .unwrap();
        assert!(barcode.bars.is_empty());
    }

    #[test]
    fn bad_angle_is_a_query_error() {
        let template = BarcodeTemplate::default();
        let err = template
            .rescale(120.0, 0.0, &diag_points(), &[0.0, 1.0], &[0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn multiplicities_accumulate() {
        let mut template = BarcodeTemplate::default();
        template.add_bar(0, 1);
        template.add_bar(0, 1);
        assert_eq!(template.iter().collect::<Vec<_>>(), vec![(0, 1, 2)]);
        let rebuilt = BarcodeTemplate::from_triples(&[(0, 1, 2)]);
        assert_eq!(rebuilt, template);
    }
}
