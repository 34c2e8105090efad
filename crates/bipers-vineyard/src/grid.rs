// crates/bipers-vineyard/src/grid.rs

//! The template-point grid: one entry per template point or anchor, linked
//! down each column and left along each row, carrying the level sets of the
//! lift map during the traversal.

use bipers_core::TemplatePoint;

/// Index into [`TemplatePointsGrid::entries`].
pub type EntryId = usize;

/// A block of simplices sharing one multigrade inside an equivalence class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Multigrade {
    pub x: u32,
    pub y: u32,
    /// Number of columns at this multigrade.
    pub num_cols: u32,
    /// Rightmost column index of the block, in whatever order the owner is
    /// currently tracking.
    pub simplex_index: i64,
}

impl Multigrade {
    /// Reverse-lexicographic order used when building the simplex order.
    #[must_use]
    pub fn lex_desc(&self, other: &Self) -> std::cmp::Ordering {
        other.x.cmp(&self.x).then(other.y.cmp(&self.y))
    }
}

/// One cell of the template-point grid.
#[derive(Clone, Debug)]
pub struct GridEntry {
    pub x: u32,
    pub y: u32,
    /// Index into the template-point vector.
    pub index: u32,
    /// Next entry below in the same column.
    pub down: Option<EntryId>,
    /// Next entry to the left in the same row.
    pub left: Option<EntryId>,

    pub low_simplices: Vec<Multigrade>,
    pub high_simplices: Vec<Multigrade>,
    pub low_count: u32,
    pub high_count: u32,
    /// Rightmost column index of this class, low/high respectively.
    pub low_index: i64,
    pub high_index: i64,
}

impl GridEntry {
    fn new(x: u32, y: u32, index: u32, down: Option<EntryId>, left: Option<EntryId>) -> Self {
        Self {
            x,
            y,
            index,
            down,
            left,
            low_simplices: Vec::new(),
            high_simplices: Vec::new(),
            low_count: 0,
            high_count: 0,
            low_index: 0,
            high_index: 0,
        }
    }

    /// Append a multigrade block to the given level set.
    pub fn add_multigrade(&mut self, x: u32, y: u32, num_cols: u32, simplex_index: i64, low: bool) {
        let mg = Multigrade {
            x,
            y,
            num_cols,
            simplex_index,
        };
        if low {
            self.low_simplices.push(mg);
            self.low_count += num_cols;
        } else {
            self.high_simplices.push(mg);
            self.high_count += num_cols;
        }
    }
}

/// Sparse grid over the grade lattice with column/row linkage.
#[derive(Clone, Debug)]
pub struct TemplatePointsGrid {
    pub entries: Vec<GridEntry>,
    /// Topmost entry in each column.
    pub columns: Vec<Option<EntryId>>,
    /// Rightmost entry in each row.
    pub rows: Vec<Option<EntryId>>,
}

impl TemplatePointsGrid {
    /// Populate the grid from the template points (which must arrive in lex
    /// order) and complete them with anchors. Anchors that are not support
    /// points are appended to `template_points` with zero multiplicities.
    ///
    /// Returns the grid together with the bigrades of all anchors.
    #[must_use]
    pub fn fill_and_find_anchors(
        width: u32,
        height: u32,
        template_points: &mut Vec<TemplatePoint>,
    ) -> (Self, Vec<(u32, u32)>) {
        let mut grid = Self {
            entries: Vec::new(),
            columns: vec![None; width as usize],
            rows: vec![None; height as usize],
        };
        let mut anchors = Vec::new();
        let mut next_point = 0usize;

        for i in 0..width {
            for j in 0..height {
                let is_support = template_points
                    .get(next_point)
                    .is_some_and(|p| p.x == i && p.y == j);

                let column_below = grid.columns[i as usize];
                let row_left = grid.rows[j as usize];
                // A strict anchor joins an entry below and an entry to the
                // left; a support point with one of the two is non-strict.
                let is_anchor = (column_below.is_some() && row_left.is_some())
                    || (is_support && (column_below.is_some() || row_left.is_some()));

                if !(is_support || is_anchor) {
                    continue;
                }

                let point_index = if is_support {
                    let idx = next_point as u32;
                    next_point += 1;
                    idx
                } else {
                    let idx = template_points.len() as u32;
                    template_points.push(TemplatePoint::new(i, j, 0, 0, 0));
                    idx
                };

                let id = grid.entries.len();
                grid.entries
                    .push(GridEntry::new(i, j, point_index, column_below, row_left));
                grid.columns[i as usize] = Some(id);
                grid.rows[j as usize] = Some(id);

                if is_anchor {
                    anchors.push((i, j));
                }
            }
        }
        (grid, anchors)
    }

    /// Entry at exactly `(x, y)`, if the grid has one.
    #[must_use]
    pub fn entry_at(&self, x: u32, y: u32) -> Option<EntryId> {
        let mut cursor = self.columns.get(x as usize).copied().flatten();
        while let Some(id) = cursor {
            let entry = &self.entries[id];
            if entry.y == y {
                return Some(id);
            }
            if entry.y < y {
                return None;
            }
            cursor = entry.down;
        }
        None
    }

    /// Drop every level set (after the weight dry-run).
    pub fn clear_grade_lists(&mut self) {
        for entry in &mut self.entries {
            entry.low_simplices.clear();
            entry.high_simplices.clear();
            entry.low_count = 0;
            entry.high_count = 0;
            entry.low_index = 0;
            entry.high_index = 0;
        }
    }

    /// Push a scratch entry (used while counting switches); the caller must
    /// pop it with [`Self::pop_scratch`] before the next lookup.
    pub fn push_scratch(&mut self, x: u32, y: u32) -> EntryId {
        let id = self.entries.len();
        self.entries.push(GridEntry::new(x, y, u32::MAX, None, None));
        id
    }

    pub fn pop_scratch(&mut self, id: EntryId) {
        debug_assert_eq!(id, self.entries.len() - 1);
        self.entries.truncate(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_anchor_is_discovered_and_appended() {
        // support points (0,1) and (1,0); their join (1,1) is a strict anchor
        let mut points = vec![
            TemplatePoint::new(0, 1, 1, 0, 0),
            TemplatePoint::new(1, 0, 1, 0, 0),
        ];
        let (grid, anchors) = TemplatePointsGrid::fill_and_find_anchors(2, 2, &mut points);
        assert_eq!(anchors, vec![(1, 1)]);
        assert_eq!(points.len(), 3);
        assert_eq!(points[2].grade(), bipers_core::Bigrade::new(1, 1));
        assert!(!points[2].is_support());

        let join = grid.entry_at(1, 1).unwrap();
        let entry = &grid.entries[join];
        assert_eq!(grid.entries[entry.down.unwrap()].y, 0);
        assert_eq!(grid.entries[entry.left.unwrap()].x, 0);
    }

    #[test]
    fn colinear_points_have_no_anchors() {
        let mut points = vec![
            TemplatePoint::new(0, 0, 1, 0, 0),
            TemplatePoint::new(1, 0, 1, 0, 0),
            TemplatePoint::new(2, 0, 1, 0, 0),
        ];
        let (_grid, anchors) = TemplatePointsGrid::fill_and_find_anchors(3, 1, &mut points);
        assert!(anchors.is_empty());
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn support_point_above_another_is_a_non_strict_anchor() {
        let mut points = vec![
            TemplatePoint::new(0, 0, 1, 0, 0),
            TemplatePoint::new(0, 1, 0, 1, 0),
        ];
        let (_grid, anchors) = TemplatePointsGrid::fill_and_find_anchors(1, 2, &mut points);
        assert_eq!(anchors, vec![(0, 1)]);
        // the anchor was already a support point, so nothing was appended
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn duplicate_grades_do_not_duplicate_entries() {
        // two template points at the same grade cannot occur, but an anchor
        // coinciding with a support point must reuse the entry
        let mut points = vec![
            TemplatePoint::new(0, 1, 1, 0, 0),
            TemplatePoint::new(1, 0, 1, 0, 0),
            TemplatePoint::new(1, 1, 0, 0, 1),
        ];
        let (grid, anchors) = TemplatePointsGrid::fill_and_find_anchors(2, 2, &mut points);
        assert_eq!(anchors, vec![(1, 1)]);
        assert_eq!(points.len(), 3);
        assert_eq!(grid.entries.len(), 3);
    }
}
