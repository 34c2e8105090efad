// crates/bipers-arrangement/src/builder.rs

//! Bentley–Ottmann construction of the arrangement interior.
//!
//! The sweep runs left to right over the dual strip. Crossings are ordered
//! by a double-precision screen with exact-rational confirmation whenever
//! two candidates land within epsilon; doubles are never trusted for
//! equality on their own. Only currently-adjacent anchor lines ever sit in
//! the queue.

use crate::anchor::Anchor;
use crate::arrangement::Arrangement;
use crate::dcel::{AnchorId, Face, FaceId, HalfEdge, HalfedgeId, Vertex, VertexId};
use bipers_core::{almost_equal, CancelFlag, Error, Exact, Result};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::debug;

/// A pending crossing between two currently-adjacent anchor lines.
///
/// Coordinates are cached at construction, doubles for the screen and exact
/// rationals for the fallback; the position snapshot is the final tiebreak
/// for fully coincident events.
#[derive(Clone, Debug)]
struct Crossing {
    a: AnchorId,
    b: AnchorId,
    x: f64,
    y: f64,
    x_exact: Exact,
    y_exact: Exact,
    a_position: u32,
}

impl Crossing {
    /// Precondition: the anchors are strongly comparable, so their dual
    /// lines have distinct slopes.
    fn new(a: AnchorId, b: AnchorId, arrangement: &Arrangement) -> Self {
        let (aa, ab) = (arrangement.anchor(a), arrangement.anchor(b));
        let x = (arrangement.y_grades[aa.y as usize] - arrangement.y_grades[ab.y as usize])
            / (arrangement.x_grades[aa.x as usize] - arrangement.x_grades[ab.x as usize]);
        let x_exact = (&arrangement.y_exact[aa.y as usize] - &arrangement.y_exact[ab.y as usize])
            / (&arrangement.x_exact[aa.x as usize] - &arrangement.x_exact[ab.x as usize]);
        let y = arrangement.x_grades[aa.x as usize] * x - arrangement.y_grades[aa.y as usize];
        let y_exact =
            &arrangement.x_exact[aa.x as usize] * &x_exact - &arrangement.y_exact[aa.y as usize];
        Self {
            a,
            b,
            x,
            y,
            x_exact,
            y_exact,
            a_position: aa.position,
        }
    }

    /// Exactly the same sweep abscissa as `other`: the doubles must be
    /// within epsilon *and* the exact values equal.
    fn x_equal(&self, other: &Self) -> bool {
        almost_equal(self.x, other.x) && self.x_exact == other.x_exact
    }
}

impl PartialEq for Crossing {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Crossing {}

impl PartialOrd for Crossing {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Crossing {
    fn cmp(&self, other: &Self) -> Ordering {
        // Left to right; for a given abscissa, bottom to top.
        if !almost_equal(self.x, other.x) {
            return self.x.total_cmp(&other.x);
        }
        match self.x_exact.cmp(&other.x_exact) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        if !almost_equal(self.y, other.y) {
            return self.y.total_cmp(&other.y);
        }
        match self.y_exact.cmp(&other.y_exact) {
            Ordering::Equal => self.a_position.cmp(&other.a_position),
            unequal => unequal,
        }
    }
}

fn unordered(a: AnchorId, b: AnchorId) -> (u32, u32) {
    if a.0 <= b.0 {
        (a.0, b.0)
    } else {
        (b.0, a.0)
    }
}

/// Build the arrangement interior.
///
/// Preconditions: the anchors are installed and sorted for the left edge,
/// and the frame exists with its single interior face.
///
/// # Errors
/// [`Error::Invariant`] when an intersection event involves non-consecutive
/// lines, which signals a bug rather than bad data.
pub fn build_interior(arrangement: &mut Arrangement) -> Result<()> {
    build_interior_cancellable(arrangement, &CancelFlag::new())
}

/// As [`build_interior`], polling the flag after every sweep event.
///
/// # Errors
/// Additionally [`bipers_core::Error::Cancelled`] when the flag is raised.
pub fn build_interior_cancellable(
    arrangement: &mut Arrangement,
    cancel: &CancelFlag,
) -> Result<()> {
    let num_anchors = arrangement.anchors.len();
    let mut lines: Vec<HalfedgeId> = Vec::with_capacity(num_anchors);
    let mut crossings: BinaryHeap<Reverse<Crossing>> = BinaryHeap::new();
    let mut considered: HashSet<(u32, u32)> = HashSet::new();

    // PART 1: vertices and edges along the left boundary.
    let mut leftedge = arrangement.bottomleft;
    let mut prev_y = u32::MAX;
    for idx in 0..num_anchors {
        let anchor_id = AnchorId(idx as u32);
        let anchor_y = arrangement.anchors[idx].y;
        if anchor_y != prev_y {
            // Point-line duality sends height y to intercept -y.
            let dual_y = -arrangement.y_grades[anchor_y as usize];
            leftedge = arrangement.insert_vertex(leftedge, 0.0, dual_y)?;
            prev_y = anchor_y;
        }
        let new_edge = arrangement.create_edge_left(leftedge, anchor_id)?;
        lines.push(new_edge);
        let position = (lines.len() - 1) as u32;
        let anchor = arrangement.anchor_mut(anchor_id);
        anchor.position = position;
        anchor.dual_line = Some(new_edge);
    }

    for i in 0..num_anchors.saturating_sub(1) {
        let a = line_anchor(arrangement, lines[i])?;
        let b = line_anchor(arrangement, lines[i + 1])?;
        if arrangement.anchor(a).comparable(arrangement.anchor(b)) {
            crossings.push(Reverse(Crossing::new(a, b, arrangement)));
        }
        considered.insert(unordered(a, b));
    }

    // PART 2: interior intersections, left to right, then bottom to top.
    let mut processed = 0usize;
    while let Some(Reverse(first)) = crossings.pop() {
        let sweep = first;
        let mut cur_b = sweep.b;
        let first_pos = arrangement.anchor(sweep.a).position as usize;
        let mut last_pos = arrangement.anchor(sweep.b).position as usize;
        if last_pos != first_pos + 1 {
            return Err(Error::invariant(
                "builder::build_interior",
                format!(
                    "crossing between non-consecutive lines at u = {}: positions {} and {}",
                    sweep.x, first_pos, last_pos
                ),
            ));
        }

        // Gather every line concurrent through this point.
        while let Some(Reverse(next)) = crossings.peek() {
            if !(sweep.x_equal(next) && next.a == cur_b) {
                break;
            }
            let Some(Reverse(next)) = crossings.pop() else {
                break;
            };
            if arrangement.anchor(next.b).position as usize != last_pos + 1 {
                return Err(Error::invariant(
                    "builder::build_interior",
                    "concurrent crossing between non-consecutive lines",
                ));
            }
            last_pos += 1;
            cur_b = next.b;
        }

        let sweep_anchor = arrangement.anchor(sweep.a);
        let intersect_y = arrangement.x_grades[sweep_anchor.x as usize] * sweep.x
            - arrangement.y_grades[sweep_anchor.y as usize];

        let new_vertex = VertexId(arrangement.vertices.len() as u32);
        arrangement.vertices.push(Vertex::new(sweep.x, intersect_y));

        // Anchor the incoming edges to the vertex, open the outgoing ones,
        // and close one new face per consecutive pair.
        let mut prev_new_edge: Option<HalfedgeId> = None;
        let mut prev_incoming: Option<HalfedgeId> = None;
        let first_incoming = lines[first_pos];
        for cur_pos in first_pos..=last_pos {
            let incoming = lines[cur_pos];
            let incoming_twin = arrangement.he(incoming).twin;
            arrangement.he_mut(incoming_twin).origin = Some(new_vertex);

            let anchor = arrangement.he(incoming).anchor;
            let new_edge = HalfedgeId(arrangement.half_edges.len() as u32);
            let new_twin = HalfedgeId(arrangement.half_edges.len() as u32 + 1);
            arrangement
                .half_edges
                .push(HalfEdge::new(Some(new_vertex), new_twin, anchor));
            arrangement.half_edges.push(HalfEdge::new(None, new_edge, anchor));

            if cur_pos == first_pos {
                let last_twin = arrangement.he(lines[last_pos]).twin;
                arrangement.he_mut(new_twin).next = Some(last_twin);
                arrangement.he_mut(last_twin).prev = Some(new_twin);
                let outer_face = arrangement.he(last_twin).face;
                arrangement.he_mut(new_twin).face = outer_face;
            } else {
                let prev_in = prev_incoming.ok_or_else(|| {
                    Error::invariant("builder::build_interior", "missing previous incoming edge")
                })?;
                let prev_in_twin = arrangement.he(prev_in).twin;
                arrangement.he_mut(incoming).next = Some(prev_in_twin);
                arrangement.he_mut(prev_in_twin).prev = Some(incoming);

                let new_face = FaceId(arrangement.faces.len() as u32);
                arrangement.faces.push(Face::new(new_twin));
                arrangement.he_mut(new_twin).face = Some(new_face);
                let prev_edge = prev_new_edge.ok_or_else(|| {
                    Error::invariant("builder::build_interior", "missing previous outgoing edge")
                })?;
                arrangement.he_mut(prev_edge).face = Some(new_face);
                arrangement.he_mut(new_twin).next = Some(prev_edge);
                arrangement.he_mut(prev_edge).prev = Some(new_twin);
            }

            prev_incoming = Some(incoming);
            prev_new_edge = Some(new_edge);

            if cur_pos == last_pos {
                arrangement.he_mut(new_edge).prev = Some(first_incoming);
                arrangement.he_mut(first_incoming).next = Some(new_edge);
                let upper_face = arrangement.he(first_incoming).face;
                arrangement.he_mut(new_edge).face = upper_face;
            }

            lines[cur_pos] = new_edge;
            if let Some(anchor) = anchor {
                arrangement.anchor_mut(anchor).position =
                    (last_pos - (cur_pos - first_pos)) as u32;
            }
        }
        arrangement.vertices[new_vertex.index()].incident_edge = Some(lines[first_pos]);

        lines[first_pos..=last_pos].reverse();

        // New adjacencies below and above the reversed block.
        if first_pos > 0 {
            enqueue_if_new(
                arrangement,
                &mut crossings,
                &mut considered,
                lines[first_pos - 1],
                lines[first_pos],
            )?;
        }
        if last_pos + 1 < lines.len() {
            enqueue_if_new(
                arrangement,
                &mut crossings,
                &mut considered,
                lines[last_pos],
                lines[last_pos + 1],
            )?;
        }

        processed += 1;
        cancel.check()?;
    }
    debug!(crossings = processed, "sweep complete");

    // PART 3: join every line to the right boundary, tying equal slopes to a
    // shared vertex.
    let mut rightedge = arrangement.bottomright;
    let mut cur_x = 0u32;
    for (cur_pos, &incoming) in lines.iter().enumerate() {
        let anchor_id = line_anchor(arrangement, incoming)?;
        let anchor_x = arrangement.anchor(anchor_id).x;

        if anchor_x > cur_x || cur_pos == 0 {
            cur_x = anchor_x;
            let slope = arrangement.x_grades[cur_x as usize];
            let y = if slope < 0.0 {
                f64::NEG_INFINITY
            } else if slope == 0.0 {
                0.0
            } else {
                f64::INFINITY
            };
            rightedge = arrangement.insert_vertex(rightedge, f64::INFINITY, y)?;
        } else {
            // Same slope as the previous line: it supersedes the earlier
            // entry for vertical-line queries.
            arrangement.vertical_line_query_list.pop();
        }
        let incoming_twin = arrangement.he(incoming).twin;
        arrangement.vertical_line_query_list.push(incoming_twin);

        let cur_vertex = arrangement.he(rightedge).origin;
        arrangement.he_mut(incoming_twin).origin = cur_vertex;

        let rightedge_twin = arrangement.he(rightedge).twin;
        let after = arrangement.next_of(rightedge_twin)?;
        arrangement.he_mut(incoming).next = Some(after);
        arrangement.he_mut(after).prev = Some(incoming);
        let incoming_face = arrangement.he(incoming).face;
        arrangement.he_mut(after).face = incoming_face;

        arrangement.he_mut(incoming_twin).prev = Some(rightedge_twin);
        arrangement.he_mut(rightedge_twin).next = Some(incoming_twin);
        let outer_face = arrangement.he(incoming_twin).face;
        arrangement.he_mut(rightedge_twin).face = outer_face;
    }

    Ok(())
}

fn line_anchor(arrangement: &Arrangement, edge: HalfedgeId) -> Result<AnchorId> {
    arrangement
        .he(edge)
        .anchor
        .ok_or_else(|| Error::invariant("builder::build_interior", "line edge without anchor"))
}

fn enqueue_if_new(
    arrangement: &Arrangement,
    crossings: &mut BinaryHeap<Reverse<Crossing>>,
    considered: &mut HashSet<(u32, u32)>,
    lower: HalfedgeId,
    upper: HalfedgeId,
) -> Result<()> {
    let a = line_anchor(arrangement, lower)?;
    let b = line_anchor(arrangement, upper)?;
    if considered.insert(unordered(a, b))
        && arrangement.anchor(a).comparable(arrangement.anchor(b))
    {
        crossings.push(Reverse(Crossing::new(a, b, arrangement)));
    }
    Ok(())
}

/// Convenience: install anchors from bigrades, build, and validate.
///
/// # Errors
/// Propagates construction and validation failures.
pub fn build_arrangement(
    x_exact: Vec<Exact>,
    y_exact: Vec<Exact>,
    anchor_grades: &[(u32, u32)],
) -> Result<Arrangement> {
    let mut arrangement = Arrangement::with_frame(x_exact, y_exact);
    let anchors = anchor_grades
        .iter()
        .map(|&(x, y)| Anchor::new(x, y))
        .collect();
    arrangement.set_anchors(anchors);
    build_interior(&mut arrangement)?;
    arrangement.validate()?;
    Ok(arrangement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bipers_core::Exact;
    use num_bigint::BigInt;

    fn rat(n: i64) -> Exact {
        Exact::from_integer(BigInt::from(n))
    }

    fn grades(values: &[i64]) -> Vec<Exact> {
        values.iter().map(|&v| rat(v)).collect()
    }

    #[test]
    fn no_anchors_leaves_single_face() {
        let arrangement = build_arrangement(grades(&[0, 1]), grades(&[0, 1]), &[]).unwrap();
        assert_eq!(arrangement.num_faces(), 1);
        assert_eq!(arrangement.vertices.len(), 4);
    }

    #[test]
    fn single_anchor_splits_strip_in_two() {
        let arrangement =
            build_arrangement(grades(&[0, 1]), grades(&[0, 1]), &[(1, 1)]).unwrap();
        assert_eq!(arrangement.num_faces(), 2);
        // left vertex, right vertex added to the frame's four
        assert_eq!(arrangement.vertices.len(), 6);
        assert_eq!(arrangement.vertical_line_query_list.len(), 1);
    }

    #[test]
    fn two_crossing_lines_make_four_faces() {
        // anchors (1,1) and (2,2): dual lines v = u - 1 and v = 2u - 2,
        // crossing at u = 1 inside the strip
        let arrangement = build_arrangement(
            grades(&[0, 1, 2]),
            grades(&[0, 1, 2]),
            &[(1, 1), (2, 2)],
        )
        .unwrap();
        assert_eq!(arrangement.num_faces(), 4);
        // frame corners + two left + one crossing + two right
        assert_eq!(arrangement.vertices.len(), 9);
    }

    #[test]
    fn parallel_lines_never_cross() {
        // same slope (x = 1), different intercepts: three faces stacked
        let arrangement =
            build_arrangement(grades(&[0, 1]), grades(&[0, 1]), &[(1, 0), (1, 1)]).unwrap();
        assert_eq!(arrangement.num_faces(), 3);
        // the two lines share their right-boundary vertex
        assert_eq!(arrangement.vertical_line_query_list.len(), 1);
    }

    #[test]
    fn three_concurrent_lines_coalesce_one_vertex() {
        // anchors (0,0), (1,1), (2,2): dual lines v = 0, u - 1, 2u - 2, all
        // concurrent at (1, 0)
        let arrangement = build_arrangement(
            grades(&[0, 1, 2]),
            grades(&[0, 1, 2]),
            &[(0, 0), (1, 1), (2, 2)],
        )
        .unwrap();
        // one interior vertex shared by all three lines
        let interior = arrangement
            .vertices
            .iter()
            .filter(|v| v.x.is_finite() && v.x > 0.0)
            .count();
        assert_eq!(interior, 1);
        // 1 frame face + 3 left-edge faces + 2 from the concurrent event
        assert_eq!(arrangement.num_faces(), 6);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any anchor set yields a planar subdivision: validation holds
            /// and Euler's formula is satisfied (counting the outer face).
            #[test]
            fn random_arrangements_are_planar(
                raw in proptest::collection::vec((0u32..4, 0u32..4), 0..7)
            ) {
                let mut anchors = raw;
                anchors.sort_unstable();
                anchors.dedup();
                let arrangement = build_arrangement(
                    grades(&[0, 1, 2, 3]),
                    grades(&[0, 1, 2, 3]),
                    &anchors,
                )
                .unwrap();

                let v = arrangement.vertices.len() as i64;
                let e = (arrangement.half_edges.len() / 2) as i64;
                let f = i64::from(arrangement.num_faces()) + 1;
                prop_assert_eq!(v - e + f, 2, "Euler formula");
                prop_assert!(arrangement.num_faces() as usize >= anchors.len() + 1);
            }
        }
    }

    #[test]
    fn point_location_agrees_with_geometry() {
        let arrangement = build_arrangement(
            grades(&[0, 1, 2]),
            grades(&[0, 1, 2]),
            &[(1, 1), (2, 2)],
        )
        .unwrap();
        // The lines cross at (1, 0); probe cells on both sides of it along
        // the horizontal line v = -0.5.
        let left = arrangement.find_point(0.2, -0.5).unwrap();
        let right = arrangement.find_point(5.0, -0.5).unwrap();
        assert_ne!(left, right);
        // The same machinery through the public query surface.
        arrangement.face_for_query(45.0, 0.35).unwrap();
    }
}
