// crates/bipers-arrangement/src/arrangement.rs

//! The arrangement proper: arenas, the bounding frame, edge insertion
//! primitives for the sweep, point location, and a consistency validator.

use crate::anchor::{left_order, Anchor};
use crate::barcode::BarcodeTemplate;
use crate::dcel::{AnchorId, Face, FaceId, HalfEdge, HalfedgeId, Vertex, VertexId};
use bipers_core::{exact_to_f64, Error, Exact, Result};
use tracing::trace;

/// The planar subdivision of the `(u, v)` strip dual to the template points.
#[derive(Clone, Debug)]
pub struct Arrangement {
    pub x_exact: Vec<Exact>,
    pub y_exact: Vec<Exact>,
    pub x_grades: Vec<f64>,
    pub y_grades: Vec<f64>,

    pub vertices: Vec<Vertex>,
    pub half_edges: Vec<HalfEdge>,
    pub faces: Vec<Face>,
    /// Anchor arena, sorted bottom-to-top along the left boundary.
    pub anchors: Vec<Anchor>,

    /// Frame half-edges: down from `(0, ∞)`, down from `(∞, ∞)` inside,
    /// up from `(0, -∞)` and up from `(∞, -∞)`.
    pub topleft: HalfedgeId,
    pub topright: HalfedgeId,
    pub bottomleft: HalfedgeId,
    pub bottomright: HalfedgeId,

    /// Topmost half-edge per distinct slope, for vertical-line queries.
    pub vertical_line_query_list: Vec<HalfedgeId>,
}

impl Arrangement {
    /// Bounding frame with a single interior face and no anchors.
    #[must_use]
    pub fn with_frame(x_exact: Vec<Exact>, y_exact: Vec<Exact>) -> Self {
        let x_grades = x_exact.iter().map(exact_to_f64).collect();
        let y_grades = y_exact.iter().map(exact_to_f64).collect();

        let corners = [
            (0.0, f64::INFINITY),
            (f64::INFINITY, f64::INFINITY),
            (f64::INFINITY, f64::NEG_INFINITY),
            (0.0, f64::NEG_INFINITY),
        ];
        let mut vertices: Vec<Vertex> = corners.iter().map(|&(x, y)| Vertex::new(x, y)).collect();

        let mut half_edges = Vec::with_capacity(8);
        for i in 0u32..4 {
            // inside edge 2i from corner i, outside edge 2i+1 from corner i+1
            half_edges.push(HalfEdge::new(
                Some(VertexId(i)),
                HalfedgeId(2 * i + 1),
                None,
            ));
            half_edges.push(HalfEdge::new(
                Some(VertexId((i + 1) % 4)),
                HalfedgeId(2 * i),
                None,
            ));
        }
        for i in 0u32..4 {
            vertices[i as usize].incident_edge = Some(HalfedgeId(2 * i));
        }
        let face = Face::new(HalfedgeId(0));
        for i in 0u32..4 {
            let inside = (2 * i) as usize;
            half_edges[inside].next = Some(HalfedgeId((2 * i + 2) % 8));
            half_edges[inside].prev = Some(HalfedgeId((2 * i + 6) % 8));
            half_edges[inside].face = Some(FaceId(0));

            let outside = (2 * i + 1) as usize;
            half_edges[outside].next = Some(HalfedgeId((2 * i + 7) % 8));
            half_edges[outside].prev = Some(HalfedgeId((2 * i + 3) % 8));
        }

        Self {
            x_exact,
            y_exact,
            x_grades,
            y_grades,
            vertices,
            half_edges,
            faces: vec![face],
            anchors: Vec::new(),
            topleft: HalfedgeId(7),
            topright: HalfedgeId(2),
            bottomleft: HalfedgeId(6),
            bottomright: HalfedgeId(3),
            vertical_line_query_list: Vec::new(),
        }
    }

    /// Install the anchor set, sorting it bottom-to-top along the left edge.
    pub fn set_anchors(&mut self, mut anchors: Vec<Anchor>) {
        anchors.sort_by(|a, b| left_order((a.x, a.y), (b.x, b.y)));
        self.anchors = anchors;
    }

    // ---- arena access ----

    #[inline]
    #[must_use]
    pub fn he(&self, id: HalfedgeId) -> &HalfEdge {
        &self.half_edges[id.index()]
    }

    #[inline]
    pub fn he_mut(&mut self, id: HalfedgeId) -> &mut HalfEdge {
        &mut self.half_edges[id.index()]
    }

    #[inline]
    #[must_use]
    pub fn anchor(&self, id: AnchorId) -> &Anchor {
        &self.anchors[id.index()]
    }

    #[inline]
    pub fn anchor_mut(&mut self, id: AnchorId) -> &mut Anchor {
        &mut self.anchors[id.index()]
    }

    /// `next` link, as an invariant-checked lookup.
    ///
    /// # Errors
    /// [`Error::Invariant`] on a missing link.
    pub fn next_of(&self, id: HalfedgeId) -> Result<HalfedgeId> {
        self.he(id)
            .next
            .ok_or_else(|| Error::invariant("arrangement", format!("half-edge {id:?} has no next")))
    }

    /// `prev` link, as an invariant-checked lookup.
    ///
    /// # Errors
    /// [`Error::Invariant`] on a missing link.
    pub fn prev_of(&self, id: HalfedgeId) -> Result<HalfedgeId> {
        self.he(id)
            .prev
            .ok_or_else(|| Error::invariant("arrangement", format!("half-edge {id:?} has no prev")))
    }

    #[must_use]
    pub fn num_faces(&self) -> u32 {
        self.faces.len() as u32
    }

    /// Barcode template stored in face `i`.
    #[must_use]
    pub fn barcode(&self, face: FaceId) -> &BarcodeTemplate {
        &self.faces[face.index()].barcode
    }

    pub fn set_barcode(&mut self, face: FaceId, template: BarcodeTemplate) {
        self.faces[face.index()].barcode = template;
    }

    // ---- construction primitives ----

    /// Insert a new vertex in the middle of `edge`, splitting it. Returns
    /// the new half-edge that starts at the new vertex and continues around
    /// the same face.
    ///
    /// # Errors
    /// [`Error::Invariant`] if the surrounding links are missing.
    pub fn insert_vertex(&mut self, edge: HalfedgeId, x: f64, y: f64) -> Result<HalfedgeId> {
        let vertex = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex::new(x, y));

        let twin = self.he(edge).twin;
        let anchor = self.he(edge).anchor;

        let up = HalfedgeId(self.half_edges.len() as u32);
        let dn = HalfedgeId(self.half_edges.len() as u32 + 1);
        self.half_edges.push(HalfEdge::new(Some(vertex), twin, anchor));
        self.half_edges.push(HalfEdge::new(Some(vertex), edge, anchor));

        let edge_next = self.next_of(edge)?;
        let edge_face = self.he(edge).face;
        self.he_mut(up).next = Some(edge_next);
        self.he_mut(up).prev = Some(edge);
        self.he_mut(up).face = edge_face;
        self.he_mut(edge_next).prev = Some(up);
        self.he_mut(edge).next = Some(up);
        self.he_mut(edge).twin = dn;

        let twin_next = self.next_of(twin)?;
        let twin_face = self.he(twin).face;
        self.he_mut(dn).next = Some(twin_next);
        self.he_mut(dn).prev = Some(twin);
        self.he_mut(dn).face = twin_face;
        self.he_mut(twin_next).prev = Some(dn);
        self.he_mut(twin).next = Some(dn);
        self.he_mut(twin).twin = up;

        self.vertices[vertex.index()].incident_edge = Some(up);
        Ok(up)
    }

    /// Create the first half-edge pair of an anchor line, rooted at the
    /// origin of `edge` on the left boundary, together with the face below
    /// the new edge. Leaves `new_edge.next` and `new_twin.prev` unset for
    /// the sweep to connect.
    ///
    /// # Errors
    /// [`Error::Invariant`] if the surrounding links are missing.
    pub fn create_edge_left(&mut self, edge: HalfedgeId, anchor: AnchorId) -> Result<HalfedgeId> {
        let new_edge = HalfedgeId(self.half_edges.len() as u32);
        let new_twin = HalfedgeId(self.half_edges.len() as u32 + 1);
        let origin = self.he(edge).origin;
        self.half_edges
            .push(HalfEdge::new(origin, new_twin, Some(anchor)));
        self.half_edges
            .push(HalfEdge::new(None, new_edge, Some(anchor)));

        let new_face = FaceId(self.faces.len() as u32);
        self.faces.push(Face::new(new_edge));

        let edge_prev = self.prev_of(edge)?;
        self.he_mut(new_edge).prev = Some(edge_prev);
        self.he_mut(new_edge).face = Some(new_face);

        self.he_mut(edge_prev).next = Some(new_edge);
        self.he_mut(edge_prev).face = Some(new_face);
        if let Some(prev_prev) = self.he(edge_prev).prev {
            self.he_mut(prev_prev).face = Some(new_face);
        }

        let edge_face = self.he(edge).face;
        self.he_mut(new_twin).next = Some(edge);
        self.he_mut(new_twin).face = edge_face;
        self.he_mut(edge).prev = Some(new_twin);

        Ok(new_edge)
    }

    // ---- point location ----

    /// First anchor whose line meets the left boundary at or above the given
    /// height (in grade coordinates, not dual ones).
    #[must_use]
    pub fn find_least_upper_anchor(&self, y_coord: f64) -> Option<AnchorId> {
        if self.y_grades.is_empty() || self.y_grades[0] > y_coord {
            return None;
        }
        // Greatest y-grade not above y_coord.
        let best = match self
            .y_grades
            .partition_point(|g| *g <= y_coord)
            .checked_sub(1)
        {
            Some(idx) => idx as u32,
            None => return None,
        };
        // First anchor not strictly before the probe (0, best) in left order.
        let idx = self
            .anchors
            .partition_point(|a| left_order((a.x, a.y), (0, best)).is_lt());
        (idx < self.anchors.len()).then(|| AnchorId(idx as u32))
    }

    /// Unbounded cell dual to the vertical line with the given x-coordinate.
    #[must_use]
    pub fn find_vertical_line(&self, x_coord: f64) -> FaceId {
        let in_range = self.vertical_line_query_list.first().is_some_and(|&he| {
            self.he(he)
                .anchor
                .map(|a| self.x_grades[self.anchor(a).x as usize] <= x_coord)
                .unwrap_or(false)
        });
        if in_range {
            let idx = self
                .vertical_line_query_list
                .partition_point(|&he| {
                    self.he(he)
                        .anchor
                        .map(|a| self.x_grades[self.anchor(a).x as usize] <= x_coord)
                        .unwrap_or(false)
                })
                .saturating_sub(1);
            if let Some(face) = self.he(self.vertical_line_query_list[idx]).face {
                return face;
            }
        }
        // No anchor line lies left of the query: the cell above the bottom
        // frame edge answers.
        self.he(self.he(self.bottomright).twin)
            .face
            .unwrap_or(FaceId(0))
    }

    /// Walk from the left boundary to the cell containing the dual point.
    ///
    /// # Errors
    /// [`Error::Query`] if no face is found (which indicates corruption) or
    /// [`Error::Invariant`] on broken links.
    pub fn find_point(&self, x_coord: f64, y_coord: f64) -> Result<FaceId> {
        let start = self.find_least_upper_anchor(-y_coord);

        let mut finger = match start {
            None => {
                // Top unbounded cell: enter along the top edge at y = ∞.
                self.next_of(self.he(self.topleft).twin)?
            }
            Some(anchor) => self.anchors[anchor.index()].dual_line.ok_or_else(|| {
                Error::invariant("arrangement::find_point", "anchor without dual line")
            })?,
        };

        let mut steps = 0usize;
        let limit = 4 * self.half_edges.len() + 8;
        loop {
            steps += 1;
            if steps > limit {
                return Err(Error::Query(format!(
                    "no face found for dual point ({x_coord}, {y_coord})"
                )));
            }

            // Find the edge of the current cell crossing the horizontal line.
            let mut next_pt = self.he(self.next_of(finger)?).origin.ok_or_else(|| {
                Error::invariant("arrangement::find_point", "half-edge without origin")
            })?;
            while self.vertices[next_pt.index()].y > y_coord {
                finger = self.next_of(finger)?;
                next_pt = self.he(self.next_of(finger)?).origin.ok_or_else(|| {
                    Error::invariant("arrangement::find_point", "half-edge without origin")
                })?;
                steps += 1;
                if steps > limit {
                    return Err(Error::Query(format!(
                        "no face found for dual point ({x_coord}, {y_coord})"
                    )));
                }
            }

            let vertex = &self.vertices[next_pt.index()];
            if vertex.y == y_coord {
                // The boundary touches the query line at a vertex.
                if vertex.x >= x_coord {
                    return self.he(finger).face.ok_or_else(|| {
                        Error::Query("query landed on the outer face".into())
                    });
                }
                // Move halfway around the vertex to the adjacent cell.
                let mut thumb = self.next_of(finger)?;
                let mut degree = 1usize;
                while thumb != self.he(finger).twin {
                    thumb = self.next_of(self.he(thumb).twin)?;
                    degree += 1;
                }
                finger = self.next_of(finger)?;
                for _ in 0..degree / 2 {
                    finger = self.next_of(self.he(finger).twin)?;
                }
            } else {
                // The boundary crosses below the query line along `finger`.
                match self.he(finger).anchor {
                    None => {
                        // Vertical frame edge: we are in the cell.
                        return self.he(finger).face.ok_or_else(|| {
                            Error::Query("query landed on the outer face".into())
                        });
                    }
                    Some(anchor_id) => {
                        let anchor = self.anchor(anchor_id);
                        // Horizontal query rays never cross horizontal dual
                        // lines, so the slope here is nonzero.
                        let x_pos = (y_coord + self.y_grades[anchor.y as usize])
                            / self.x_grades[anchor.x as usize];
                        if x_pos >= x_coord {
                            return self.he(finger).face.ok_or_else(|| {
                                Error::Query("query landed on the outer face".into())
                            });
                        }
                        trace!(?anchor_id, x_pos, "crossing dual line");
                        finger = self.he(finger).twin;
                    }
                }
            }
        }
    }

    /// Locate the face answering a `(degrees, offset)` query.
    ///
    /// # Errors
    /// [`Error::Query`] for an angle outside `[0, 90]` or a failed walk.
    pub fn face_for_query(&self, degrees: f64, offset: f64) -> Result<FaceId> {
        if !(0.0..=90.0).contains(&degrees) {
            return Err(Error::Query(format!("angle {degrees} outside [0, 90]")));
        }
        if degrees == 90.0 {
            return Ok(self.find_vertical_line(-offset));
        }
        if degrees == 0.0 {
            return Ok(match self.find_least_upper_anchor(offset) {
                Some(anchor) => {
                    let line = self.anchors[anchor.index()].dual_line.ok_or_else(|| {
                        Error::invariant("arrangement::face_for_query", "anchor without dual line")
                    })?;
                    self.he(line)
                        .face
                        .ok_or_else(|| Error::Query("horizontal query hit the outer face".into()))?
                }
                None => self
                    .he(self.he(self.topleft).twin)
                    .face
                    .ok_or_else(|| Error::Query("top cell missing".into()))?,
            });
        }
        let radians = degrees.to_radians();
        let slope = radians.tan();
        let intercept = offset / radians.cos();
        self.find_point(slope, -intercept)
    }

    // ---- validation ----

    /// Structural consistency: face cycles close and agree on ownership,
    /// every half-edge is covered, and every anchor owns an unbroken chain
    /// to the right boundary.
    ///
    /// # Errors
    /// [`Error::Invariant`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let limit = self.half_edges.len() + 1;
        let mut covered = vec![false; self.half_edges.len()];

        for (idx, face) in self.faces.iter().enumerate() {
            let start = face.boundary.ok_or_else(|| {
                Error::invariant("arrangement::validate", format!("face {idx} has no boundary"))
            })?;
            let mut current = start;
            for step in 0..=limit {
                if self.he(current).face != Some(FaceId(idx as u32)) {
                    return Err(Error::invariant(
                        "arrangement::validate",
                        format!("half-edge {current:?} does not own face {idx}"),
                    ));
                }
                covered[current.index()] = true;
                current = self.next_of(current)?;
                if current == start {
                    break;
                }
                if step == limit {
                    return Err(Error::invariant(
                        "arrangement::validate",
                        format!("boundary of face {idx} does not close"),
                    ));
                }
            }
        }

        // The outer cycle is not owned by any face.
        let mut current = HalfedgeId(1);
        for _ in 0..=limit {
            covered[current.index()] = true;
            current = self.next_of(current)?;
            if current == HalfedgeId(1) {
                break;
            }
        }
        if let Some(missing) = covered.iter().position(|&c| !c) {
            return Err(Error::invariant(
                "arrangement::validate",
                format!("half-edge {missing} not reached from any face"),
            ));
        }

        // Anchor chains: follow each dual line to the right boundary.
        for (idx, anchor) in self.anchors.iter().enumerate() {
            let Some(start) = anchor.dual_line else {
                return Err(Error::invariant(
                    "arrangement::validate",
                    format!("anchor {idx} has no dual line"),
                ));
            };
            let mut edge = start;
            for step in 0..=limit {
                if self.he(edge).anchor != Some(AnchorId(idx as u32)) {
                    return Err(Error::invariant(
                        "arrangement::validate",
                        format!("half-edge {edge:?} left the line of anchor {idx}"),
                    ));
                }
                let origin = self.he(edge).origin.ok_or_else(|| {
                    Error::invariant("arrangement::validate", "line edge without origin")
                })?;
                if self.vertices[origin.index()].x.is_infinite() && step > 0 {
                    break;
                }
                // Advance to the next edge along the same line.
                edge = self.next_of(edge)?;
                let mut guard = 0;
                while self.he(edge).anchor != Some(AnchorId(idx as u32)) {
                    edge = self.next_of(self.he(edge).twin)?;
                    guard += 1;
                    if guard > limit {
                        return Err(Error::invariant(
                            "arrangement::validate",
                            format!("lost the line of anchor {idx}"),
                        ));
                    }
                }
                if step == limit {
                    return Err(Error::invariant(
                        "arrangement::validate",
                        format!("line of anchor {idx} does not terminate"),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_consistent() {
        let arrangement = Arrangement::with_frame(vec![], vec![]);
        assert_eq!(arrangement.vertices.len(), 4);
        assert_eq!(arrangement.half_edges.len(), 8);
        assert_eq!(arrangement.num_faces(), 1);
        arrangement.validate().unwrap();
    }

    #[test]
    fn frame_cycles_close() {
        let arrangement = Arrangement::with_frame(vec![], vec![]);
        // Inside cycle: 0 → 2 → 4 → 6 → 0.
        let mut edge = HalfedgeId(0);
        for _ in 0..4 {
            edge = arrangement.next_of(edge).unwrap();
        }
        assert_eq!(edge, HalfedgeId(0));
        // Twins are mutual.
        for i in 0..8 {
            let id = HalfedgeId(i);
            assert_eq!(arrangement.he(arrangement.he(id).twin).twin, id);
        }
    }

    #[test]
    fn insert_vertex_splits_an_edge() {
        let mut arrangement = Arrangement::with_frame(vec![], vec![]);
        let up = arrangement
            .insert_vertex(arrangement.bottomleft, 0.0, -1.0)
            .unwrap();
        assert_eq!(arrangement.vertices.len(), 5);
        assert_eq!(arrangement.half_edges.len(), 10);
        arrangement.validate().unwrap();
        // The new edge continues around the original face.
        assert_eq!(
            arrangement.he(up).face,
            arrangement.he(arrangement.bottomleft).face
        );
    }

    #[test]
    fn empty_arrangement_vertical_query_hits_single_face() {
        let arrangement = Arrangement::with_frame(vec![], vec![]);
        assert_eq!(arrangement.find_vertical_line(0.5), FaceId(0));
    }
}
