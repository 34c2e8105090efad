// crates/bipers-engine/src/messages.rs

//! Serialisable snapshots of a computation.
//!
//! All cross-references are integer ids into the arena vectors; `-1` marks
//! an absent link. Exact rationals travel as lossless fraction strings.

use bipers_arrangement::{
    Anchor, AnchorId, Arrangement, BarcodeTemplate, Face, FaceId, HalfEdge, HalfedgeId, Vertex,
    VertexId,
};
use bipers_core::{
    exact_to_f64, exact_vec_serde, Error, Exact, Result, TemplatePoint, UnsignedMatrix,
};
use serde::{Deserialize, Serialize};

/// Invalid id on the wire.
pub const INVALID_ID: i64 = -1;

fn id_to_wire(id: Option<u32>) -> i64 {
    id.map_or(INVALID_ID, i64::from)
}

fn id_from_wire(value: i64, arena: usize, what: &str) -> Result<Option<u32>> {
    if value == INVALID_ID {
        return Ok(None);
    }
    if value < 0 || value as usize >= arena {
        return Err(Error::Format(format!(
            "{what} id {value} outside arena of size {arena}"
        )));
    }
    Ok(Some(value as u32))
}

/// The template points with everything needed to interpret them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplatePointsMessage {
    pub x_label: String,
    pub y_label: String,
    pub template_points: Vec<TemplatePoint>,
    pub homology_dimensions: UnsignedMatrix,
    #[serde(with = "exact_vec_serde")]
    pub xs_exact: Vec<Exact>,
    #[serde(with = "exact_vec_serde")]
    pub ys_exact: Vec<Exact>,
    pub x_reverse: bool,
    pub y_reverse: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VertexMessage {
    pub incident_edge: i64,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HalfedgeMessage {
    pub origin: i64,
    pub twin: i64,
    pub next: i64,
    pub prev: i64,
    pub face: i64,
    pub anchor: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorMessage {
    pub x: u32,
    pub y: u32,
    pub dual_line: i64,
    pub position: u32,
    pub above_line: bool,
    pub weight: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaceMessage {
    pub boundary: i64,
    pub bars: Vec<(u32, u32, u32)>,
}

/// The whole DCEL, flattened.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ArrangementMessage {
    pub x_grades: Vec<f64>,
    pub y_grades: Vec<f64>,
    #[serde(with = "exact_vec_serde")]
    pub x_exact: Vec<Exact>,
    #[serde(with = "exact_vec_serde")]
    pub y_exact: Vec<Exact>,
    pub half_edges: Vec<HalfedgeMessage>,
    pub vertices: Vec<VertexMessage>,
    pub anchors: Vec<AnchorMessage>,
    pub faces: Vec<FaceMessage>,
    pub topleft: i64,
    pub topright: i64,
    pub bottomleft: i64,
    pub bottomright: i64,
    pub vertical_line_query_list: Vec<i64>,
}

impl ArrangementMessage {
    /// Flatten a live arrangement.
    #[must_use]
    pub fn from_arrangement(arrangement: &Arrangement) -> Self {
        Self {
            x_grades: arrangement.x_grades.clone(),
            y_grades: arrangement.y_grades.clone(),
            x_exact: arrangement.x_exact.clone(),
            y_exact: arrangement.y_exact.clone(),
            half_edges: arrangement
                .half_edges
                .iter()
                .map(|he| HalfedgeMessage {
                    origin: id_to_wire(he.origin.map(|v| v.0)),
                    twin: i64::from(he.twin.0),
                    next: id_to_wire(he.next.map(|e| e.0)),
                    prev: id_to_wire(he.prev.map(|e| e.0)),
                    face: id_to_wire(he.face.map(|f| f.0)),
                    anchor: id_to_wire(he.anchor.map(|a| a.0)),
                })
                .collect(),
            vertices: arrangement
                .vertices
                .iter()
                .map(|v| VertexMessage {
                    incident_edge: id_to_wire(v.incident_edge.map(|e| e.0)),
                    x: v.x,
                    y: v.y,
                })
                .collect(),
            anchors: arrangement
                .anchors
                .iter()
                .map(|a| AnchorMessage {
                    x: a.x,
                    y: a.y,
                    dual_line: id_to_wire(a.dual_line.map(|e| e.0)),
                    position: a.position,
                    above_line: a.above_line,
                    weight: a.weight,
                })
                .collect(),
            faces: arrangement
                .faces
                .iter()
                .map(|f| FaceMessage {
                    boundary: id_to_wire(f.boundary.map(|e| e.0)),
                    bars: f.barcode.iter().collect(),
                })
                .collect(),
            topleft: i64::from(arrangement.topleft.0),
            topright: i64::from(arrangement.topright.0),
            bottomleft: i64::from(arrangement.bottomleft.0),
            bottomright: i64::from(arrangement.bottomright.0),
            vertical_line_query_list: arrangement
                .vertical_line_query_list
                .iter()
                .map(|e| i64::from(e.0))
                .collect(),
        }
    }

    /// Rebuild the arena representation, validating every id.
    ///
    /// # Errors
    /// [`Error::Format`] on dangling ids or a malformed bounding frame.
    pub fn to_arrangement(&self) -> Result<Arrangement> {
        let n_he = self.half_edges.len();
        let n_v = self.vertices.len();
        let n_f = self.faces.len();
        let n_a = self.anchors.len();

        if n_v < 4 {
            return Err(Error::Format(
                "arrangement needs at least the four corner vertices".into(),
            ));
        }
        for (idx, expected) in [
            (0usize, (0.0, f64::INFINITY)),
            (1, (f64::INFINITY, f64::INFINITY)),
            (2, (f64::INFINITY, f64::NEG_INFINITY)),
            (3, (0.0, f64::NEG_INFINITY)),
        ] {
            let v = &self.vertices[idx];
            if (v.x, v.y) != expected {
                return Err(Error::Format(format!(
                    "vertex {idx} is not the expected frame corner"
                )));
            }
        }

        let mut half_edges = Vec::with_capacity(n_he);
        for he in &self.half_edges {
            let twin = id_from_wire(he.twin, n_he, "twin")?
                .ok_or_else(|| Error::Format("half-edge without twin".into()))?;
            half_edges.push(HalfEdge {
                origin: id_from_wire(he.origin, n_v, "origin")?.map(VertexId),
                twin: HalfedgeId(twin),
                next: id_from_wire(he.next, n_he, "next")?.map(HalfedgeId),
                prev: id_from_wire(he.prev, n_he, "prev")?.map(HalfedgeId),
                face: id_from_wire(he.face, n_f, "face")?.map(FaceId),
                anchor: id_from_wire(he.anchor, n_a, "anchor")?.map(AnchorId),
            });
        }

        let mut vertices = Vec::with_capacity(n_v);
        for v in &self.vertices {
            let mut vertex = Vertex::new(v.x, v.y);
            vertex.incident_edge = id_from_wire(v.incident_edge, n_he, "incident edge")?
                .map(HalfedgeId);
            vertices.push(vertex);
        }

        let mut anchors = Vec::with_capacity(n_a);
        for a in &self.anchors {
            let mut anchor = Anchor::new(a.x, a.y);
            anchor.dual_line = id_from_wire(a.dual_line, n_he, "dual line")?.map(HalfedgeId);
            anchor.position = a.position;
            anchor.above_line = a.above_line;
            anchor.weight = a.weight;
            anchors.push(anchor);
        }

        let mut faces = Vec::with_capacity(n_f);
        for f in &self.faces {
            let boundary = id_from_wire(f.boundary, n_he, "boundary")?
                .ok_or_else(|| Error::Format("face without boundary edge".into()))?;
            let mut face = Face::new(HalfedgeId(boundary));
            face.barcode = BarcodeTemplate::from_triples(&f.bars);
            face.visited = true;
            faces.push(face);
        }

        let frame_edge = |value: i64, what: &str| -> Result<HalfedgeId> {
            id_from_wire(value, n_he, what)?
                .map(HalfedgeId)
                .ok_or_else(|| Error::Format(format!("missing frame edge: {what}")))
        };

        let mut query_list = Vec::with_capacity(self.vertical_line_query_list.len());
        for &value in &self.vertical_line_query_list {
            let id = id_from_wire(value, n_he, "vertical query edge")?
                .ok_or_else(|| Error::Format("invalid vertical query edge".into()))?;
            query_list.push(HalfedgeId(id));
        }

        Ok(Arrangement {
            x_exact: self.x_exact.clone(),
            y_exact: self.y_exact.clone(),
            x_grades: if self.x_grades.is_empty() {
                self.x_exact.iter().map(exact_to_f64).collect()
            } else {
                self.x_grades.clone()
            },
            y_grades: if self.y_grades.is_empty() {
                self.y_exact.iter().map(exact_to_f64).collect()
            } else {
                self.y_grades.clone()
            },
            vertices,
            half_edges,
            faces,
            anchors,
            topleft: frame_edge(self.topleft, "topleft")?,
            topright: frame_edge(self.topright, "topright")?,
            bottomleft: frame_edge(self.bottomleft, "bottomleft")?,
            bottomright: frame_edge(self.bottomright, "bottomright")?,
            vertical_line_query_list: query_list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bipers_arrangement::build_arrangement;
    use bipers_core::exact_int;

    fn sample_arrangement() -> Arrangement {
        let xs = vec![exact_int(0), exact_int(1), exact_int(2)];
        let ys = vec![exact_int(0), exact_int(1), exact_int(2)];
        build_arrangement(xs, ys, &[(1, 1), (2, 2)]).unwrap()
    }

    #[test]
    fn arrangement_message_round_trip() {
        let arrangement = sample_arrangement();
        let message = ArrangementMessage::from_arrangement(&arrangement);
        let rebuilt = message.to_arrangement().unwrap();
        rebuilt.validate().unwrap();
        let again = ArrangementMessage::from_arrangement(&rebuilt);
        assert_eq!(message, again);
    }

    #[test]
    fn dangling_ids_are_rejected() {
        let arrangement = sample_arrangement();
        let mut message = ArrangementMessage::from_arrangement(&arrangement);
        message.half_edges[0].next = 10_000;
        let err = message.to_arrangement().unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn corrupt_frame_is_rejected() {
        let arrangement = sample_arrangement();
        let mut message = ArrangementMessage::from_arrangement(&arrangement);
        message.vertices[0].x = 3.5;
        assert!(message.to_arrangement().is_err());
    }
}
