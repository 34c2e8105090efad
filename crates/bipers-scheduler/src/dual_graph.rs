// crates/bipers-scheduler/src/dual_graph.rs

//! The dual multigraph of the arrangement.

use bipers_arrangement::{Arrangement, FaceId};
use bipers_core::Result;

/// One undirected dual edge: two face ids plus the weight of the anchor
/// being crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DualEdge {
    pub a: u32,
    pub b: u32,
    pub weight: u64,
}

/// Collect every interior adjacency as an undirected edge, keeping parallel
/// edges (two faces can share several half-edge pairs).
///
/// # Errors
/// Propagates broken-link invariant failures from the arrangement.
pub fn dual_edges(arrangement: &Arrangement) -> Result<Vec<DualEdge>> {
    let mut edges = Vec::new();
    for i in 0..arrangement.num_faces() {
        let boundary = arrangement.faces[i as usize].boundary;
        let Some(start) = boundary else { continue };
        let mut current = start;
        loop {
            let twin = arrangement.he(current).twin;
            if let Some(neighbor) = arrangement.he(twin).face {
                let j = neighbor.0;
                if i < j {
                    let weight = arrangement
                        .he(current)
                        .anchor
                        .map_or(0, |a| arrangement.anchor(a).weight);
                    edges.push(DualEdge { a: i, b: j, weight });
                }
            }
            current = arrangement.next_of(current)?;
            if current == start {
                break;
            }
        }
    }
    Ok(edges)
}

/// The cell the traversal starts from: the face inside the top-left corner.
#[must_use]
pub fn root_face(arrangement: &Arrangement) -> FaceId {
    arrangement
        .he(arrangement.he(arrangement.topleft).twin)
        .face
        .unwrap_or(FaceId(0))
}
