// crates/bipers-arrangement/src/dcel.rs

//! DCEL primitives: vertices, half-edges, and faces in id-addressed arenas.
//!
//! Cross-references are integer ids rather than pointers, so the cyclic
//! `twin`/`next`/`prev` structure needs no reference cycles; `None` marks a
//! link that is still unset (during construction) or the unbounded outside.

use crate::barcode::BarcodeTemplate;
use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Index into [`crate::Arrangement::vertices`].
    VertexId
);
arena_id!(
    /// Index into [`crate::Arrangement::half_edges`].
    HalfedgeId
);
arena_id!(
    /// Index into [`crate::Arrangement::faces`].
    FaceId
);
arena_id!(
    /// Index into [`crate::Arrangement::anchors`].
    AnchorId
);

/// A vertex of the arrangement, with (possibly infinite) shadow coordinates.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub incident_edge: Option<HalfedgeId>,
}

impl Vertex {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            incident_edge: None,
        }
    }
}

/// A directed half-edge. `face` is the face to its left along traversal
/// order; `None` means the unbounded outside of the strip. Half-edges are
/// always created in twin pairs, so `twin` is never dangling.
#[derive(Clone, Debug)]
pub struct HalfEdge {
    pub origin: Option<VertexId>,
    pub twin: HalfedgeId,
    pub next: Option<HalfedgeId>,
    pub prev: Option<HalfedgeId>,
    pub face: Option<FaceId>,
    /// The anchor whose dual line this edge lies on; `None` on the frame.
    pub anchor: Option<AnchorId>,
}

impl HalfEdge {
    #[must_use]
    pub const fn new(origin: Option<VertexId>, twin: HalfedgeId, anchor: Option<AnchorId>) -> Self {
        Self {
            origin,
            twin,
            next: None,
            prev: None,
            face: None,
            anchor,
        }
    }
}

/// A 2-cell with one boundary half-edge and its barcode-template slot.
#[derive(Clone, Debug, Default)]
pub struct Face {
    pub boundary: Option<HalfedgeId>,
    pub barcode: BarcodeTemplate,
    pub visited: bool,
}

impl Face {
    #[must_use]
    pub fn new(boundary: HalfedgeId) -> Self {
        Self {
            boundary: Some(boundary),
            barcode: BarcodeTemplate::default(),
            visited: false,
        }
    }
}
