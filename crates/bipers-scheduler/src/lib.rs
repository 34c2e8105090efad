// crates/bipers-scheduler/src/lib.rs

//! Path planning over the arrangement's dual graph.
//!
//! One node per 2-cell, one weighted edge per interior half-edge pair; a
//! Kruskal spanning tree rooted at the top-left cell is walked depth-first,
//! children in order of increasing branch weight so the heaviest subtree is
//! entered last. Each step of the resulting path is a half-edge pointing
//! into the face being entered; backtracking re-crosses the same edge, so
//! the path length is at most `2·|faces| − 2`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod dual_graph;
pub mod mst;
pub mod path;

pub use dual_graph::*;
pub use mst::*;
pub use path::*;
