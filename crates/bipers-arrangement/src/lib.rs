// crates/bipers-arrangement/src/lib.rs

//! The planar line arrangement dual to the template points.
//!
//! An id-arena DCEL over the `(u, v)` strip, built by a Bentley–Ottmann
//! sweep with exact-rational fallback comparisons, plus point location and
//! per-face barcode templates with numeric rescaling.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod anchor;
pub mod arrangement;
pub mod barcode;
pub mod builder;
pub mod dcel;

pub use anchor::*;
pub use arrangement::*;
pub use barcode::*;
pub use builder::*;
pub use dcel::*;
