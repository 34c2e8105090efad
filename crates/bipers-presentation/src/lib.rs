// crates/bipers-presentation/src/lib.rs

//! Free implicit representations and their minimal presentations.
//!
//! Consumes a raw FIRep (two column-sparse mod-2 matrices with bigrades on
//! columns), normalises it, and produces a minimal presentation together
//! with the bigraded Betti numbers and the Hilbert function.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod betti;
pub mod firep;
pub mod presentation;

pub use betti::*;
pub use firep::*;
pub use presentation::*;
