// crates/bipers-vineyard/src/lib.rs

//! Barcode-template computation along the arrangement path.
//!
//! Maintains an RU-decomposition of the two boundary matrices under the
//! column/row transpositions induced by anchor crossings, falling back to a
//! full rebuild whenever the estimated transposition count crosses a
//! self-tuning threshold.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod grid;
pub mod updater;

pub use grid::*;
pub use updater::*;
