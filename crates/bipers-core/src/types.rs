// crates/bipers-core/src/types.rs

//! Canonical core types used across the bipers workspace.
//!
//! These live in `bipers-core` and are broadly re-exported at the crate root
//! so other crates can import via `bipers_core::Bigrade`,
//! `bipers_core::TemplatePoint`, etc.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Discrete bigrade: a pair of indices into the sorted x/y grade vectors.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Bigrade {
    pub x: u32,
    pub y: u32,
}

impl Bigrade {
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Product (coordinate-wise) partial order.
    #[inline]
    #[must_use]
    pub const fn leq(&self, other: &Self) -> bool {
        self.x <= other.x && self.y <= other.y
    }

    /// Colexicographic total order: compare y first, then x.
    #[inline]
    #[must_use]
    pub fn colex_cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }

    /// Lexicographic total order: compare x first, then y.
    #[inline]
    #[must_use]
    pub fn lex_cmp(&self, other: &Self) -> Ordering {
        self.x.cmp(&other.x).then(self.y.cmp(&other.y))
    }

    /// True iff neither `self ≤ other` nor `other ≤ self` in the product order.
    #[inline]
    #[must_use]
    pub const fn strongly_incomparable(&self, other: &Self) -> bool {
        (self.x < other.x && self.y > other.y) || (self.x > other.x && self.y < other.y)
    }

    /// Least upper bound in the product order.
    #[inline]
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }
}

impl fmt::Display for Bigrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// A template point: a bigrade together with the three mod-2 Betti
/// multiplicities at that bigrade. Anchors that are not support points are
/// appended with all multiplicities zero.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplatePoint {
    pub x: u32,
    pub y: u32,
    pub xi0: i32,
    pub xi1: i32,
    pub xi2: i32,
}

impl TemplatePoint {
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, xi0: i32, xi1: i32, xi2: i32) -> Self {
        Self { x, y, xi0, xi1, xi2 }
    }

    #[inline]
    #[must_use]
    pub const fn grade(&self) -> Bigrade {
        Bigrade::new(self.x, self.y)
    }

    /// True iff any Betti multiplicity is nonzero.
    #[inline]
    #[must_use]
    pub const fn is_support(&self) -> bool {
        self.xi0 != 0 || self.xi1 != 0 || self.xi2 != 0
    }
}

/// Caller-supplied knobs for a computation.
///
/// `*_bins = 0` means no rebinning on that axis; `*_reverse` negates that
/// coordinate axis before any comparison. The whole block is persisted
/// verbatim at the head of a saved computation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputParameters {
    pub hom_degree: u32,
    pub x_bins: u32,
    pub y_bins: u32,
    pub x_reverse: bool,
    pub y_reverse: bool,
    pub verbosity: u8,
}

impl Default for InputParameters {
    fn default() -> Self {
        Self {
            hom_degree: 0,
            x_bins: 0,
            y_bins: 0,
            x_reverse: false,
            y_reverse: false,
            verbosity: 0,
        }
    }
}

/// Dense row-major `u32` grid indexed `[x][y]`; used for the Hilbert function.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UnsignedMatrix {
    num_x: u32,
    num_y: u32,
    data: Vec<u32>,
}

impl UnsignedMatrix {
    #[must_use]
    pub fn new(num_x: u32, num_y: u32) -> Self {
        Self {
            num_x,
            num_y,
            data: vec![0; (num_x as usize) * (num_y as usize)],
        }
    }

    #[inline]
    #[must_use]
    pub const fn num_x(&self) -> u32 {
        self.num_x
    }

    #[inline]
    #[must_use]
    pub const fn num_y(&self) -> u32 {
        self.num_y
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.data[(x as usize) * (self.num_y as usize) + y as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u32) {
        self.data[(x as usize) * (self.num_y as usize) + y as usize] = value;
    }
}
