// crates/bipers-core/src/error.rs

//! Workspace-wide error type.
//!
//! Every fallible operation in the pipeline returns [`Result`]; nothing is
//! silently recovered inside the core. Callers match on the variant to decide
//! how to present the failure.

use thiserror::Error;

/// The error kinds a computation or query can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: inconsistent matrices or grade vectors, a boundary
    /// composition that is not zero, or a bigrade out of range.
    #[error("invalid input: {0}")]
    Input(String),

    /// A barcode query that cannot be answered (angle out of `[0, 90]`, or a
    /// point that locates in no face, which indicates corruption).
    #[error("invalid query: {0}")]
    Query(String),

    /// Cooperative cancellation observed at a poll point.
    #[error("computation cancelled")]
    Cancelled,

    /// An algorithmic invariant failed. This is a bug, not a data error.
    #[error("invariant violated in {location}: {message}")]
    Invariant {
        location: &'static str,
        message: String,
    },

    /// Persisted data that is unrecognised, truncated, or self-inconsistent.
    #[error("unreadable persisted data: {0}")]
    Format(String),
}

impl Error {
    /// Build an [`Error::Invariant`] with a location diagnostic.
    #[must_use]
    pub fn invariant(location: &'static str, message: impl Into<String>) -> Self {
        Self::Invariant {
            location,
            message: message.into(),
        }
    }
}

/// Crate-standard result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_location() {
        let err = Error::invariant("sweep", "crossing between non-consecutive lines");
        let text = err.to_string();
        assert!(text.contains("sweep"));
        assert!(text.contains("non-consecutive"));
    }
}
