// crates/bipers-core/src/progress.rs

//! Progress reporting and cooperative cancellation.
//!
//! The core never blocks on the caller: progress methods have no return
//! values and implementations must not re-enter the engine. Cancellation is
//! a shared atomic flag polled at coarse boundaries (end of a reduction
//! stage, end of a sweep event, end of a path step).

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback surface for long computations.
///
/// All methods are optional; implementations may dispatch to another thread
/// but must stay non-blocking.
pub trait Progress {
    /// Announce the maximum value later passed to [`Progress::progress`].
    fn set_max(&self, _max: u32) {}

    /// Announce that the pipeline moved to its next stage.
    fn advance_stage(&self) {}

    /// Report progress within the current stage.
    fn progress(&self, _value: u32) {}
}

/// A progress sink that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the computation notices at its next poll point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Poll point: error out iff cancellation was requested.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] when the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
