//! Timing and cancellation utilities for the completion engine.

mod debouncer;

pub use debouncer::{KeyedDebouncedHandle, KeyedDebouncer};
pub use tokio_util::sync::CancellationToken;

/// Marker error for work abandoned because its token was cancelled or its
/// input went stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Return `Err(Cancelled)` if `token` has been cancelled.
#[inline]
pub fn check_cancelled(token: &CancellationToken) -> Result<(), Cancelled> {
    if token.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}
