//! Progress reporting trait for dataset loading.
//!
//! Defines a [`ProgressCallback`] trait that decouples progress reporting
//! from any specific rendering backend (e.g., `indicatif` progress bars or
//! silence). Implementations that render live in the binaries.

/// Trait for reporting progress from long-running operations.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A no-op implementation of [`ProgressCallback`] that silently ignores
/// all progress updates.
///
/// Useful for tests and non-interactive runs.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
