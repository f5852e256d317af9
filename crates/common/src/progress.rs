//! Generic progress callback trait and percent helpers.

use std::marker::PhantomData;

/// Generic progress callback trait.
///
/// Type parameter `T` is the progress data type, so the orchestrator, the
/// parallel strategy and the resumable session can each report their own
/// progress shape through the same callback pattern.
pub trait ProgressCallback<T>: Send + Sync {
    /// Called with progress updates.
    ///
    /// # Arguments
    /// * `progress` - Progress data for the current operation
    ///
    /// # Returns
    /// - `true` to continue the operation
    /// - `false` to cancel the operation
    fn on_progress(&self, progress: &T) -> bool;
}

/// A no-op progress callback that always continues.
pub struct NoOpProgress;

impl<T> ProgressCallback<T> for NoOpProgress {
    fn on_progress(&self, _progress: &T) -> bool {
        true
    }
}

/// A progress callback that wraps a closure.
pub struct FnProgress<F, T> {
    callback: F,
    _marker: PhantomData<fn(&T)>,
}

impl<F, T> FnProgress<F, T>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    /// Create a new closure-based progress callback.
    ///
    /// # Arguments
    /// * `callback` - Closure that receives progress and returns whether to continue
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _marker: PhantomData,
        }
    }
}

impl<F, T> ProgressCallback<T> for FnProgress<F, T>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn on_progress(&self, progress: &T) -> bool {
        (self.callback)(progress)
    }
}

/// Create a progress callback from a closure.
///
/// # Arguments
/// * `f` - Closure that receives progress and returns whether to continue
///
/// # Returns
/// A `FnProgress` wrapper implementing `ProgressCallback<T>`.
pub fn progress_fn<F, T>(f: F) -> FnProgress<F, T>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    FnProgress::new(f)
}

/// Rounded percentage of `done` out of `total`, clamped to 100.
///
/// A zero `total` counts as complete.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let done: u128 = u128::from(done.min(total));
    let percent: u128 = (done * 100 + u128::from(total) / 2) / u128::from(total);
    percent as u8
}

/// A sub-range of the overall 0-100 progress scale.
///
/// Each upload phase reports on its own local 0-100 scale; the band maps that
/// local value into the phase's share of the overall scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBand {
    /// Overall percent at local 0.
    pub start: u8,
    /// Overall percent at local 100.
    pub end: u8,
}

impl ProgressBand {
    /// Create a band. `start` must not exceed `end`.
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Map a local percent (clamped to 100) into the band.
    pub fn scale(&self, local_percent: u8) -> u8 {
        let local: u32 = u32::from(local_percent.min(100));
        let width: u32 = u32::from(self.end.saturating_sub(self.start));
        self.start + ((local * width + 50) / 100) as u8
    }
}
