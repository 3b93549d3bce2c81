//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring extraction
//! progress, [`CancellationToken`] for cooperative cancellation, and
//! [`ProgressInfo`] for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scrubber::{CancellationToken, ExtractionOptions, ProgressInfo};
//!
//! let token = CancellationToken::new();
//! let options = ExtractionOptions::new()
//!     .with_progress(Arc::new(|info: &ProgressInfo| {
//!         println!("{:.0}% ({}/{})", info.fraction * 100.0, info.current, info.total);
//!     }))
//!     .with_cancellation(token.clone());
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of extraction progress.
///
/// Delivered to [`ProgressCallback::on_progress`] once per captured frame.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many frames have been captured so far.
    pub current: u64,
    /// Total frames requested for this run.
    pub total: u64,
    /// Completed fraction in `[0, 1]`, equal to `current / total`.
    ///
    /// Monotonically non-decreasing during one run.
    pub fraction: f32,
    /// Wall-clock time elapsed since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Ordinal of the frame that was just captured.
    pub current_index: Option<usize>,
    /// Target timestamp (seconds) of the frame that was just captured.
    pub current_target: Option<f64>,
}

/// Trait for receiving progress updates during extraction.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// operation. Use [`CancellationToken`] for cooperative cancellation.
///
/// Any `Fn(&ProgressInfo) + Send + Sync` closure implements this trait.
pub trait ProgressCallback: Send + Sync {
    /// Called after each captured frame.
    fn on_progress(&self, info: &ProgressInfo);
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressInfo) + Send + Sync,
{
    fn on_progress(&self, info: &ProgressInfo) {
        self(info)
    }
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it; call [`cancel`](CancellationToken::cancel)
/// from anywhere to request that the associated extraction stop. The batch
/// loop checks [`is_cancelled`](CancellationToken::is_cancelled) before each
/// seek, so a cycle already in flight always finishes or fails on its own.
///
/// # Example
///
/// ```
/// use scrubber::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal helper that tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one captured frame and fire the callback.
    pub(crate) fn advance(&mut self, index: usize, target_seconds: f64) -> f32 {
        self.current += 1;
        let info = self.snapshot(Some(index), Some(target_seconds));
        self.callback.on_progress(&info);
        info.fraction
    }

    fn snapshot(&self, index: Option<usize>, target: Option<f64>) -> ProgressInfo {
        let elapsed = self.start_time.elapsed();

        let fraction = if self.total > 0 {
            (self.current as f32 / self.total as f32).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let estimated_remaining = estimate_remaining(
            elapsed,
            self.current,
            self.total.saturating_sub(self.current),
        );

        ProgressInfo {
            current: self.current,
            total: self.total,
            fraction,
            elapsed,
            estimated_remaining,
            current_index: index,
            current_target: target,
        }
    }
}

/// Linear ETA from the average time per finished item. Saturates at
/// `Duration::MAX` instead of overflowing.
fn estimate_remaining(elapsed: Duration, done: u64, remaining: u64) -> Option<Duration> {
    if done == 0 {
        return None;
    }
    let nanos = (elapsed.as_nanos() / u128::from(done)).saturating_mul(u128::from(remaining));
    Some(u64::try_from(nanos).map_or(Duration::MAX, Duration::from_nanos))
}
