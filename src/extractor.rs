//! Batch frame extraction.
//!
//! [`FrameBatchExtractor`] turns a seekable [`PlaybackSource`] into a
//! random-access [`FrameStore`] by running one [`SeekCycle`](crate::SeekCycle)
//! per target timestamp, strictly one after another. Seeking moves the
//! source's single playhead, so overlapping cycles would corrupt each other;
//! the loop never starts a seek before the previous capture has finished.
//!
//! # Example
//!
//! ```no_run
//! use scrubber::{
//!     ExtractionOptions, ExtractionRequest, FrameBatchExtractor, ImageSequenceSource,
//!     ScrubberError,
//! };
//!
//! # async fn example() -> Result<(), ScrubberError> {
//! let mut source = ImageSequenceSource::from_directory("frames/", 30.0)?;
//! let mut extractor = FrameBatchExtractor::new(ExtractionOptions::new());
//! let store = extractor
//!     .extract(&mut source, &ExtractionRequest::new(90))
//!     .await?;
//! println!("captured {} frames", store.len());
//! # Ok(())
//! # }
//! ```

use crate::config::{ExtractionOptions, ExtractionRequest};
use crate::error::ScrubberError;
use crate::progress::ProgressTracker;
use crate::seek::seek_and_capture;
use crate::source::{PlaybackSource, validate_source};
use crate::store::FrameStore;
use crate::surface::DecodeSurface;

/// Target used when only one frame is requested: a representative frame
/// just after the start.
pub const SINGLE_FRAME_TARGET: f64 = 0.01;

/// Compute the seek targets for `frame_count` frames over `duration` seconds.
///
/// One frame targets `min(0.01, duration)`. More than one frame spaces the
/// targets evenly from 0 to `duration` inclusive, and the last target is
/// set to exactly `duration` so accumulated floating-point error never cuts
/// the range short. A `frame_count` of 0 is treated as 1. Targets are not
/// clamped here; each seek clamps its own.
///
/// ```
/// let targets = scrubber::target_schedule(9.0, 10);
/// assert_eq!(targets, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
/// ```
pub fn target_schedule(duration: f64, frame_count: u32) -> Vec<f64> {
    let count = frame_count.max(1) as usize;
    if count == 1 {
        return vec![SINGLE_FRAME_TARGET.min(duration)];
    }

    let step = duration / (count - 1) as f64;
    (0..count)
        .map(|index| {
            if index == count - 1 {
                duration
            } else {
                index as f64 * step
            }
        })
        .collect()
}

/// Runs seek-and-capture cycles across a source's duration.
///
/// The extractor owns the [`DecodeSurface`] shared by every cycle of a run;
/// it is resized to the source's intrinsic resolution at the start of each
/// [`extract`](FrameBatchExtractor::extract).
#[derive(Debug, Default)]
pub struct FrameBatchExtractor {
    options: ExtractionOptions,
    surface: Option<DecodeSurface>,
}

impl FrameBatchExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self {
            options,
            surface: None,
        }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Replace the options used by subsequent runs.
    pub fn set_options(&mut self, options: ExtractionOptions) {
        self.options = options;
    }

    /// The decode surface of the most recent run, if any.
    pub fn surface(&self) -> Option<&DecodeSurface> {
        self.surface.as_ref()
    }

    /// Extract `request.frame_count` frames from `source`.
    ///
    /// Pauses the source, then seeks to each target from
    /// [`target_schedule`] in order. After every capture the frame is stored,
    /// progress is reported, and the request's inter-frame delay elapses
    /// (except after the last frame).
    ///
    /// On failure no frames are returned: a partially filled store is
    /// dropped, never exposed.
    ///
    /// # Errors
    ///
    /// - [`ScrubberError::InvalidSource`] before any seek if metadata is not
    ///   loaded, the duration is not finite and positive, or the size is 0.
    /// - [`ScrubberError::ExtractionAborted`] if a cycle fails or the
    ///   cancellation token is set; the boxed source holds the cause.
    /// - [`ScrubberError::EmptyResult`] if the loop stored no frames.
    pub async fn extract<S: PlaybackSource + ?Sized>(
        &mut self,
        source: &mut S,
        request: &ExtractionRequest,
    ) -> Result<FrameStore, ScrubberError> {
        let duration = validate_source(source)?;
        let frame_count = request.effective_frame_count();
        let (width, height) = source.dimensions();
        let surface = self.surface.insert(DecodeSurface::new(width, height));

        let targets = target_schedule(duration, frame_count);
        log::debug!(
            "Starting extraction: duration {duration:.3}s, {frame_count} frame(s), {width}x{height}, step {:.3}s",
            if frame_count > 1 {
                duration / (frame_count - 1) as f64
            } else {
                0.0
            }
        );

        source.pause();

        let mut store = FrameStore::with_capacity(targets.len());
        let mut tracker = ProgressTracker::new(self.options.progress.clone(), targets.len() as u64);
        let last_index = targets.len() - 1;

        for (index, &target) in targets.iter().enumerate() {
            if self.options.is_cancelled() {
                log::warn!("Extraction cancelled before frame {index}");
                return Err(aborted(index, target, store.len(), ScrubberError::Cancelled));
            }

            let frame = match seek_and_capture(source, surface, index, target, &self.options).await
            {
                Ok(frame) => frame,
                Err(error) => {
                    log::warn!(
                        "Error extracting frame {}/{} (target {target:.3}s): {error}",
                        index + 1,
                        targets.len()
                    );
                    return Err(aborted(index, target, store.len(), error));
                }
            };

            store.append(frame)?;
            let fraction = tracker.advance(index, target);
            log::debug!(
                "Captured frame {}/{} ({:.0}%)",
                index + 1,
                targets.len(),
                fraction * 100.0
            );

            if index < last_index && !request.inter_frame_delay.is_zero() {
                tokio::time::sleep(request.inter_frame_delay).await;
            }
        }

        if store.is_empty() {
            return Err(ScrubberError::EmptyResult {
                requested: frame_count,
            });
        }

        log::info!("Extraction complete: {}/{frame_count} frame(s)", store.len());
        Ok(store)
    }
}

fn aborted(
    index: usize,
    target_seconds: f64,
    frames_captured: usize,
    cause: ScrubberError,
) -> ScrubberError {
    ScrubberError::ExtractionAborted {
        index,
        target_seconds,
        frames_captured,
        source: Box::new(cause),
    }
}
