//! One seek-and-capture cycle.
//!
//! A [`SeekCycle`] moves a [`PlaybackSource`] to a target time, waits for the
//! source to report that the move took effect, lets one render tick pass,
//! draws the source into the shared [`DecodeSurface`], and encodes the result
//! to a JPEG still. Each cycle resolves exactly once and never retries; the
//! caller decides what a failure means for the batch.
//!
//! The wait is a two-outcome receive on a single-slot channel (see
//! [`SeekNotifier`]), optionally bounded by a timeout. Whichever way the wait
//! ends, the receiving half is dropped before the cycle returns, so nothing
//! stays subscribed to the source.

use std::time::Duration;

use crate::config::ExtractionOptions;
use crate::error::ScrubberError;
use crate::source::{PlaybackSource, SeekEvent, SeekNotifier};
use crate::store::ExtractedFrame;
use crate::surface::{DecodeSurface, decode_jpeg, encode_jpeg};

/// Distance kept from the end of the stream when seeking.
///
/// Seeking exactly to the duration fails on some decoders.
pub const SEEK_END_EPSILON: f64 = 0.001;

/// Clamp a requested time into the seekable range `[0, duration - ε]`.
///
/// Streams no longer than ε clamp every target to 0. Negative and `NaN`
/// targets clamp to 0.
pub fn clamp_seek_target(target_seconds: f64, duration: f64) -> f64 {
    let upper = if duration > SEEK_END_EPSILON {
        duration - SEEK_END_EPSILON
    } else {
        0.0
    };
    target_seconds.max(0.0).min(upper)
}

/// Where a cycle's seek stands.
///
/// Moves `Idle → Seeking → Settled` or `Idle → Seeking → Failed`, never both.
/// The state tracks the seek itself: a cycle that settled but then failed to
/// capture or encode stays `Settled` and returns the capture error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Seeking,
    Settled,
    Failed,
}

/// A single seek → settle → render tick → draw → encode pass.
#[derive(Debug)]
pub struct SeekCycle {
    index: usize,
    state: CycleState,
}

impl SeekCycle {
    /// Create an idle cycle for the frame with ordinal `index`.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Run the cycle against `source`, capturing into `surface`.
    ///
    /// # Errors
    ///
    /// - [`ScrubberError::SeekTimeoutOrError`] if the source reports an error
    ///   or drops the notifier, the seek does not settle within the timeout,
    ///   the source cannot draw, or the cycle has already run.
    /// - [`ScrubberError::EncodeFailure`] if the captured pixels cannot be
    ///   encoded or the encoded still cannot be decoded.
    pub async fn run<S: PlaybackSource + ?Sized>(
        &mut self,
        source: &mut S,
        surface: &mut DecodeSurface,
        target_seconds: f64,
        options: &ExtractionOptions,
    ) -> Result<ExtractedFrame, ScrubberError> {
        if self.state != CycleState::Idle {
            return Err(ScrubberError::SeekTimeoutOrError {
                target_seconds,
                reason: format!("cycle {} already ran ({:?})", self.index, self.state),
            });
        }

        let seek_to = clamp_seek_target(target_seconds, source.duration());
        log::debug!(
            "Frame {}: requesting seek to {seek_to:.3}s (target {target_seconds:.3}s)",
            self.index
        );

        if let Err(reason) = self.await_settle(source, seek_to, options.seek_timeout).await {
            self.state = CycleState::Failed;
            log::warn!("Frame {}: seek to {seek_to:.3}s failed: {reason}", self.index);
            return Err(ScrubberError::SeekTimeoutOrError {
                target_seconds: seek_to,
                reason,
            });
        }
        self.state = CycleState::Settled;

        let position = source.current_time();
        log::debug!(
            "Frame {}: settled at {position:.3}s (requested {seek_to:.3}s)",
            self.index
        );

        // The picture is only guaranteed to reflect the seek one render
        // tick after the settle notification.
        tokio::task::yield_now().await;
        if !options.paint_delay.is_zero() {
            tokio::time::sleep(options.paint_delay).await;
        }

        source
            .draw(surface)
            .map_err(|error| ScrubberError::SeekTimeoutOrError {
                target_seconds: seek_to,
                reason: format!("pixel capture failed: {error}"),
            })?;

        let (image, encoded) = encode_surface(surface, options.encode.quality).await?;
        Ok(ExtractedFrame::new(self.index, seek_to, position, image, encoded))
    }

    async fn await_settle<S: PlaybackSource + ?Sized>(
        &mut self,
        source: &mut S,
        seek_to: f64,
        timeout: Option<Duration>,
    ) -> Result<(), String> {
        let (notifier, receiver) = SeekNotifier::channel();
        self.state = CycleState::Seeking;
        source.seek(seek_to, notifier);

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(format!("no settle notification within {limit:?}")),
            },
            None => receiver.await,
        };

        match outcome {
            Ok(SeekEvent::Settled) => Ok(()),
            Ok(SeekEvent::Error(reason)) => Err(format!("source error: {reason}")),
            Err(_) => Err("source dropped the seek notification without firing it".to_string()),
        }
    }
}

/// Run one seek-and-capture cycle for frame `index`.
///
/// Convenience wrapper around [`SeekCycle::run`].
pub async fn seek_and_capture<S: PlaybackSource + ?Sized>(
    source: &mut S,
    surface: &mut DecodeSurface,
    index: usize,
    target_seconds: f64,
    options: &ExtractionOptions,
) -> Result<ExtractedFrame, ScrubberError> {
    SeekCycle::new(index)
        .run(source, surface, target_seconds, options)
        .await
}

/// Encode the surface off the scheduler thread and decode the result back.
async fn encode_surface(
    surface: &DecodeSurface,
    quality: u8,
) -> Result<(image::DynamicImage, Vec<u8>), ScrubberError> {
    let raster = surface.snapshot();
    tokio::task::spawn_blocking(move || {
        let encoded = encode_jpeg(&raster, quality)?;
        let image = decode_jpeg(&encoded)?;
        Ok::<_, ScrubberError>((image, encoded))
    })
    .await
    .map_err(|error| ScrubberError::EncodeFailure(format!("encode task failed: {error}")))?
}
