//! Error types for the `scrubber` crate.
//!
//! This module defines [`ScrubberError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context to
//! diagnose a failed extraction without extra logging at the call site: the
//! failing frame ordinal, the requested timestamp, and the underlying cause.

use std::io::Error as IoError;

use image::ImageError;
use thiserror::Error;

/// The unified error type for all `scrubber` operations.
///
/// Every public method that can fail returns `Result<T, ScrubberError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScrubberError {
    /// The playback source cannot be extracted from: metadata is not loaded,
    /// the duration is unknown, infinite or not positive, or the intrinsic
    /// dimensions are zero.
    #[error("Invalid playback source: {0}")]
    InvalidSource(String),

    /// A single seek cycle failed before a frame was captured.
    ///
    /// Raised when the source reports an error instead of settling, drops its
    /// notifier without firing it, does not settle within the configured
    /// timeout, or fails to render its pixels into the decode surface.
    #[error("Seek to {target_seconds:.3}s failed: {reason}")]
    SeekTimeoutOrError {
        /// The clamped position that was requested.
        target_seconds: f64,
        /// Human-readable cause.
        reason: String,
    },

    /// The decode surface could not be encoded to a still image, or the
    /// encoded still could not be decoded back.
    #[error("Failed to encode captured frame: {0}")]
    EncodeFailure(String),

    /// A batch extraction stopped before capturing every requested frame.
    ///
    /// Frames captured before the failure are discarded; `frames_captured`
    /// is reported for diagnostics only.
    #[error(
        "Extraction aborted at frame {index} (target {target_seconds:.3}s, {frames_captured} captured): {source}"
    )]
    ExtractionAborted {
        /// Zero-based ordinal of the frame that failed.
        index: usize,
        /// Target timestamp of the failing frame, before clamping.
        target_seconds: f64,
        /// Number of frames that had been captured when the run stopped.
        frames_captured: usize,
        /// The failure that stopped the run.
        #[source]
        source: Box<ScrubberError>,
    },

    /// The extraction loop finished without storing a single frame.
    #[error("No frames were extracted despite requesting {requested}")]
    EmptyResult {
        /// Number of frames that were requested.
        requested: u32,
    },

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// A frame was appended to a [`FrameStore`](crate::FrameStore) out of order.
    #[error("Frame {found} appended out of order (expected ordinal {expected})")]
    FrameOutOfOrder {
        /// The ordinal the store expected next.
        expected: usize,
        /// The ordinal carried by the rejected frame.
        found: usize,
    },

    /// Session settings could not be parsed or failed validation.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while loading or saving images.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

impl ScrubberError {
    /// Returns the innermost cause of an [`ExtractionAborted`](ScrubberError::ExtractionAborted)
    /// error, or `self` for every other variant.
    pub fn root_cause(&self) -> &ScrubberError {
        match self {
            ScrubberError::ExtractionAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for ScrubberError {
    fn from(error: ffmpeg_next::Error) -> Self {
        ScrubberError::FfmpegError(error.to_string())
    }
}
