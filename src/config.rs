//! Extraction configuration.
//!
//! [`ExtractionRequest`] describes *what* to extract (how many frames, how
//! long to let the decoder settle between seeks). [`ExtractionOptions`] is a
//! builder that threads progress callbacks, cancellation tokens, encode
//! quality and timing knobs through the extractor without polluting every
//! function signature. [`SessionSettings`] is the serializable configuration
//! surface a hosting application loads from disk.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use scrubber::{CancellationToken, ExtractionOptions, ExtractionRequest, ProgressInfo};
//!
//! let request = ExtractionRequest::new(90).with_inter_frame_delay_ms(50);
//! let token = CancellationToken::new();
//! let options = ExtractionOptions::new()
//!     .with_progress(Arc::new(|info: &ProgressInfo| println!("{}", info.current)))
//!     .with_cancellation(token.clone())
//!     .with_encode_quality(80)
//!     .with_seek_timeout(Some(Duration::from_secs(5)));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScrubberError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default number of frames extracted per video.
pub const DEFAULT_FRAME_COUNT: u32 = 90;
/// Default settle delay between consecutive seeks, in milliseconds.
pub const DEFAULT_INTER_FRAME_DELAY_MS: u64 = 50;
/// Default JPEG quality (0.8 on a unit scale).
pub const DEFAULT_ENCODE_QUALITY: u8 = 80;
/// Default exponential smoothing factor for the openness signal.
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.2;
/// Default bound on how long one seek may take to settle.
pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_secs(5);
/// Default post-settle render tick (one frame at 60 Hz).
pub const DEFAULT_PAINT_DELAY: Duration = Duration::from_millis(16);

/// A request to extract `frame_count` frames spread across a source.
///
/// Created once per video load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ExtractionRequest {
    /// Number of frames to capture. Zero is coerced up to one.
    pub frame_count: u32,
    /// Pause between one capture and the next seek.
    pub inter_frame_delay: Duration,
}

impl ExtractionRequest {
    /// Request `frame_count` frames with the default 50 ms settle delay.
    pub fn new(frame_count: u32) -> Self {
        Self {
            frame_count,
            inter_frame_delay: Duration::from_millis(DEFAULT_INTER_FRAME_DELAY_MS),
        }
    }

    /// Set the settle delay between captures.
    pub fn with_inter_frame_delay(mut self, delay: Duration) -> Self {
        self.inter_frame_delay = delay;
        self
    }

    /// Set the settle delay between captures, in milliseconds.
    pub fn with_inter_frame_delay_ms(self, millis: u64) -> Self {
        self.with_inter_frame_delay(Duration::from_millis(millis))
    }

    /// The frame count actually used by the extractor.
    pub fn effective_frame_count(&self) -> u32 {
        self.frame_count.max(1)
    }
}

impl Default for ExtractionRequest {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_COUNT)
    }
}

/// Still-image encoding settings for captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_ENCODE_QUALITY,
        }
    }
}

/// Operational settings for an extraction run.
///
/// All fields have sensible defaults; a default-constructed value uses no
/// progress callback, no cancellation, JPEG quality 80, a 5 second seek
/// timeout and a 16 ms post-settle render tick.
#[derive(Clone)]
pub struct ExtractionOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) encode: EncodeOptions,
    pub(crate) seek_timeout: Option<Duration>,
    pub(crate) paint_delay: Duration,
}

impl Debug for ExtractionOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractionOptions")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("encode_quality", &self.encode.quality)
            .field("seek_timeout", &self.seek_timeout)
            .field("paint_delay", &self.paint_delay)
            .finish()
    }
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            encode: EncodeOptions::default(),
            seek_timeout: Some(DEFAULT_SEEK_TIMEOUT),
            paint_delay: DEFAULT_PAINT_DELAY,
        }
    }

    /// Attach a progress callback, invoked once per captured frame.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled, the extraction loop stops before its next
    /// seek and returns [`ScrubberError::ExtractionAborted`] wrapping
    /// [`ScrubberError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set the JPEG quality used for captured frames. Clamped to 1-100.
    #[must_use]
    pub fn with_encode_quality(mut self, quality: u8) -> Self {
        self.encode.quality = quality.clamp(1, 100);
        self
    }

    /// Bound how long a single seek may take to settle.
    ///
    /// `None` waits indefinitely for the source's notification.
    #[must_use]
    pub fn with_seek_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.seek_timeout = timeout;
        self
    }

    /// Set the delay between a seek settling and its pixels being captured.
    ///
    /// The capture always yields to the scheduler once after settling, even
    /// when this is zero.
    #[must_use]
    pub fn with_paint_delay(mut self, delay: Duration) -> Self {
        self.paint_delay = delay;
        self
    }

    /// JPEG quality in use.
    pub fn encode_quality(&self) -> u8 {
        self.encode.quality
    }

    /// Seek timeout in use.
    pub fn seek_timeout(&self) -> Option<Duration> {
        self.seek_timeout
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Serializable configuration for a scrubbing session.
///
/// Every field is optional in the JSON form and falls back to the default
/// used by the observed deployment.
///
/// ```
/// use scrubber::SessionSettings;
///
/// let settings = SessionSettings::from_json_str(r#"{ "frame_count": 30 }"#)?;
/// assert_eq!(settings.frame_count, 30);
/// assert_eq!(settings.inter_frame_delay_ms, 50);
/// # Ok::<(), scrubber::ScrubberError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Frames to extract per video.
    pub frame_count: u32,
    /// Settle delay between seeks, in milliseconds.
    pub inter_frame_delay_ms: u64,
    /// Exponential smoothing factor for the openness signal, in `(0, 1]`.
    pub smoothing_factor: f32,
    /// JPEG quality, 1-100.
    pub encode_quality: u8,
    /// Per-seek settle timeout in milliseconds; `0` disables the bound.
    pub seek_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            inter_frame_delay_ms: DEFAULT_INTER_FRAME_DELAY_MS,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            encode_quality: DEFAULT_ENCODE_QUALITY,
            seek_timeout_ms: DEFAULT_SEEK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SessionSettings {
    /// Parse and validate settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ScrubberError> {
        let settings: SessionSettings = serde_json::from_str(json)
            .map_err(|error| ScrubberError::ConfigError(error.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate settings from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScrubberError> {
        let path = path.as_ref();
        log::debug!("Loading session settings from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<(), ScrubberError> {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(ScrubberError::ConfigError(format!(
                "smoothing_factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if !(1..=100).contains(&self.encode_quality) {
            return Err(ScrubberError::ConfigError(format!(
                "encode_quality must be in 1..=100, got {}",
                self.encode_quality
            )));
        }
        Ok(())
    }

    /// The extraction request described by these settings.
    pub fn to_request(&self) -> ExtractionRequest {
        ExtractionRequest::new(self.frame_count).with_inter_frame_delay_ms(self.inter_frame_delay_ms)
    }

    /// Extraction options described by these settings.
    pub fn to_options(&self) -> ExtractionOptions {
        let timeout = (self.seek_timeout_ms > 0).then(|| Duration::from_millis(self.seek_timeout_ms));
        ExtractionOptions::new()
            .with_encode_quality(self.encode_quality)
            .with_seek_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ExtractionOptions, ExtractionRequest, SessionSettings};

    #[test]
    fn request_coerces_zero_frames() {
        assert_eq!(ExtractionRequest::new(0).effective_frame_count(), 1);
        assert_eq!(ExtractionRequest::new(12).effective_frame_count(), 12);
    }

    #[test]
    fn options_clamp_quality() {
        assert_eq!(ExtractionOptions::new().with_encode_quality(0).encode_quality(), 1);
        assert_eq!(ExtractionOptions::new().with_encode_quality(250).encode_quality(), 100);
    }

    #[test]
    fn settings_reject_out_of_range_smoothing() {
        let error = SessionSettings::from_json_str(r#"{ "smoothing_factor": 1.5 }"#).unwrap_err();
        assert!(error.to_string().contains("smoothing_factor"));
    }

    #[test]
    fn settings_zero_timeout_disables_bound() {
        let settings = SessionSettings {
            seek_timeout_ms: 0,
            ..SessionSettings::default()
        };
        assert_eq!(settings.to_options().seek_timeout(), None);
        assert_eq!(
            SessionSettings::default().to_options().seek_timeout(),
            Some(Duration::from_secs(5))
        );
    }
}
