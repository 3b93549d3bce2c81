//! A scrubbing session: one frame store, one smoothing state, one output.
//!
//! [`ScrubSession`] ties extraction to gesture-driven playback. Loading a new
//! source first clears everything left from the previous one, so a stale
//! frame is never displayed while the new video is being processed. Each
//! openness reading then selects a frame and forwards it to the attached
//! [`FrameSink`].
//!
//! # Example
//!
//! ```no_run
//! use scrubber::{ExtractionRequest, ImageSequenceSource, ScrubSession, ScrubberError};
//!
//! # async fn example() -> Result<(), ScrubberError> {
//! let mut session = ScrubSession::new();
//! let mut source = ImageSequenceSource::from_directory("frames/", 24.0)?;
//! session.load(&mut source, &ExtractionRequest::new(90)).await?;
//!
//! // Called once per detector tick.
//! if let Some(index) = session.update_openness(0.8) {
//!     println!("showing frame {index}");
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::config::{ExtractionOptions, ExtractionRequest, SessionSettings};
use crate::error::ScrubberError;
use crate::extractor::FrameBatchExtractor;
use crate::gesture::GestureToIndexMapper;
use crate::source::PlaybackSource;
use crate::store::{ExtractedFrame, FrameStore};

/// Receives the frame to display, e.g. a GPU quad renderer.
///
/// The sink runs its own redraw loop and gives no feedback to the session.
pub trait FrameSink {
    /// Display `frame` until the next call.
    fn set_frame(&mut self, frame: &ExtractedFrame);

    /// Stop displaying anything. Called when the session resets.
    fn clear(&mut self) {}
}

/// Explicit state for one scrubbing session.
pub struct ScrubSession {
    extractor: FrameBatchExtractor,
    mapper: GestureToIndexMapper,
    store: FrameStore,
    sink: Option<Box<dyn FrameSink>>,
    current: Option<usize>,
}

impl Debug for ScrubSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScrubSession")
            .field("frames", &self.store.len())
            .field("smoothed", &self.mapper.smoothed())
            .field("current", &self.current)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for ScrubSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrubSession {
    /// Create a session with default extraction options and smoothing.
    pub fn new() -> Self {
        Self::with_parts(ExtractionOptions::new(), GestureToIndexMapper::default())
    }

    /// Create a session from loaded settings.
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::with_parts(
            settings.to_options(),
            GestureToIndexMapper::new(settings.smoothing_factor),
        )
    }

    pub fn with_parts(options: ExtractionOptions, mapper: GestureToIndexMapper) -> Self {
        Self {
            extractor: FrameBatchExtractor::new(options),
            mapper,
            store: FrameStore::new(),
            sink: None,
            current: None,
        }
    }

    /// Attach the output that receives selected frames.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.sink = Some(sink);
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn mapper(&self) -> &GestureToIndexMapper {
        &self.mapper
    }

    pub fn extractor_mut(&mut self) -> &mut FrameBatchExtractor {
        &mut self.extractor
    }

    /// Index of the frame most recently sent to the sink.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Returns `true` once a load has succeeded and frames are available.
    pub fn is_ready(&self) -> bool {
        !self.store.is_empty()
    }

    /// Drop all frames, reset smoothing to 0, and clear the sink.
    pub fn reset(&mut self) {
        self.store.clear();
        self.mapper.reset();
        self.current = None;
        if let Some(sink) = self.sink.as_mut() {
            sink.clear();
        }
    }

    /// Reset, then extract frames from `source` into a fresh store.
    ///
    /// On success the new store replaces the old one wholesale and frame 0 is
    /// sent to the sink. Returns the number of frames stored.
    ///
    /// # Errors
    ///
    /// Any extraction error. The session is left reset, with no frames.
    pub async fn load<S: PlaybackSource + ?Sized>(
        &mut self,
        source: &mut S,
        request: &ExtractionRequest,
    ) -> Result<usize, ScrubberError> {
        self.reset();

        let store = self.extractor.extract(source, request).await?;
        self.store = store;

        if let Some(first) = self.store.first() {
            self.current = Some(first.index());
            if let Some(sink) = self.sink.as_mut() {
                sink.set_frame(first);
            }
        }

        Ok(self.store.len())
    }

    /// Feed one raw openness reading.
    ///
    /// Smooths it, selects the matching frame, sends it to the sink, and
    /// returns its index. Returns `None` (and leaves the smoothing state
    /// untouched) while no frames are loaded.
    pub fn update_openness(&mut self, raw: f32) -> Option<usize> {
        if self.store.is_empty() {
            return None;
        }

        let index = self.mapper.select_index(raw, &self.store)?;
        let frame = self.store.get(index)?;
        log::trace!(
            "Openness {:.2} -> frame {index}/{}",
            self.mapper.smoothed(),
            self.store.len()
        );

        self.current = Some(index);
        if let Some(sink) = self.sink.as_mut() {
            sink.set_frame(frame);
        }
        Some(index)
    }

    /// The frame most recently sent to the sink.
    pub fn current_frame(&self) -> Option<&ExtractedFrame> {
        self.current.and_then(|index| self.store.get(index))
    }
}
