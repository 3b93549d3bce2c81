//! The playback-source abstraction that extraction drives.
//!
//! A [`PlaybackSource`] is anything with a single playhead that can be moved,
//! reports when the move has taken effect, and can render what it currently
//! shows into a [`DecodeSurface`]. Video decoders and animation timelines both
//! fit: see [`ImageSequenceSource`](crate::ImageSequenceSource) and, with the
//! `ffmpeg` feature, `VideoFileSource`.
//!
//! Seek completion is reported through a [`SeekNotifier`], a single-slot
//! channel that can fire exactly once: either [`settled`](SeekNotifier::settled)
//! or [`error`](SeekNotifier::error), both of which consume it. A notifier
//! dropped without firing is observed by the waiting cycle as a failure, so a
//! source can never leave a listener registered across seeks.

use tokio::sync::oneshot;

use crate::error::ScrubberError;
use crate::surface::DecodeSurface;

/// How much of the source has been loaded, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// Nothing is known about the source yet.
    HaveNothing,
    /// Duration and intrinsic dimensions are known.
    HaveMetadata,
    /// The frame at the current position is available.
    HaveCurrentData,
    /// Frames ahead of the current position are available.
    HaveFutureData,
    /// Enough data is buffered to play through.
    HaveEnoughData,
}

/// The outcome a source reports for one seek request.
#[derive(Debug, Clone, PartialEq)]
pub enum SeekEvent {
    /// The position change took effect and the visual buffer reflects it.
    Settled,
    /// The source failed while seeking.
    Error(String),
}

/// One-shot completion handle passed to [`PlaybackSource::seek`].
///
/// Firing it consumes it, so a seek resolves at most once.
#[derive(Debug)]
pub struct SeekNotifier {
    sender: oneshot::Sender<SeekEvent>,
}

impl SeekNotifier {
    /// Create a notifier and the receiver the seek cycle waits on.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<SeekEvent>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// Report that the seek took effect.
    pub fn settled(self) {
        self.fire(SeekEvent::Settled);
    }

    /// Report that the seek failed.
    pub fn error(self, reason: impl Into<String>) {
        self.fire(SeekEvent::Error(reason.into()));
    }

    /// Returns `true` once the waiting cycle has given up (timed out or been
    /// dropped), meaning any further work for this seek is wasted.
    pub fn is_abandoned(&self) -> bool {
        self.sender.is_closed()
    }

    fn fire(self, event: SeekEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("Seek notification arrived after the cycle stopped listening");
        }
    }
}

/// A single-playhead media primitive that can be seeked and snapshotted.
///
/// Implementations must not fire a notifier more than once (the type already
/// prevents it) and must eventually fire or drop every notifier they are
/// handed. Extraction calls these methods strictly sequentially and never
/// issues a second `seek` before the first has resolved.
pub trait PlaybackSource {
    /// How much of the source is loaded.
    fn ready_state(&self) -> ReadyState;

    /// Total duration in seconds.
    ///
    /// May be `NaN` or infinite when unknown; such sources cannot be
    /// extracted from.
    fn duration(&self) -> f64;

    /// Intrinsic `(width, height)`, meaningful once metadata has loaded.
    fn dimensions(&self) -> (u32, u32);

    /// Current playhead position in seconds. After a seek this may differ
    /// from the requested target.
    fn current_time(&self) -> f64;

    /// Stop playback so the playhead only moves when seeked.
    fn pause(&mut self);

    /// Request that the playhead move to `target_seconds`.
    ///
    /// The source reports the outcome through `notifier`, either before
    /// returning or later from its own event processing.
    fn seek(&mut self, target_seconds: f64, notifier: SeekNotifier);

    /// Render the currently displayed picture into `surface`, covering it
    /// entirely.
    fn draw(&mut self, surface: &mut DecodeSurface) -> Result<(), ScrubberError>;
}

impl<S: PlaybackSource + ?Sized> PlaybackSource for &mut S {
    fn ready_state(&self) -> ReadyState {
        (**self).ready_state()
    }

    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn seek(&mut self, target_seconds: f64, notifier: SeekNotifier) {
        (**self).seek(target_seconds, notifier)
    }

    fn draw(&mut self, surface: &mut DecodeSurface) -> Result<(), ScrubberError> {
        (**self).draw(surface)
    }
}

/// Check the extraction preconditions on a source's metadata.
///
/// Returns the validated duration.
pub(crate) fn validate_source<S: PlaybackSource + ?Sized>(source: &S) -> Result<f64, ScrubberError> {
    let state = source.ready_state();
    if state < ReadyState::HaveMetadata {
        return Err(ScrubberError::InvalidSource(format!(
            "metadata not loaded (ready state {state:?})"
        )));
    }

    let duration = source.duration();
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ScrubberError::InvalidSource(format!(
            "duration is invalid ({duration})"
        )));
    }

    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(ScrubberError::InvalidSource(format!(
            "intrinsic size is {width}x{height}"
        )));
    }

    Ok(duration)
}
