//! # scrubber
//!
//! Scrub through a video by opening and closing your hand.
//!
//! `scrubber` turns a streaming, seek-only playback primitive into a
//! random-access array of decoded stills, then maps a smoothed hand-openness
//! signal onto that array. Extraction serializes the seek → settle → render
//! tick → capture → encode cycle into a strictly sequential batch job, with a
//! bounded timeout per seek so a stalled source can never hang the run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scrubber::{ExtractionRequest, ImageSequenceSource, ScrubSession, ScrubberError};
//!
//! # async fn example() -> Result<(), ScrubberError> {
//! let mut source = ImageSequenceSource::from_directory("frames/", 30.0)?;
//!
//! let mut session = ScrubSession::new();
//! session.load(&mut source, &ExtractionRequest::new(90)).await?;
//!
//! // Feed the openness reported by a hand-landmark detector each tick.
//! let index = session.update_openness(0.6);
//! println!("showing frame {index:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Pieces
//!
//! - [`PlaybackSource`]: the seekable input. [`ImageSequenceSource`] ships
//!   in the crate; `VideoFileSource` decodes real video with the `ffmpeg`
//!   feature.
//! - [`SeekCycle`]: one seek-and-capture pass with exactly-once completion.
//! - [`FrameBatchExtractor`]: runs cycles across the duration, reports
//!   progress, honours a [`CancellationToken`].
//! - [`FrameStore`]: the ordered result, indexed by normalized progress.
//! - [`GestureToIndexMapper`]: exponential smoothing from openness to index.
//! - [`ScrubSession`]: explicit per-session state plus a [`FrameSink`] output.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | `VideoFileSource`, a `PlaybackSource` over video files via FFmpeg |

pub mod config;
pub mod error;
pub mod extractor;
pub mod gesture;
pub mod progress;
pub mod seek;
pub mod sequence;
pub mod session;
pub mod source;
pub mod store;
pub mod surface;
#[cfg(feature = "ffmpeg")]
pub mod video_source;

pub use config::{
    DEFAULT_ENCODE_QUALITY, DEFAULT_FRAME_COUNT, DEFAULT_INTER_FRAME_DELAY_MS,
    DEFAULT_SMOOTHING_FACTOR, EncodeOptions, ExtractionOptions, ExtractionRequest,
    SessionSettings,
};
pub use error::ScrubberError;
pub use extractor::{FrameBatchExtractor, SINGLE_FRAME_TARGET, target_schedule};
pub use gesture::{GestureToIndexMapper, HAND_LANDMARK_COUNT, Landmark, hand_openness};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use seek::{CycleState, SEEK_END_EPSILON, SeekCycle, clamp_seek_target, seek_and_capture};
pub use sequence::ImageSequenceSource;
pub use session::{FrameSink, ScrubSession};
pub use source::{PlaybackSource, ReadyState, SeekEvent, SeekNotifier};
pub use store::{ExtractedFrame, FrameStore};
pub use surface::DecodeSurface;
#[cfg(feature = "ffmpeg")]
pub use video_source::VideoFileSource;
