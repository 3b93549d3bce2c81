//! A [`PlaybackSource`] over a timeline of still images.
//!
//! [`ImageSequenceSource`] presents an ordered list of images as a clip
//! playing at a fixed rate. Seeking selects the image on screen at the
//! requested time and settles immediately. It is useful for animation
//! timelines, pre-rendered image sequences, and for exercising extraction
//! without a video decoder.

use std::path::Path;

use image::DynamicImage;

use crate::error::ScrubberError;
use crate::source::{PlaybackSource, ReadyState, SeekNotifier};
use crate::surface::DecodeSurface;

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A fixed-rate timeline of still images.
///
/// # Example
///
/// ```
/// use image::DynamicImage;
/// use scrubber::{ImageSequenceSource, PlaybackSource};
///
/// let images = vec![DynamicImage::new_rgb8(4, 4); 10];
/// let source = ImageSequenceSource::from_images(images, 5.0)?;
/// assert_eq!(source.duration(), 2.0);
/// assert_eq!(source.dimensions(), (4, 4));
/// # Ok::<(), scrubber::ScrubberError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    images: Vec<DynamicImage>,
    frames_per_second: f64,
    position: f64,
    paused: bool,
}

impl ImageSequenceSource {
    /// Build a timeline from in-memory images shown `frames_per_second`
    /// times per second.
    ///
    /// # Errors
    ///
    /// [`ScrubberError::InvalidSource`] if `images` is empty or the rate is
    /// not finite and positive.
    pub fn from_images(
        images: Vec<DynamicImage>,
        frames_per_second: f64,
    ) -> Result<Self, ScrubberError> {
        if images.is_empty() {
            return Err(ScrubberError::InvalidSource(
                "image sequence is empty".to_string(),
            ));
        }
        if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
            return Err(ScrubberError::InvalidSource(format!(
                "frame rate is invalid ({frames_per_second})"
            )));
        }

        Ok(Self {
            images,
            frames_per_second,
            position: 0.0,
            paused: false,
        })
    }

    /// Load every PNG, JPEG and BMP file in `directory`, ordered by file
    /// name.
    ///
    /// # Errors
    ///
    /// I/O and image decode errors, or [`ScrubberError::InvalidSource`] if
    /// no image files were found.
    pub fn from_directory<P: AsRef<Path>>(
        directory: P,
        frames_per_second: f64,
    ) -> Result<Self, ScrubberError> {
        let directory = directory.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            let supported = path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| {
                    SUPPORTED_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
                });
            if path.is_file() && supported {
                paths.push(path);
            }
        }
        paths.sort();

        log::debug!(
            "Loading {} image(s) from {}",
            paths.len(),
            directory.display()
        );

        let images = paths
            .iter()
            .map(image::open)
            .collect::<Result<Vec<_>, _>>()?;

        if images.is_empty() {
            return Err(ScrubberError::InvalidSource(format!(
                "no images found in {}",
                directory.display()
            )));
        }
        Self::from_images(images, frames_per_second)
    }

    /// Number of images in the timeline.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Index of the image shown at the current position.
    pub fn current_index(&self) -> usize {
        let index = (self.position * self.frames_per_second).floor() as usize;
        index.min(self.images.len() - 1)
    }
}

impl PlaybackSource for ImageSequenceSource {
    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveEnoughData
    }

    fn duration(&self) -> f64 {
        self.images.len() as f64 / self.frames_per_second
    }

    fn dimensions(&self) -> (u32, u32) {
        self.images
            .first()
            .map(|image| (image.width(), image.height()))
            .unwrap_or((0, 0))
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn seek(&mut self, target_seconds: f64, notifier: SeekNotifier) {
        if !target_seconds.is_finite() {
            notifier.error(format!("cannot seek to {target_seconds}"));
            return;
        }
        self.position = target_seconds.clamp(0.0, self.duration());
        notifier.settled();
    }

    fn draw(&mut self, surface: &mut DecodeSurface) -> Result<(), ScrubberError> {
        let image = &self.images[self.current_index()];
        surface.draw_image(image);
        Ok(())
    }
}
