//! Extracted frames and the ordered store that holds them.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::ScrubberError;

struct FrameData {
    index: usize,
    target_seconds: f64,
    position_seconds: f64,
    image: DynamicImage,
    encoded: Vec<u8>,
}

/// An immutable decoded still captured from a playback source.
///
/// Cloning is cheap: clones share the same pixels.
#[derive(Clone)]
pub struct ExtractedFrame {
    inner: Arc<FrameData>,
}

impl ExtractedFrame {
    pub(crate) fn new(
        index: usize,
        target_seconds: f64,
        position_seconds: f64,
        image: DynamicImage,
        encoded: Vec<u8>,
    ) -> Self {
        Self {
            inner: Arc::new(FrameData {
                index,
                target_seconds,
                position_seconds,
                image,
                encoded,
            }),
        }
    }

    /// Zero-based ordinal in the sequence. Insertion order is temporal order.
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// The seek target the frame was captured for, after clamping.
    pub fn target_seconds(&self) -> f64 {
        self.inner.target_seconds
    }

    /// The playhead position the source reported when the seek settled.
    pub fn position_seconds(&self) -> f64 {
        self.inner.position_seconds
    }

    /// The decoded still.
    pub fn image(&self) -> &DynamicImage {
        &self.inner.image
    }

    /// The still as encoded JPEG bytes.
    pub fn encoded(&self) -> &[u8] {
        &self.inner.encoded
    }

    /// `(width, height)` of the still.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.image.width(), self.inner.image.height())
    }

    /// Write the encoded JPEG bytes to `path` unchanged.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ScrubberError> {
        std::fs::write(path, &self.inner.encoded)?;
        Ok(())
    }

    /// Returns `true` if both handles refer to the same captured still.
    pub fn ptr_eq(&self, other: &ExtractedFrame) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for ExtractedFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractedFrame")
            .field("index", &self.inner.index)
            .field("target_seconds", &self.inner.target_seconds)
            .field("position_seconds", &self.inner.position_seconds)
            .field("dimensions", &self.dimensions())
            .field("encoded_len", &self.inner.encoded.len())
            .finish()
    }
}

/// The ordered sequence of frames produced by one extraction run.
///
/// A store is replaced wholesale by each new extraction and cleared on
/// session reset; frames from different runs are never merged.
///
/// # Example
///
/// ```no_run
/// use scrubber::FrameStore;
///
/// # fn show(store: &FrameStore) {
/// if let Some(frame) = store.frame_at_progress(0.5) {
///     println!("middle frame is #{}", frame.index());
/// }
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    frames: Vec<ExtractedFrame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Append the next frame.
    ///
    /// # Errors
    ///
    /// [`ScrubberError::FrameOutOfOrder`] if the frame's ordinal is not equal
    /// to the current length.
    pub fn append(&mut self, frame: ExtractedFrame) -> Result<(), ScrubberError> {
        let expected = self.frames.len();
        if frame.index() != expected {
            return Err(ScrubberError::FrameOutOfOrder {
                expected,
                found: frame.index(),
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Drop every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExtractedFrame> {
        self.frames.get(index)
    }

    pub fn first(&self) -> Option<&ExtractedFrame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&ExtractedFrame> {
        self.frames.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractedFrame> {
        self.frames.iter()
    }

    /// Map a normalized progress value to a frame index.
    ///
    /// `progress` is clamped to `[0, 1]` (`NaN` counts as 0) and mapped to
    /// `floor(progress * (len - 1))`. This rounds down, so only exactly 1.0
    /// reaches the last frame. Returns `None` when the store is empty.
    pub fn index_at_progress(&self, progress: f64) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let last = self.frames.len() - 1;
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let index = (progress * last as f64).floor() as usize;
        Some(index.min(last))
    }

    /// The frame selected by a normalized progress value.
    ///
    /// See [`index_at_progress`](FrameStore::index_at_progress).
    pub fn frame_at_progress(&self, progress: f64) -> Option<&ExtractedFrame> {
        self.index_at_progress(progress)
            .and_then(|index| self.frames.get(index))
    }

    /// Write every frame to `directory` as `frame_{index:06}.jpg`.
    ///
    /// Creates the directory if needed. Returns the number of files written.
    pub fn save_all<P: AsRef<Path>>(&self, directory: P) -> Result<usize, ScrubberError> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;
        for frame in &self.frames {
            frame.save(directory.join(format!("frame_{:06}.jpg", frame.index())))?;
        }
        log::debug!("Saved {} frame(s) to {}", self.frames.len(), directory.display());
        Ok(self.frames.len())
    }
}

impl<'a> IntoIterator for &'a FrameStore {
    type Item = &'a ExtractedFrame;
    type IntoIter = std::slice::Iter<'a, ExtractedFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use image::DynamicImage;

    use super::{ExtractedFrame, FrameStore};
    use crate::error::ScrubberError;

    fn frame(index: usize) -> ExtractedFrame {
        ExtractedFrame::new(index, index as f64, index as f64, DynamicImage::new_rgb8(1, 1), Vec::new())
    }

    fn store_of(count: usize) -> FrameStore {
        let mut store = FrameStore::new();
        for index in 0..count {
            store.append(frame(index)).unwrap();
        }
        store
    }

    #[test]
    fn empty_store_has_no_frame() {
        let store = FrameStore::new();
        for progress in [0.0, 0.5, 1.0, -3.0, f64::NAN] {
            assert!(store.frame_at_progress(progress).is_none());
        }
    }

    #[test]
    fn endpoints_map_to_first_and_last() {
        let store = store_of(10);
        assert_eq!(store.index_at_progress(0.0), Some(0));
        assert_eq!(store.index_at_progress(1.0), Some(9));
    }

    #[test]
    fn mapping_rounds_down() {
        let store = store_of(10);
        // 0.99 * 9 = 8.91
        assert_eq!(store.index_at_progress(0.99), Some(8));
        // 0.5 * 9 = 4.5
        assert_eq!(store.index_at_progress(0.5), Some(4));
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let store = store_of(4);
        assert_eq!(store.index_at_progress(-0.5), Some(0));
        assert_eq!(store.index_at_progress(7.0), Some(3));
        assert_eq!(store.index_at_progress(f64::NAN), Some(0));
    }

    #[test]
    fn mapping_is_monotonic() {
        let store = store_of(90);
        let mut previous = 0;
        for step in 0..=1000 {
            let index = store.index_at_progress(step as f64 / 1000.0).unwrap();
            assert!(index >= previous);
            previous = index;
        }
        assert_eq!(previous, 89);
    }

    #[test]
    fn single_frame_store_always_returns_it() {
        let store = store_of(1);
        assert_eq!(store.index_at_progress(0.0), Some(0));
        assert_eq!(store.index_at_progress(1.0), Some(0));
    }

    #[test]
    fn append_rejects_out_of_order_frames() {
        let mut store = store_of(2);
        let error = store.append(frame(5)).unwrap_err();
        assert!(matches!(
            error,
            ScrubberError::FrameOutOfOrder {
                expected: 2,
                found: 5
            }
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clear_empties_store() {
        let mut store = store_of(3);
        store.clear();
        store.clear();
        assert!(store.is_empty());
        assert!(store.append(frame(0)).is_ok());
    }
}
