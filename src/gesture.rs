//! Mapping a hand-openness signal onto stored frames.
//!
//! [`GestureToIndexMapper`] exponentially smooths a raw openness value in
//! `[0, 1]` and uses the smoothed value as progress into a [`FrameStore`].
//! The smoothing state lives in the mapper, so each session owns its own.
//!
//! [`hand_openness`] derives the raw value from the 21 keypoints a hand
//! landmark detector produces.

use crate::config::DEFAULT_SMOOTHING_FACTOR;
use crate::store::{ExtractedFrame, FrameStore};

/// Number of keypoints in one detected hand.
pub const HAND_LANDMARK_COUNT: usize = 21;

const WRIST: usize = 0;
const MIDDLE_MCP: usize = 9;
const MIDDLE_TIP: usize = 12;

/// One normalized 3D hand keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn distance(&self, other: &Landmark) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }
}

/// How open a hand is, from 0 (middle fingertip folded to the middle of the
/// palm) to 1 (fingertip as far from its knuckle as the wrist is).
///
/// Returns `None` if fewer than [`HAND_LANDMARK_COUNT`] landmarks are given or
/// the palm is too short to measure, in which case the caller should keep its
/// previous value.
pub fn hand_openness(landmarks: &[Landmark]) -> Option<f32> {
    if landmarks.len() < HAND_LANDMARK_COUNT {
        return None;
    }

    let wrist = &landmarks[WRIST];
    let knuckle = &landmarks[MIDDLE_MCP];
    let tip = &landmarks[MIDDLE_TIP];

    let palm_length = wrist.distance(knuckle);
    let half_palm = wrist.midpoint(knuckle).distance(knuckle);
    let extension = tip.distance(knuckle);

    let span = palm_length - half_palm;
    if span < 0.001 {
        return None;
    }

    Some(((extension - half_palm) / span).clamp(0.0, 1.0))
}

/// Exponentially smoothed openness → frame selection.
///
/// `smoothed = previous * (1 - α) + raw * α`, starting from 0.
///
/// ```
/// use scrubber::GestureToIndexMapper;
///
/// let mut mapper = GestureToIndexMapper::new(0.5);
/// assert_eq!(mapper.smooth(1.0), 0.5);
/// assert_eq!(mapper.smooth(1.0), 0.75);
/// mapper.reset();
/// assert_eq!(mapper.smoothed(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GestureToIndexMapper {
    alpha: f32,
    smoothed: f32,
}

impl Default for GestureToIndexMapper {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_FACTOR)
    }
}

impl GestureToIndexMapper {
    /// Create a mapper with smoothing factor `alpha`, clamped to `[0, 1]`.
    ///
    /// `1.0` disables smoothing; `0.0` freezes the output at its start value.
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_nan() {
            DEFAULT_SMOOTHING_FACTOR
        } else {
            alpha.clamp(0.0, 1.0)
        };
        Self {
            alpha,
            smoothed: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// The current smoothed openness.
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Fold a raw reading into the smoothed value and return it.
    ///
    /// The reading is clamped to `[0, 1]`; `NaN` readings are ignored.
    pub fn smooth(&mut self, raw: f32) -> f32 {
        if !raw.is_nan() {
            let raw = raw.clamp(0.0, 1.0);
            self.smoothed = self.smoothed * (1.0 - self.alpha) + raw * self.alpha;
        }
        self.smoothed
    }

    /// Smooth `raw` and return the index it selects in `store`.
    pub fn select_index(&mut self, raw: f32, store: &FrameStore) -> Option<usize> {
        let progress = self.smooth(raw);
        store.index_at_progress(f64::from(progress))
    }

    /// Smooth `raw` and return the frame it selects in `store`.
    pub fn select<'a>(&mut self, raw: f32, store: &'a FrameStore) -> Option<&'a ExtractedFrame> {
        self.select_index(raw, store)
            .and_then(|index| store.get(index))
    }

    /// Return to the initial smoothed value of 0.
    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}
