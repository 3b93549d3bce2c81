//! A scripted `PlaybackSource` shared by the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use scrubber::{DecodeSurface, PlaybackSource, ReadyState, ScrubberError, SeekNotifier};
use tokio::time::Instant;

/// What the mock does with a seek request.
#[derive(Debug, Clone)]
pub enum SeekBehavior {
    /// Fire `settled` synchronously.
    Settle,
    /// Fire `settled` from a spawned task after the given delay.
    SettleAfter(Duration),
    /// Fire `error` with the given reason.
    Error(&'static str),
    /// Drop the notifier without firing it.
    Drop,
    /// Keep the notifier alive and never fire it.
    Stall,
}

#[derive(Debug)]
pub struct MockSource {
    pub ready_state: ReadyState,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub position: f64,
    pub paused: bool,
    pub seeks: Vec<f64>,
    pub draws: usize,
    /// Behavior for every seek from `fail_from` onwards (all seeks if `None`).
    pub behavior: SeekBehavior,
    pub fail_from: Option<usize>,
    pub draw_fails_at: Option<usize>,
    pub stalled: Vec<SeekNotifier>,
    /// When each synchronous `settled` fired, in seek order.
    pub settled_at: Vec<Instant>,
    /// When each `draw` was called, in call order.
    pub drawn_at: Vec<Instant>,
}

impl MockSource {
    pub fn new(duration: f64) -> Self {
        Self {
            ready_state: ReadyState::HaveEnoughData,
            duration,
            width: 8,
            height: 6,
            position: 0.0,
            paused: false,
            seeks: Vec::new(),
            draws: 0,
            behavior: SeekBehavior::Settle,
            fail_from: None,
            draw_fails_at: None,
            stalled: Vec::new(),
            settled_at: Vec::new(),
            drawn_at: Vec::new(),
        }
    }

    /// Apply `behavior` to every seek.
    pub fn with_behavior(mut self, behavior: SeekBehavior) -> Self {
        self.behavior = behavior;
        self.fail_from = None;
        self
    }

    /// Settle normally for the first `ordinal` seeks, then apply `behavior`.
    pub fn failing_from(mut self, ordinal: usize, behavior: SeekBehavior) -> Self {
        self.behavior = behavior;
        self.fail_from = Some(ordinal);
        self
    }

    fn behavior_for(&self, ordinal: usize) -> SeekBehavior {
        match self.fail_from {
            Some(from) if ordinal < from => SeekBehavior::Settle,
            _ => self.behavior.clone(),
        }
    }
}

impl PlaybackSource for MockSource {
    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn seek(&mut self, target_seconds: f64, notifier: SeekNotifier) {
        let ordinal = self.seeks.len();
        self.seeks.push(target_seconds);
        self.position = target_seconds;

        match self.behavior_for(ordinal) {
            SeekBehavior::Settle => {
                self.settled_at.push(Instant::now());
                notifier.settled();
            }
            SeekBehavior::SettleAfter(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    notifier.settled();
                });
            }
            SeekBehavior::Error(reason) => notifier.error(reason),
            SeekBehavior::Drop => drop(notifier),
            SeekBehavior::Stall => self.stalled.push(notifier),
        }
    }

    fn draw(&mut self, surface: &mut DecodeSurface) -> Result<(), ScrubberError> {
        let ordinal = self.draws;
        self.draws += 1;
        self.drawn_at.push(Instant::now());
        if self.draw_fails_at == Some(ordinal) {
            return Err(ScrubberError::InvalidSource("surface lost".to_string()));
        }
        let shade = (ordinal * 20 % 256) as u8;
        for pixel in surface.pixels_mut().chunks_exact_mut(4) {
            pixel.copy_from_slice(&[shade, shade, shade, 255]);
        }
        Ok(())
    }
}
