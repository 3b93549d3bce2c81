//! An FFmpeg-backed [`PlaybackSource`] for video files.
//!
//! [`VideoFileSource`] opens a file with `ffmpeg-next`, reports the container
//! duration and the decoder's intrinsic size, and implements seeking by
//! jumping to the keyframe before the target and decoding forward to the
//! first frame at or after it. The decoded picture is converted to RGBA with
//! the software scaler and kept as the "currently displayed" frame until the
//! next seek.
//!
//! Requires the `ffmpeg` feature and the FFmpeg development libraries.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbaImage};

use crate::error::ScrubberError;
use crate::source::{PlaybackSource, ReadyState, SeekNotifier};
use crate::surface::DecodeSurface;

/// A video file opened for frame-by-frame seeking.
pub struct VideoFileSource {
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    duration: f64,
    width: u32,
    height: u32,
    position: f64,
    current: Option<RgbaImage>,
    path: PathBuf,
}

impl VideoFileSource {
    /// Open `path` and prepare a decoder for its best video stream.
    ///
    /// # Errors
    ///
    /// [`ScrubberError::InvalidSource`] if the file cannot be opened or has
    /// no video stream, or [`ScrubberError::FfmpegError`] if the decoder or
    /// scaler cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ScrubberError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video source: {}", path.display());

        ffmpeg_next::init().map_err(|error| {
            ScrubberError::InvalidSource(format!("FFmpeg initialisation failed: {error}"))
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| {
            ScrubberError::InvalidSource(format!("failed to open {}: {error}", path.display()))
        })?;

        let (stream_index, time_base, parameters) = {
            let stream = input.streams().best(Type::Video).ok_or_else(|| {
                ScrubberError::InvalidSource(format!("no video stream in {}", path.display()))
            })?;
            (stream.index(), stream.time_base(), stream.parameters())
        };

        let decoder = CodecContext::from_parameters(parameters)?.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGBA,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        // Container duration is in AV_TIME_BASE units (microseconds).
        let duration = match input.duration() {
            micros if micros > 0 => micros as f64 / 1_000_000.0,
            _ => f64::NAN,
        };

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            duration,
            width,
            height,
            position: 0.0,
            current: None,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn pts_to_seconds(&self, pts: i64) -> f64 {
        pts as f64 * self.time_base.numerator() as f64 / self.time_base.denominator() as f64
    }

    /// Seek and decode forward until the frame on screen at `target` is
    /// current.
    fn decode_to(&mut self, target: f64) -> Result<(), ScrubberError> {
        let seek_timestamp = (target * 1_000_000.0) as i64;
        self.input.seek(seek_timestamp, ..seek_timestamp)?;
        self.decoder.flush();

        let mut decoded = VideoFrame::empty();
        let mut fallback: Option<(VideoFrame, f64)> = None;
        let mut eof_sent = false;

        loop {
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.timestamp().or_else(|| decoded.pts()).unwrap_or(0);
                let seconds = self.pts_to_seconds(pts);
                if seconds + 1e-6 >= target {
                    return self.present(&decoded, seconds);
                }
                let frame = std::mem::replace(&mut decoded, VideoFrame::empty());
                fallback = Some((frame, seconds));
            }

            if eof_sent {
                // Target lies past the last decodable frame: show the last one.
                return match fallback {
                    Some((frame, seconds)) => self.present(&frame, seconds),
                    None => Err(ScrubberError::FfmpegError(format!(
                        "no frame decoded at or before {target:.3}s"
                    ))),
                };
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    eof_sent = true;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn present(&mut self, frame: &VideoFrame, seconds: f64) -> Result<(), ScrubberError> {
        let mut rgba = VideoFrame::empty();
        self.scaler.run(frame, &mut rgba)?;

        let buffer = frame_to_buffer(&rgba, self.width, self.height, 4);
        let image = RgbaImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            ScrubberError::FfmpegError("decoded frame has an unexpected size".to_string())
        })?;

        self.current = Some(image);
        self.position = seconds;
        Ok(())
    }
}

impl PlaybackSource for VideoFileSource {
    fn ready_state(&self) -> ReadyState {
        if self.current.is_some() {
            ReadyState::HaveCurrentData
        } else {
            ReadyState::HaveMetadata
        }
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

    // The file never plays on its own; the playhead only moves on seek.
    fn pause(&mut self) {}

    fn seek(&mut self, target_seconds: f64, notifier: SeekNotifier) {
        match self.decode_to(target_seconds) {
            Ok(()) => notifier.settled(),
            Err(error) => notifier.error(error.to_string()),
        }
    }

    fn draw(&mut self, surface: &mut DecodeSurface) -> Result<(), ScrubberError> {
        let current = self.current.as_ref().ok_or_else(|| {
            ScrubberError::FfmpegError("no frame has been decoded yet".to_string())
        })?;

        if surface.dimensions() == current.dimensions() {
            surface.pixels_mut().copy_from_slice(current.as_raw());
        } else {
            surface.draw_image(&DynamicImage::ImageRgba8(current.clone()));
        }
        Ok(())
    }
}

/// Copy plane 0 of a packed frame into a tightly packed buffer, dropping any
/// per-row padding.
fn frame_to_buffer(frame: &VideoFrame, width: u32, height: u32, bytes_per_pixel: usize) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * bytes_per_pixel;
    let data = frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    }
}
