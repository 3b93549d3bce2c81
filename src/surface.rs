//! The decode surface: a fixed-resolution raster that playback sources draw
//! into before each capture is encoded.

use std::io::Cursor;

use image::{
    DynamicImage, ImageFormat, RgbaImage,
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
};

use crate::error::ScrubberError;

/// A fixed-size RGBA raster shared by every seek cycle of one extraction run.
///
/// The surface is sized once, to the source's intrinsic resolution, before
/// the first cycle runs. Sources render into it with
/// [`draw_image`](DecodeSurface::draw_image) or by writing
/// [`pixels_mut`](DecodeSurface::pixels_mut) directly.
#[derive(Debug, Clone)]
pub struct DecodeSurface {
    raster: RgbaImage,
}

impl DecodeSurface {
    /// Create a transparent-black surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            raster: RgbaImage::new(width, height),
        }
    }

    /// Surface size as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Draw `image` to cover the whole surface, scaling it if its size
    /// differs from the surface.
    pub fn draw_image(&mut self, image: &DynamicImage) {
        let (width, height) = self.dimensions();
        if image.width() == width && image.height() == height {
            self.raster = image.to_rgba8();
        } else {
            self.raster = imageops::resize(&image.to_rgba8(), width, height, FilterType::Triangle);
        }
    }

    /// Raw RGBA bytes, row-major with no padding.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.raster
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.raster
    }

    /// Copy the current pixels out, for encoding off the surface.
    pub(crate) fn snapshot(&self) -> RgbaImage {
        self.raster.clone()
    }
}

/// Encode an RGBA raster to JPEG at `quality` (1-100).
///
/// JPEG has no alpha channel, so the raster is flattened to RGB first.
pub(crate) fn encode_jpeg(raster: &RgbaImage, quality: u8) -> Result<Vec<u8>, ScrubberError> {
    let rgb = DynamicImage::ImageRgba8(raster.clone()).to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|error| ScrubberError::EncodeFailure(error.to_string()))?;
    Ok(encoded)
}

/// Decode an encoded JPEG back into an image handle.
pub(crate) fn decode_jpeg(bytes: &[u8]) -> Result<DynamicImage, ScrubberError> {
    image::load(Cursor::new(bytes), ImageFormat::Jpeg)
        .map_err(|error| ScrubberError::EncodeFailure(format!("encoded frame is unreadable: {error}")))
}
