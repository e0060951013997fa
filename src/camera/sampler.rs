//! Still-image sampling from the live camera.
//!
//! [`FrameSampler::capture`] reads whatever frame the stream holds right now
//! and encodes it as JPEG.  There is no buffering: two captures between
//! device frames return the same picture, and frames that arrived in between
//! are simply never seen.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageResult, RgbImage};

use crate::config::CameraConfig;

use super::CameraResource;

// ---------------------------------------------------------------------------
// ImageBlob
// ---------------------------------------------------------------------------

/// An encoded still image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

impl ImageBlob {
    /// `data:<mime>;base64,<payload>` form accepted by vision chat models.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

// ---------------------------------------------------------------------------
// FrameSampler
// ---------------------------------------------------------------------------

/// Encodes the camera's current frame on demand.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    jpeg_quality: u8,
    max_width: u32,
}

impl FrameSampler {
    /// `jpeg_quality` is clamped to 1–100; `max_width == 0` disables
    /// downscaling.
    pub fn new(jpeg_quality: u8, max_width: u32) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            max_width,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.jpeg_quality, config.max_width)
    }

    /// Encode the latest frame.
    ///
    /// Returns `None` when the camera is inactive, has not delivered a frame
    /// yet, or the frame fails to encode.
    pub fn capture(&self, camera: &CameraResource) -> Option<ImageBlob> {
        if !camera.is_active() {
            return None;
        }
        let frame = camera.latest_frame()?;
        match self.encode(&frame) {
            Ok(blob) => Some(blob),
            Err(e) => {
                log::warn!("camera: failed to encode frame: {e}");
                None
            }
        }
    }

    /// Downscale (if needed) and JPEG-encode `frame`.
    pub fn encode(&self, frame: &RgbImage) -> ImageResult<ImageBlob> {
        let scaled;
        let frame = if self.max_width > 0 && frame.width() > self.max_width {
            let height = (u64::from(frame.height()) * u64::from(self.max_width)
                / u64::from(frame.width()))
            .max(1) as u32;
            scaled = image::imageops::resize(frame, self.max_width, height, FilterType::Triangle);
            &scaled
        } else {
            frame
        };

        let mut bytes = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, self.jpeg_quality);
            encoder.encode_image(frame)?;
        }

        Ok(ImageBlob {
            bytes,
            mime: "image/jpeg",
            width: frame.width(),
            height: frame.height(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
