//! Camera frames and the pixel-decoding seam.
//!
//! The telemetry wire carries base64 image payloads. What the bytes encode
//! is the simulator's business: the bridge hands them to an injected
//! [`FrameDecoder`] and stores whatever comes back. The shipped
//! [`RawFrameDecoder`] covers simulators that stream raw interleaved pixels;
//! compressed formats plug in behind the same trait.

use crate::config::CameraConfig;
use crate::error::{Error, Result};

/// One decoded camera frame: interleaved pixel rows, row-major
#[derive(Clone, Debug, PartialEq)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// Create a frame, validating the buffer length against the dimensions
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(Error::MalformedTelemetry(format!(
                "frame buffer holds {} bytes, expected {} for {}x{}x{}",
                data.len(),
                expected,
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }
}

/// Turns a raw image payload into pixel data
pub trait FrameDecoder: Send + Sync {
    /// Decode one payload; failures drop the message, never the episode
    fn decode(&self, bytes: &[u8]) -> Result<CameraFrame>;
}

/// Decoder for simulators that send raw interleaved pixels at a fixed size
pub struct RawFrameDecoder {
    camera: CameraConfig,
}

impl RawFrameDecoder {
    /// Create a decoder expecting frames of the configured dimensions
    pub fn new(camera: CameraConfig) -> Self {
        Self { camera }
    }
}

impl FrameDecoder for RawFrameDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<CameraFrame> {
        CameraFrame::new(
            self.camera.width,
            self.camera.height,
            self.camera.channels,
            bytes.to_vec(),
        )
    }
}
