//! Capture domain: public API.
//!
//! A camera is a pass-through to whatever device layer the host offers.
//! This module only fixes the interface the scan flow consumes:
//! open a stream, grab one still frame, stop the stream.

mod still;

pub use still::StillImageCamera;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    /// Rear camera on phones.
    #[default]
    Environment,
}

/// What the scan flow asks of the camera.
///
/// `ideal_*` are preferences a device may ignore; `min_*` are hard limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
            min_width: None,
            min_height: None,
        }
    }
}

impl CaptureConstraints {
    pub fn is_satisfied_by(&self, width: u32, height: u32) -> bool {
        self.min_width.map_or(true, |w| width >= w) && self.min_height.map_or(true, |h| height >= h)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Camera API is not supported on this device.")]
    Unsupported,
    #[error("Please grant camera permissions.")]
    PermissionDenied,
    #[error("No camera found on this device.")]
    NotFound,
    #[error("Camera is being used by another application.")]
    DeviceBusy,
    #[error("Camera does not support the required settings.")]
    ConstraintUnsatisfiable,
    #[error("Error capturing image: {0}")]
    Capture(String),
}

/// A live camera stream. Holding one keeps the device locked.
pub trait CameraStream: Send {
    fn capture_frame(&mut self) -> Result<DynamicImage, CameraError>;

    /// Stop every track and release the device. Must be idempotent.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

pub trait CameraProvider: Send + Sync {
    fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// Owns an open stream and stops it when released or dropped.
pub struct StreamGuard {
    stream: Option<Box<dyn CameraStream>>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn capture_frame(&mut self) -> Result<DynamicImage, CameraError> {
        match self.stream.as_mut() {
            Some(stream) => stream.capture_frame(),
            None => Err(CameraError::Capture("camera stream already released".into())),
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::info!("[CAPTURE] Camera stream released");
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}
