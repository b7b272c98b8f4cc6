//! Still-image camera: serves a single image file as the camera feed.
//!
//! Used on hosts without a capture device layer, and by the CLI's
//! `--image` flag. Only one stream may be open at a time, like a real
//! device lock.

use super::{CameraError, CameraProvider, CameraStream, CaptureConstraints};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct StillImageCamera {
    path: PathBuf,
    in_use: Arc<AtomicBool>,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_frame(&self) -> Result<DynamicImage, CameraError> {
        let bytes = std::fs::read(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CameraError::NotFound,
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            _ => CameraError::Capture(format!("{}: {}", self.path.display(), e)),
        })?;
        image::load_from_memory(&bytes)
            .map_err(|e| CameraError::Capture(format!("{}: {}", self.path.display(), e)))
    }
}

impl CameraProvider for StillImageCamera {
    fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        if self.in_use.load(Ordering::SeqCst) {
            return Err(CameraError::DeviceBusy);
        }

        let frame = self.load_frame()?;
        let (w, h) = (frame.width(), frame.height());
        if !constraints.is_satisfied_by(w, h) {
            log::warn!(
                "[CAPTURE] {}x{} frame below minimum {:?}x{:?}",
                w,
                h,
                constraints.min_width,
                constraints.min_height
            );
            return Err(CameraError::ConstraintUnsatisfiable);
        }
        if (w, h) != (constraints.ideal_width, constraints.ideal_height) {
            log::debug!(
                "[CAPTURE] Frame is {}x{}, ideal was {}x{}",
                w,
                h,
                constraints.ideal_width,
                constraints.ideal_height
            );
        }

        if self
            .in_use
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CameraError::DeviceBusy);
        }

        log::info!(
            "[CAPTURE] Stream opened on {} ({}x{}, facing {:?})",
            self.path.display(),
            w,
            h,
            constraints.facing_mode
        );
        Ok(Box::new(StillStream {
            frame,
            in_use: Arc::clone(&self.in_use),
            active: true,
        }))
    }
}

struct StillStream {
    frame: DynamicImage,
    in_use: Arc<AtomicBool>,
    active: bool,
}

impl CameraStream for StillStream {
    fn capture_frame(&mut self) -> Result<DynamicImage, CameraError> {
        if !self.active {
            return Err(CameraError::Capture("stream stopped".into()));
        }
        Ok(self.frame.clone())
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.in_use.store(false, Ordering::SeqCst);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for StillStream {
    fn drop(&mut self) {
        self.stop();
    }
}
