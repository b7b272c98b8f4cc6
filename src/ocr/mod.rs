//! OCR domain: turns a captured frame into raw text.
//!
//! The engine itself is a pass-through to an external recognizer behind
//! the [`OcrEngine`] trait. External code should only use the items
//! exported here; field extraction lives in [`heuristics`].

pub mod heuristics;
mod tesseract;

pub use tesseract::TesseractEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Progress reported once the engine is loaded and ready.
pub const PROGRESS_ENGINE_READY: u8 = 30;
/// Coarse progress ticks stop here until recognition returns.
pub const PROGRESS_TICK_CAP: u8 = 80;
/// Progress reported once text is returned, before extraction.
pub const PROGRESS_TEXT_READY: u8 = 90;
pub const PROGRESS_DONE: u8 = 100;
const PROGRESS_TICK: u8 = 5;
pub const PROGRESS_TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Recognizer settings, persisted as part of the app config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OcrSettings {
    /// Tesseract language code, e.g. `eng`.
    pub language: String,
    /// Page segmentation mode.
    pub psm: Option<i32>,
    pub dpi: Option<i32>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            psm: Some(3),
            dpi: Some(150),
        }
    }
}

/// Result of OCR processing.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub char_count: usize,
    pub latency_ms: u128,
}

impl OcrOutput {
    pub fn new(text: String, latency_ms: u128) -> Self {
        let char_count = text.chars().count();
        Self {
            text,
            char_count,
            latency_ms,
        }
    }
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("Failed to prepare image for OCR: {0}")]
    InvalidImage(String),
    #[error("Text recognition failed: {0}")]
    Recognition(String),
}

/// A text recognizer. Implementations block; callers run them off the
/// event loop.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Load models or check the backend is installed.
    fn warm_up(&self) -> Result<(), OcrError> {
        Ok(())
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError>;
}

/// Next coarse progress value while recognition is still running.
pub fn next_progress_tick(current: u8) -> u8 {
    if current < PROGRESS_TICK_CAP {
        current + PROGRESS_TICK
    } else {
        current
    }
}

/// Run `engine` on `frame` in the blocking pool, emitting coarse progress.
///
/// Reports 0 on entry, [`PROGRESS_ENGINE_READY`] after warm-up, ticks every
/// [`PROGRESS_TICK_INTERVAL`] up to [`PROGRESS_TICK_CAP`] and
/// [`PROGRESS_TEXT_READY`] once text comes back. There is no cancellation:
/// the call runs until the engine resolves or fails.
pub async fn recognize_with_progress<F>(
    engine: Arc<dyn OcrEngine>,
    frame: DynamicImage,
    mut progress: F,
) -> Result<OcrOutput, OcrError>
where
    F: FnMut(u8),
{
    progress(0);

    let warm = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || warm.warm_up())
        .await
        .map_err(|e| OcrError::EngineUnavailable(e.to_string()))??;
    progress(PROGRESS_ENGINE_READY);

    let mut task = tokio::task::spawn_blocking(move || engine.recognize(&frame));
    let mut ticker = tokio::time::interval(PROGRESS_TICK_INTERVAL);
    // First tick fires immediately.
    ticker.tick().await;

    let mut current = PROGRESS_ENGINE_READY;
    let joined = loop {
        tokio::select! {
            joined = &mut task => break joined,
            _ = ticker.tick() => {
                current = next_progress_tick(current);
                progress(current);
            }
        }
    };

    let output = joined.map_err(|e| OcrError::Recognition(e.to_string()))??;
    progress(PROGRESS_TEXT_READY);
    Ok(output)
}
