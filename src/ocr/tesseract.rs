//! Tesseract OCR backend via rusty-tesseract.
//!
//! Shells out to the system `tesseract` binary; no models are bundled.

use super::{OcrEngine, OcrError, OcrOutput, OcrSettings};
use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use std::collections::HashMap;
use std::time::Instant;

/// Frames whose short side is below this are upscaled before recognition.
const MIN_SHORT_SIDE: u32 = 600;

pub struct TesseractEngine {
    settings: OcrSettings,
}

impl TesseractEngine {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    fn args(&self) -> Args {
        Args {
            lang: self.settings.language.clone(),
            config_variables: HashMap::new(),
            dpi: self.settings.dpi,
            psm: self.settings.psm,
            oem: Some(3),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(OcrSettings::default())
    }
}

/// Upscale small frames; Tesseract works best with glyphs 10-12 px tall.
fn prepare(image: &DynamicImage) -> DynamicImage {
    let short_side = image.width().min(image.height());
    if short_side == 0 || short_side >= MIN_SHORT_SIDE {
        return image.clone();
    }
    let factor = MIN_SHORT_SIDE.div_ceil(short_side).min(4);
    let (w, h) = (image.width() * factor, image.height() * factor);
    log::info!("[OCR] Upscaling {}x to {}x{}", factor, w, h);
    image.resize(w, h, image::imageops::FilterType::Lanczos3)
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn warm_up(&self) -> Result<(), OcrError> {
        let version = rusty_tesseract::get_tesseract_version()
            .map_err(|e| OcrError::EngineUnavailable(e.to_string()))?;
        log::info!(
            "[OCR] tesseract {} ready (lang={})",
            version.lines().next().unwrap_or_default().trim(),
            self.settings.language
        );
        Ok(())
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        let start = Instant::now();
        let prepared = prepare(image);
        let tess_img =
            Image::from_dynamic_image(&prepared).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        let text = rusty_tesseract::image_to_string(&tess_img, &self.args())
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        let output = OcrOutput::new(text, start.elapsed().as_millis());
        log::info!(
            "[OCR] Extracted {} chars in {}ms",
            output.char_count,
            output.latency_ms
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_follow_settings() {
        let engine = TesseractEngine::new(OcrSettings {
            language: "hin".into(),
            psm: Some(6),
            dpi: None,
        });
        let args = engine.args();
        assert_eq!(args.lang, "hin");
        assert_eq!(args.psm, Some(6));
        assert_eq!(args.dpi, None);
    }

    #[test]
    fn small_frames_are_upscaled() {
        let small = DynamicImage::new_rgb8(320, 200);
        let prepared = prepare(&small);
        assert_eq!((prepared.width(), prepared.height()), (960, 600));
    }

    #[test]
    fn camera_sized_frames_are_untouched() {
        let frame = DynamicImage::new_rgb8(1280, 720);
        let prepared = prepare(&frame);
        assert_eq!((prepared.width(), prepared.height()), (1280, 720));
    }
}
