//! Multi-step orchestration for the two flows that suspend.
//!
//! - scan_frame: frame → OCR → field extraction
//! - export_snapshot: rasterize → JPEG encode → write file
//!
//! Both run their blocking work on the Tokio blocking pool and log
//! per-stage timings.

use crate::export::{self, ExportError, FormSnapshot, Rasterizer};
use crate::ocr::{self, heuristics, OcrEngine, OcrError, OcrOutput};
use image::DynamicImage;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub struct ScanResult {
    pub ocr: OcrOutput,
    pub fields: heuristics::ExtractedFields,
}

/// Run OCR on one captured frame and extract card fields from the text.
pub async fn scan_frame<F>(
    engine: Arc<dyn OcrEngine>,
    frame: DynamicImage,
    progress: &mut F,
) -> Result<ScanResult, OcrError>
where
    F: FnMut(u8),
{
    let pipeline_start = Instant::now();
    log::info!(
        "[PIPELINE] Scanning {}x{} frame with {}",
        frame.width(),
        frame.height(),
        engine.name()
    );

    let ocr_result = ocr::recognize_with_progress(engine, frame, &mut *progress).await?;
    let ocr_ms = pipeline_start.elapsed().as_millis();
    log::info!(
        "[OCR] {} chars in {}ms (engine reported {}ms)",
        ocr_result.char_count,
        ocr_ms,
        ocr_result.latency_ms
    );
    if ocr_result.char_count == 0 {
        log::warn!("[OCR] Recognition returned zero characters");
    }

    let extract_start = Instant::now();
    let fields = heuristics::extract(&ocr_result.text);
    log::info!(
        "[EXTRACT] primary_id found: {}, name found: {} ({}us)",
        !fields.primary_id.is_empty(),
        !fields.name.is_empty(),
        extract_start.elapsed().as_micros()
    );
    log::info!(
        "[PIPELINE] Scan total: {}ms",
        pipeline_start.elapsed().as_millis()
    );

    Ok(ScanResult {
        ocr: ocr_result,
        fields,
    })
}

/// Where an export landed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedExport {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
}

/// Rasterize `snapshot`, encode it as JPEG and write it into `dir`.
pub async fn export_snapshot(
    rasterizer: Arc<dyn Rasterizer>,
    snapshot: FormSnapshot,
    quality: u8,
    dir: PathBuf,
    file_name: String,
) -> Result<SavedExport, ExportError> {
    tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let image = rasterizer.render(&snapshot)?;
        let render_ms = start.elapsed().as_millis();

        let encode_start = Instant::now();
        let bytes = export::encode_jpeg(&image, quality)?;
        let encode_ms = encode_start.elapsed().as_millis();

        let path = export::write_export(&dir, &file_name, &bytes)?;
        log::info!(
            "[PIPELINE] Export total: {}ms (render={} + encode={}, quality={})",
            start.elapsed().as_millis(),
            render_ms,
            encode_ms,
            quality
        );

        Ok(SavedExport {
            path,
            file_name,
            bytes: bytes.len(),
            width: image.width(),
            height: image.height(),
        })
    })
    .await
    .map_err(|e| ExportError::Render(e.to_string()))?
}
