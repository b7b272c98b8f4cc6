//! Export domain: turns a finished record into a downloadable image.
//!
//! Export never touches the interactive form. [`snapshot`] builds a static,
//! style-resolved description of what to draw (pure); a [`Rasterizer`]
//! draws it; [`encode_jpeg`] and [`write_export`] produce the file.

mod raster;

pub use raster::GlyphRasterizer;

use crate::form::{Field, FormRecord};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FORM_TITLE: &str = "ADHAR CARD DETAILS";
pub const EXPORT_FILE_PREFIX: &str = "aadhaar-details";
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const DEFAULT_SCALE: u32 = 2;
/// Largest accepted device-pixel ratio.
pub const MAX_SCALE: u32 = 8;

/// Upper bound on a glyph's advance, in em. Wide capitals such as `W`
/// come close to a full em in common sans faces.
const MAX_ADVANCE_EM: f32 = 1.0;

/// Visual parameters, in logical pixels before scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotStyle {
    pub background: [u8; 3],
    pub text_color: [u8; 3],
    pub border_color: [u8; 3],
    pub label_background: [u8; 3],
    pub title_px: f32,
    pub font_px: f32,
    /// Extra advance after each glyph, as a fraction of `font_px`.
    pub letter_spacing_em: f32,
    pub min_row_height: u32,
    pub cell_padding: u32,
    pub page_padding: u32,
    pub label_width: u32,
    pub value_width: u32,
    pub scale: u32,
}

impl Default for SnapshotStyle {
    fn default() -> Self {
        Self {
            background: [0xff, 0xff, 0xff],
            text_color: [0x33, 0x33, 0x33],
            border_color: [0xcc, 0xcc, 0xcc],
            label_background: [0xf5, 0xf5, 0xf5],
            title_px: 20.0,
            font_px: 15.2,
            letter_spacing_em: 0.05,
            min_row_height: 24,
            cell_padding: 8,
            page_padding: 24,
            label_width: 160,
            value_width: 280,
            scale: DEFAULT_SCALE,
        }
    }
}

impl SnapshotStyle {
    /// `scale` clamped to `1..=MAX_SCALE`.
    pub fn device_scale(&self) -> u32 {
        self.scale.clamp(1, MAX_SCALE)
    }

    /// Logical width of a value cell wide enough for `text` and its padding.
    ///
    /// Never narrower than `value_width`; grows for long names and for
    /// unbounded USC numbers so nothing is clipped at the canvas edge.
    fn value_cell_width(&self, text: &str) -> u32 {
        let per_char = self.font_px * (MAX_ADVANCE_EM + self.letter_spacing_em);
        let text_w = (text.chars().count() as f32 * per_char).ceil() as u32;
        self.value_width.max(text_w + 2 * self.cell_padding)
    }
}

/// Axis-aligned box in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub label: String,
    pub value: String,
    pub label_box: CellBox,
    pub value_box: CellBox,
}

/// Everything a rasterizer needs, already laid out in device pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSnapshot {
    pub title: String,
    pub title_origin: (u32, u32),
    pub rows: Vec<SnapshotRow>,
    pub width: u32,
    pub height: u32,
    pub style: SnapshotStyle,
}

impl FormSnapshot {
    pub fn scaled(&self, logical: f32) -> f32 {
        logical * self.style.device_scale() as f32
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No font available for rendering: {0}")]
    Font(String),
    #[error("No rasterizer configured")]
    NoRasterizer,
    #[error("Failed to rasterize form: {0}")]
    Render(String),
    #[error("JPEG encode failed: {0}")]
    Encode(String),
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Draws a [`FormSnapshot`] onto an RGB canvas of `snapshot.width` x `snapshot.height`.
pub trait Rasterizer: Send + Sync {
    fn render(&self, snapshot: &FormSnapshot) -> Result<RgbImage, ExportError>;
}

/// Build the static representation of `record` for export.
pub fn snapshot(record: &FormRecord, style: &SnapshotStyle) -> FormSnapshot {
    let s = style.device_scale();
    let pad = style.page_padding * s;
    let title_h = (style.title_px * 1.5).ceil() as u32 * s;
    let gap = 12 * s;
    let row_h = (style.min_row_height + 2 * style.cell_padding) * s;
    let label_w = style.label_width * s;
    let value_w = Field::ALL
        .iter()
        .map(|field| style.value_cell_width(record.get(*field)))
        .max()
        .unwrap_or(style.value_width)
        * s;
    let table_top = pad + title_h + gap;

    let rows: Vec<SnapshotRow> = Field::ALL
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let y = table_top + i as u32 * row_h;
            SnapshotRow {
                label: field.label().to_string(),
                value: record.get(*field).to_string(),
                label_box: CellBox {
                    x: pad,
                    y,
                    width: label_w,
                    height: row_h,
                },
                value_box: CellBox {
                    x: pad + label_w,
                    y,
                    width: value_w,
                    height: row_h,
                },
            }
        })
        .collect();

    let height = table_top + rows.len() as u32 * row_h + pad;
    FormSnapshot {
        title: FORM_TITLE.to_string(),
        title_origin: (pad, pad),
        rows,
        width: 2 * pad + label_w + value_w,
        height,
        style: style.clone(),
    }
}

/// Download name with the capture time embedded, e.g. `aadhaar-details-1700000000000.jpg`.
pub fn export_file_name(captured_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.jpg",
        EXPORT_FILE_PREFIX,
        captured_at.timestamp_millis()
    )
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder
        .encode_image(image)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Write encoded bytes to `dir/file_name`, creating `dir` if needed.
pub fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    log::info!("[EXPORT] Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> FormRecord {
        FormRecord {
            primary_id: "123456789012".into(),
            name: "JOHN SMITH".into(),
            secondary_id: "1234567890123".into(),
        }
    }

    #[test]
    fn snapshot_carries_labels_and_values_in_order() {
        let snap = snapshot(&record(), &SnapshotStyle::default());
        assert_eq!(snap.title, FORM_TITLE);
        let pairs: Vec<(&str, &str)> = snap
            .rows
            .iter()
            .map(|r| (r.label.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("ADHAR NUMBER", "123456789012"),
                ("NAME", "JOHN SMITH"),
                ("USC NO:", "1234567890123"),
            ]
        );
    }

    #[test]
    fn snapshot_is_pure() {
        let style = SnapshotStyle::default();
        assert_eq!(snapshot(&record(), &style), snapshot(&record(), &style));
    }

    #[test]
    fn rows_fit_inside_canvas_and_stack() {
        let snap = snapshot(&record(), &SnapshotStyle::default());
        for row in &snap.rows {
            assert!(row.value_box.x + row.value_box.width <= snap.width);
            assert!(row.value_box.y + row.value_box.height <= snap.height);
            assert_eq!(row.label_box.x + row.label_box.width, row.value_box.x);
        }
        for pair in snap.rows.windows(2) {
            assert_eq!(pair[0].label_box.y + pair[0].label_box.height, pair[1].label_box.y);
        }
    }

    #[test]
    fn scale_multiplies_canvas() {
        let one = snapshot(&record(), &SnapshotStyle { scale: 1, ..Default::default() });
        let two = snapshot(&record(), &SnapshotStyle::default());
        assert_eq!(two.width, one.width * 2);
        assert_eq!(two.height, one.height * 2);
    }

    #[test]
    fn value_column_grows_for_long_relaxed_usc() {
        let mut long = record();
        long.secondary_id = "1234567890".repeat(4);
        let style = SnapshotStyle::default();
        let snap = snapshot(&long, &style);

        let usc = &snap.rows[2];
        assert_eq!(usc.value, long.secondary_id);
        let needed = (40.0 * style.font_px * (1.0 + style.letter_spacing_em)) as u32 * style.scale;
        assert!(usc.value_box.width >= needed, "{} < {}", usc.value_box.width, needed);
        assert!(usc.value_box.x + usc.value_box.width <= snap.width);
        // Every row shares the widened column.
        assert!(snap.rows.iter().all(|r| r.value_box.width == usc.value_box.width));
        assert!(snap.width > snapshot(&record(), &style).width);
    }

    #[test]
    fn short_values_keep_default_column() {
        let style = SnapshotStyle::default();
        let snap = snapshot(&record(), &style);
        assert_eq!(snap.rows[0].value_box.width, style.value_width * style.scale);
    }

    #[test]
    fn huge_scale_is_clamped() {
        let huge = snapshot(&record(), &SnapshotStyle { scale: u32::MAX, ..Default::default() });
        let max = snapshot(&record(), &SnapshotStyle { scale: MAX_SCALE, ..Default::default() });
        assert_eq!((huge.width, huge.height), (max.width, max.height));
        assert_eq!(huge.scaled(1.0), MAX_SCALE as f32);
    }

    #[test]
    fn file_name_embeds_epoch_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(export_file_name(at), "aadhaar-details-1700000000123.jpg");
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let img = RgbImage::from_pixel(16, 8, image::Rgb([255, 255, 255]));
        let bytes = encode_jpeg(&img, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn write_creates_directory() {
        let dir = std::env::temp_dir().join("idcard-form-test-export").join("nested");
        let _ = std::fs::remove_dir_all(&dir);
        let path = write_export(&dir, "out.jpg", b"abc").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
