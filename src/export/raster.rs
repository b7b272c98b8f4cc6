//! Glyph rasterizer: draws a form snapshot with a TrueType font.

use super::{CellBox, ExportError, FormSnapshot, Rasterizer};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

/// Common install locations of a plain sans-serif TTF.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct GlyphRasterizer {
    font: FontVec,
}

impl GlyphRasterizer {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ExportError> {
        FontVec::try_from_vec(bytes)
            .map(|font| Self { font })
            .map_err(|e| ExportError::Font(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ExportError::Font(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(bytes)
    }

    /// Load `preferred` if given, otherwise the first system font found.
    pub fn discover(preferred: Option<&Path>) -> Result<Self, ExportError> {
        if let Some(path) = preferred {
            return Self::from_path(path);
        }
        for candidate in FONT_CANDIDATES {
            let path = Path::new(candidate);
            if path.exists() {
                log::info!("[EXPORT] Using font {}", path.display());
                return Self::from_path(path);
            }
        }
        Err(ExportError::Font(
            "no system font found; set IDCARD_FONT_PATH".to_string(),
        ))
    }

    fn line_height(&self, scale: PxScale) -> f32 {
        self.font.as_scaled(scale).height()
    }

    /// Draw `text` glyph by glyph so letter spacing can be applied.
    fn draw_spaced(
        &self,
        canvas: &mut RgbImage,
        color: Rgb<u8>,
        origin: (u32, u32),
        scale: PxScale,
        spacing: f32,
        text: &str,
    ) {
        let scaled = self.font.as_scaled(scale);
        let mut cursor = origin.0 as f32;
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let glyph = ch.encode_utf8(&mut buf);
            draw_text_mut(canvas, color, cursor.round() as i32, origin.1 as i32, scale, &self.font, glyph);
            cursor += scaled.h_advance(self.font.glyph_id(ch)) + spacing;
        }
    }

    fn text_top(&self, cell: &CellBox, scale: PxScale) -> u32 {
        let line = self.line_height(scale).ceil() as u32;
        cell.y + cell.height.saturating_sub(line) / 2
    }
}

fn rect(cell: &CellBox) -> Rect {
    Rect::at(cell.x as i32, cell.y as i32).of_size(cell.width.max(1), cell.height.max(1))
}

impl Rasterizer for GlyphRasterizer {
    fn render(&self, snapshot: &FormSnapshot) -> Result<RgbImage, ExportError> {
        if snapshot.width == 0 || snapshot.height == 0 {
            return Err(ExportError::Render(format!(
                "empty canvas {}x{}",
                snapshot.width, snapshot.height
            )));
        }
        let style = &snapshot.style;
        let text_color = Rgb(style.text_color);
        let border = Rgb(style.border_color);
        let padding = snapshot.scaled(style.cell_padding as f32).round() as u32;
        let body = PxScale::from(snapshot.scaled(style.font_px));
        let title = PxScale::from(snapshot.scaled(style.title_px));
        let spacing = snapshot.scaled(style.font_px * style.letter_spacing_em);

        let mut canvas = RgbImage::from_pixel(snapshot.width, snapshot.height, Rgb(style.background));
        self.draw_spaced(&mut canvas, text_color, snapshot.title_origin, title, 0.0, &snapshot.title);

        for row in &snapshot.rows {
            draw_filled_rect_mut(&mut canvas, rect(&row.label_box), Rgb(style.label_background));
            draw_hollow_rect_mut(&mut canvas, rect(&row.label_box), border);
            draw_hollow_rect_mut(&mut canvas, rect(&row.value_box), border);

            let label_at = (row.label_box.x + padding, self.text_top(&row.label_box, body));
            self.draw_spaced(&mut canvas, text_color, label_at, body, 0.0, &row.label);

            let value_at = (row.value_box.x + padding, self.text_top(&row.value_box, body));
            self.draw_spaced(&mut canvas, text_color, value_at, body, spacing, &row.value);
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_font_bytes_are_rejected() {
        let err = GlyphRasterizer::from_bytes(b"not a font".to_vec()).err().unwrap();
        assert!(matches!(err, ExportError::Font(_)));
    }

    #[test]
    fn missing_preferred_font_is_an_error() {
        let err = GlyphRasterizer::discover(Some(Path::new("/nonexistent/font.ttf")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }

    #[test]
    fn long_value_stays_inside_canvas() {
        // Needs a system font; hosts without one skip the drawing check.
        let Ok(rasterizer) = GlyphRasterizer::discover(None) else {
            return;
        };
        let record = crate::form::FormRecord {
            primary_id: "123456789012".into(),
            name: "WWWWWWWWWWWWWWWWWWWWWWWWWWWWWW".into(),
            secondary_id: "1234567890".repeat(4),
        };
        let snap = crate::export::snapshot(&record, &crate::export::SnapshotStyle::default());
        let canvas = rasterizer.render(&snap).unwrap();
        let background = Rgb(snap.style.background);

        for row in &snap.rows {
            let right = row.value_box.x + row.value_box.width;
            for y in row.value_box.y..row.value_box.y + row.value_box.height {
                for x in right..snap.width {
                    assert_eq!(
                        *canvas.get_pixel(x, y),
                        background,
                        "{} drawn past its cell at ({}, {})",
                        row.label,
                        x,
                        y
                    );
                }
            }
        }
    }
}
