use crate::error::FontError;
use crate::renderer::{BYTES_PER_PIXEL, Surface, blend};

// fraction of the em box above the baseline when the font has no line metrics
const DEFAULT_ASCENT: f32 = 0.8;

/// Rasterizes glyphs straight into a [`Surface`].
pub struct TextPainter {
    font: fontdue::Font,
}

impl TextPainter {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FontError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(FontError)?;
        Ok(Self { font })
    }

    /// Draws `text` with the top of its line box at logical `(x, y)`; `px` is the
    /// logical font size. Returns the logical advance width.
    pub fn draw_text(
        &self,
        surface: &mut Surface,
        text: &str,
        x: f32,
        y: f32,
        px: f32,
        color: [u8; 4],
    ) -> f32 {
        let mut cursor = x;
        for c in text.chars() {
            cursor += self.draw_char(surface, c, cursor, y, px, color);
        }
        cursor - x
    }

    pub fn draw_char(
        &self,
        surface: &mut Surface,
        c: char,
        x: f32,
        y: f32,
        px: f32,
        color: [u8; 4],
    ) -> f32 {
        let scale = surface.scale();
        let (width, height) = surface.physical_size();
        let (metrics, bitmap) = self.font.rasterize(c, px * scale);
        let ascent = self
            .font
            .horizontal_line_metrics(px * scale)
            .map(|line| line.ascent)
            .unwrap_or(px * scale * DEFAULT_ASCENT);
        let baseline = (y * scale + ascent).round() as isize;
        let frame = surface.frame_mut();

        let origin_x = (x * scale) as isize + metrics.xmin as isize;
        let origin_y = glyph_top(baseline, metrics.height, metrics.ymin);
        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let coverage = bitmap[row * metrics.width + col] as f32 / 255.0;
                if coverage <= 0.0 {
                    continue;
                }
                let frame_x = origin_x + col as isize;
                let frame_y = origin_y + row as isize;
                if frame_x < 0
                    || frame_y < 0
                    || frame_x >= width as isize
                    || frame_y >= height as isize
                {
                    continue;
                }
                let idx = (frame_y as usize * width as usize + frame_x as usize) * BYTES_PER_PIXEL;
                blend(&mut frame[idx..idx + BYTES_PER_PIXEL], color, coverage);
            }
        }
        metrics.advance_width / scale + 1.0
    }
}

/// Top row of a glyph bitmap so that its bottom sits `ymin` pixels above `baseline`.
fn glyph_top(baseline: isize, height: usize, ymin: i32) -> isize {
    baseline - (height as isize + ymin as isize)
}
