#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::body::Body;
use crate::vectors::Vector2D;

pub const BYTES_PER_PIXEL: usize = 4;
pub const MAX_DEVICE_PIXEL_RATIO: f32 = 2.0;
const OUTLINE_COLOR: [u8; 4] = [255, 255, 255, 64]; // rgba(255,255,255,0.25)
const OUTLINE_HALF_WIDTH: f32 = 0.5;
const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Geometry of the host container, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceMetrics {
    pub size: Vector2D,
    /// Top-left corner in client coordinates, used to localize pointer events.
    pub origin: Vector2D,
    pub device_pixel_ratio: f32,
}

impl SurfaceMetrics {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            size: Vector2D::new(width, height),
            origin: Vector2D::default(),
            device_pixel_ratio,
        }
    }
}

/// Device pixel ratio actually used for the backing buffer.
pub fn effective_dpr(raw: f32) -> f32 {
    if raw.is_finite() && raw > 0.0 {
        raw.min(MAX_DEVICE_PIXEL_RATIO)
    } else {
        1.0
    }
}

/// The drawing surface: an RGBA backing buffer sized to the container times
/// the (capped) device pixel ratio.
pub struct Surface {
    metrics: SurfaceMetrics,
    scale: f32,
    width: u32,
    height: u32,
    background: Option<[u8; 4]>,
    frame: Vec<u8>,
}

impl Surface {
    pub fn new(metrics: SurfaceMetrics, background: Option<[u8; 4]>) -> Self {
        let mut surface = Self {
            metrics,
            scale: 1.0,
            width: 0,
            height: 0,
            background,
            frame: vec![],
        };
        surface.resize(metrics);
        surface
    }

    /// Updates resolution only; whatever is simulated on top is left alone.
    pub fn resize(&mut self, metrics: SurfaceMetrics) {
        self.metrics = metrics;
        self.scale = effective_dpr(metrics.device_pixel_ratio);
        self.width = ((metrics.size.x * self.scale).floor() as u32).max(1);
        self.height = ((metrics.size.y * self.scale).floor() as u32).max(1);
        self.frame
            .resize(self.width as usize * self.height as usize * BYTES_PER_PIXEL, 0);
    }

    pub fn metrics(&self) -> SurfaceMetrics {
        self.metrics
    }

    /// Logical (CSS pixel) size the simulation runs in.
    pub fn logical_size(&self) -> Vector2D {
        self.metrics.size
    }

    pub fn physical_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.frame
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        [
            self.frame[idx],
            self.frame[idx + 1],
            self.frame[idx + 2],
            self.frame[idx + 3],
        ]
    }

    /// Repaints the whole frame: background (or transparency), then every
    /// body as its image clipped to a circle with a faint outline.
    pub fn draw(&mut self, bodies: &[Body]) {
        let width = self.width as usize;
        let scale = self.scale;
        let background = self.background.unwrap_or(TRANSPARENT);

        #[cfg(target_arch = "wasm32")]
        for (y, row) in self.frame.chunks_exact_mut(width * BYTES_PER_PIXEL).enumerate() {
            paint_row(row, y, width, scale, background, bodies);
        }
        #[cfg(not(target_arch = "wasm32"))]
        self.frame
            .par_chunks_exact_mut(width * BYTES_PER_PIXEL)
            .enumerate()
            .for_each(|(y, row)| paint_row(row, y, width, scale, background, bodies));
    }
}

fn paint_row(
    row: &mut [u8],
    y: usize,
    width: usize,
    scale: f32,
    background: [u8; 4],
    bodies: &[Body],
) {
    for pixel in row.chunks_exact_mut(BYTES_PER_PIXEL) {
        pixel.copy_from_slice(&background);
    }

    // sample at pixel centers, in logical coordinates
    let ly = (y as f32 + 0.5) / scale;
    for body in bodies {
        let r = body.radius();
        let center = body.position;
        let dy = ly - center.y;
        let extent = r + 1.0;
        if dy.abs() > extent {
            continue;
        }

        let reach = (extent * extent - dy * dy).max(0.0).sqrt();
        let min_x = ((center.x - reach) * scale).floor().max(0.0) as usize;
        let max_x = (((center.x + reach) * scale).ceil().max(0.0) as usize).min(width);
        let image = body.image();
        let diameter = 2.0 * r;

        for x in min_x..max_x {
            let lx = (x as f32 + 0.5) / scale;
            let dx = lx - center.x;
            let distance = (dx * dx + dy * dy).sqrt();
            let pixel = &mut row[x * BYTES_PER_PIXEL..(x + 1) * BYTES_PER_PIXEL];

            // anti-aliased clip: coverage fades over one device pixel at the rim
            let fill = ((r - distance) * scale + 0.5).clamp(0.0, 1.0);
            if fill > 0.0 {
                let texel = image.sample((dx + r) / diameter, (dy + r) / diameter);
                blend(pixel, texel, fill);
            }

            let off_ring = ((distance - (r - 0.5)).abs() - OUTLINE_HALF_WIDTH).max(0.0);
            let stroke = (1.0 - off_ring * scale).clamp(0.0, 1.0);
            if stroke > 0.0 {
                blend(pixel, OUTLINE_COLOR, stroke);
            }
        }
    }
}

/// Source-over compositing of a straight-alpha color scaled by `coverage`.
#[inline]
pub fn blend(dst: &mut [u8], src: [u8; 4], coverage: f32) {
    let sa = src[3] as f32 / 255.0 * coverage;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        dst.copy_from_slice(&TRANSPARENT);
        return;
    }
    for c in 0..3 {
        let value = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LogoImage;
    use std::sync::Arc;

    fn red_body(x: f32, y: f32, r: f32) -> Body {
        Body::new(
            Vector2D::new(x, y),
            Vector2D::default(),
            r,
            r * r,
            Arc::new(LogoImage::solid(4, 4, [255, 0, 0, 255])),
        )
    }

    #[test]
    fn test_backing_buffer_follows_capped_dpr() {
        let surface = Surface::new(SurfaceMetrics::new(50., 40.5, 3.0), None);
        assert_eq!(surface.physical_size(), (100, 81));
        assert_eq!(surface.frame().len(), 100 * 81 * 4);

        let surface = Surface::new(SurfaceMetrics::new(0., 10., f32::NAN), None);
        assert_eq!(surface.scale(), 1.0);
        assert_eq!(surface.physical_size(), (1, 10));
    }

    #[test]
    fn test_image_is_clipped_to_circle() {
        let mut surface = Surface::new(SurfaceMetrics::new(100., 100., 1.0), Some([0, 0, 0, 255]));
        surface.draw(&[red_body(50., 50., 20.)]);
        assert_eq!(surface.pixel(50, 50), [255, 0, 0, 255]);
        // inside the bounding square but outside the circle
        assert_eq!(surface.pixel(33, 33), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(5, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn test_outline_brightens_rim() {
        let mut surface = Surface::new(SurfaceMetrics::new(100., 100., 1.0), Some([0, 0, 0, 255]));
        surface.draw(&[red_body(50., 50., 20.)]);
        let rim = surface.pixel(50, 30);
        assert!(rim[1] > 40, "rim pixel {rim:?} has no outline");
        assert!(rim[0] > 200);
    }

    #[test]
    fn test_without_background_clears_to_transparent() {
        let mut surface = Surface::new(SurfaceMetrics::new(20., 20., 1.0), None);
        surface.frame_mut().fill(77);
        surface.draw(&[]);
        assert!(surface.frame().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_hidpi_draws_in_logical_coordinates() {
        let mut surface = Surface::new(SurfaceMetrics::new(50., 50., 2.0), None);
        surface.draw(&[red_body(25., 25., 10.)]);
        assert_eq!(surface.pixel(50, 50), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(5, 5), [0, 0, 0, 0]);
    }
}
