use rand::Rng;

use crate::config::HostHints;
use crate::renderer::{BYTES_PER_PIXEL, Surface, blend};
use crate::text::TextPainter;
use crate::vectors::{Vector2D, VectorDirections};

pub const TRAIL_LIFETIME_MS: f32 = 900.0;
pub const TRAIL_CAPACITY: usize = 64;
/// Pointer travel (CSS px) between two emitted digits.
pub const TRAIL_SPACING: f32 = 14.0;
const TRAIL_RISE_SPEED: f32 = 0.03; // px/ms
const TRAIL_DRIFT: f32 = 0.015;
const TRAIL_FONT_PX: f32 = 14.0;
const TRAIL_COLOR: [u8; 4] = [96, 220, 140, 255];

#[derive(Clone, Debug, PartialEq)]
pub struct TrailParticle {
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub digit: char,
    pub age_ms: f32,
}

impl TrailParticle {
    pub fn opacity(&self) -> f32 {
        (1.0 - self.age_ms / TRAIL_LIFETIME_MS).clamp(0.0, 1.0)
    }
}

/// Cursor trail of fading `0`/`1` digits.
pub struct BinaryTrail {
    particles: Vec<TrailParticle>,
    last_emit: Option<Vector2D>,
}

impl BinaryTrail {
    /// `None` when the user prefers reduced motion: the trail never runs.
    pub fn new(hints: HostHints) -> Option<Self> {
        if hints.prefers_reduced_motion {
            return None;
        }
        Some(Self {
            particles: Vec::with_capacity(TRAIL_CAPACITY),
            last_emit: None,
        })
    }

    pub fn pointer_moved<R: Rng + ?Sized>(&mut self, at: Vector2D, rng: &mut R) {
        if let Some(last) = self.last_emit {
            if (at - last).length_squared() < TRAIL_SPACING * TRAIL_SPACING {
                return;
            }
        }
        self.last_emit = Some(at);

        if self.particles.len() == TRAIL_CAPACITY {
            self.particles.remove(0);
        }
        let drift = rng.random_range(-TRAIL_DRIFT..TRAIL_DRIFT);
        self.particles.push(TrailParticle {
            position: at,
            velocity: Vector2D::UP * TRAIL_RISE_SPEED + Vector2D::new(drift, 0.0),
            digit: if rng.random_bool(0.5) { '1' } else { '0' },
            age_ms: 0.0,
        });
    }

    pub fn update(&mut self, dt_ms: f32) {
        for p in self.particles.iter_mut() {
            p.age_ms += dt_ms;
            p.position += p.velocity * dt_ms;
        }
        self.particles.retain(|p| p.age_ms < TRAIL_LIFETIME_MS);
    }

    pub fn particles(&self) -> &[TrailParticle] {
        &self.particles
    }

    pub fn draw(&self, surface: &mut Surface, painter: Option<&TextPainter>) {
        for p in &self.particles {
            let mut color = TRAIL_COLOR;
            color[3] = (p.opacity() * 255.0) as u8;
            match painter {
                Some(painter) => {
                    let (x, y) = (p.position.x, p.position.y);
                    painter.draw_char(surface, p.digit, x, y, TRAIL_FONT_PX, color);
                }
                None => draw_square(surface, p.position, 3.0, color),
            }
        }
    }
}

fn draw_square(surface: &mut Surface, center: Vector2D, size: f32, color: [u8; 4]) {
    let scale = surface.scale();
    let (width, height) = surface.physical_size();
    let half = size * scale / 2.0;
    let min_x = (center.x * scale - half).max(0.0) as u32;
    let min_y = (center.y * scale - half).max(0.0) as u32;
    let max_x = ((center.x * scale + half).max(0.0) as u32).min(width);
    let max_y = ((center.y * scale + half).max(0.0) as u32).min(height);
    let frame = surface.frame_mut();
    for y in min_y..max_y {
        for x in min_x..max_x {
            let idx = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
            blend(&mut frame[idx..idx + BYTES_PER_PIXEL], color, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::SurfaceMetrics;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_reduced_motion_disables_trail() {
        let hints = HostHints {
            prefers_reduced_motion: true,
            ..Default::default()
        };
        assert!(BinaryTrail::new(hints).is_none());
        assert!(BinaryTrail::new(HostHints::default()).is_some());
    }

    #[test]
    fn test_emits_by_distance_and_expires() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut trail = BinaryTrail::new(HostHints::default()).unwrap();
        trail.pointer_moved(Vector2D::new(10., 10.), &mut rng);
        trail.pointer_moved(Vector2D::new(12., 10.), &mut rng);
        assert_eq!(trail.particles().len(), 1);
        trail.pointer_moved(Vector2D::new(40., 10.), &mut rng);
        assert_eq!(trail.particles().len(), 2);
        assert!(trail.particles().iter().all(|p| p.digit == '0' || p.digit == '1'));

        trail.update(TRAIL_LIFETIME_MS / 2.0);
        assert!(trail.particles()[0].position.y < 10.);
        assert!((trail.particles()[0].opacity() - 0.5).abs() < 1e-6);

        trail.update(TRAIL_LIFETIME_MS);
        assert!(trail.particles().is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut trail = BinaryTrail::new(HostHints::default()).unwrap();
        for i in 0..(TRAIL_CAPACITY + 10) {
            trail.pointer_moved(Vector2D::new(i as f32 * 20., 0.), &mut rng);
        }
        assert_eq!(trail.particles().len(), TRAIL_CAPACITY);
        assert_eq!(trail.particles()[0].position.x, 200.);
    }

    #[test]
    fn test_fallback_squares_paint_without_font() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut trail = BinaryTrail::new(HostHints::default()).unwrap();
        trail.pointer_moved(Vector2D::new(10., 10.), &mut rng);
        let mut surface = Surface::new(SurfaceMetrics::new(20., 20., 1.0), None);
        surface.draw(&[]);
        trail.draw(&mut surface, None);
        assert_eq!(surface.pixel(10, 10), TRAIL_COLOR);
    }
}
