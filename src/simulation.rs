use crate::body::{Body, BodyStore};
use crate::config::FloatingLogosConfig;
use crate::grid::SpatialGrid;
use crate::vectors::Vector2D;

pub const DAMPING: f32 = 0.996;
pub const WALL_RESTITUTION: f32 = 0.95;
/// Share of the overlap removed per frame.
pub const POSITION_CORRECTION: f32 = 0.8;
pub const MAX_FRAME_DELTA_MS: f32 = 32.0;
pub const DEFAULT_FRAME_DELTA_MS: f32 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    Apart,
    Coincident,
    /// Overlap corrected; bodies were already separating.
    Separating,
    Resolved,
}

/// Circle-circle contact: soft position correction followed by an impulse
/// along the normal from `a` to `b`.
pub fn collide(a: &mut Body, b: &mut Body, restitution: f32) -> Contact {
    let delta = b.position - a.position;
    let dist_sq = delta.length_squared();
    let radius_sum = a.radius() + b.radius();
    if dist_sq >= radius_sum * radius_sum {
        return Contact::Apart;
    }
    if dist_sq == 0.0 {
        return Contact::Coincident;
    }

    let dist = dist_sq.sqrt();
    let overlap = radius_sum - dist;
    let normal = delta / dist;
    let total_mass = a.mass() + b.mass();
    let push_a = overlap * (b.mass() / total_mass) * POSITION_CORRECTION;
    let push_b = overlap * (a.mass() / total_mass) * POSITION_CORRECTION;
    a.position -= normal * push_a;
    b.position += normal * push_b;

    let vel_along_normal = (b.velocity - a.velocity).dot(normal);
    if vel_along_normal > 0.0 {
        return Contact::Separating;
    }

    let j = -(1.0 + restitution) * vel_along_normal / (1.0 / a.mass() + 1.0 / b.mass());
    let impulse = normal * j;
    a.velocity -= impulse / a.mass();
    b.velocity += impulse / b.mass();
    Contact::Resolved
}

/// Keeps a body inside `width × height`, reflecting the offending velocity
/// component back inward.
pub fn resolve_walls(body: &mut Body, width: f32, height: f32) {
    let r = body.radius();
    if body.position.x - r < 0.0 {
        body.position.x = r;
        body.velocity.x = body.velocity.x.abs() * WALL_RESTITUTION;
    }
    if body.position.x + r > width {
        body.position.x = width - r;
        body.velocity.x = -body.velocity.x.abs() * WALL_RESTITUTION;
    }
    if body.position.y - r < 0.0 {
        body.position.y = r;
        body.velocity.y = body.velocity.y.abs() * WALL_RESTITUTION;
    }
    if body.position.y + r > height {
        body.position.y = height - r;
        body.velocity.y = -body.velocity.y.abs() * WALL_RESTITUTION;
    }
}

fn confine(body: &mut Body, width: f32, height: f32) {
    let r = body.radius();
    body.position.x = body.position.x.max(r).min(width - r);
    body.position.y = body.position.y.max(r).min(height - r);
}

pub struct Simulation {
    pub width: f32,
    pub height: f32,
    restitution: f32,
    max_speed: f32,
    store: BodyStore,
    grid: SpatialGrid,
}

impl Simulation {
    pub fn new(config: &FloatingLogosConfig, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            restitution: config.restitution,
            max_speed: config.max_speed,
            store: BodyStore::default(),
            grid: SpatialGrid::default(),
        }
    }

    pub fn bounds(&self) -> Vector2D {
        Vector2D::new(self.width, self.height)
    }

    pub fn store(&self) -> &BodyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BodyStore {
        &mut self.store
    }

    pub fn bodies(&self) -> &[Body] {
        self.store.bodies()
    }

    /// Advances the world by `dt_ms` milliseconds (already clamped by the caller).
    pub fn step(&mut self, dt_ms: f32) {
        let (w, h) = (self.width, self.height);
        for body in self.store.bodies_mut() {
            body.velocity = body.velocity.clamp_components(self.max_speed);
            body.position += body.velocity * dt_ms;
            body.velocity *= DAMPING;
            resolve_walls(body, w, h);
        }

        self.grid.rebuild(self.store.bodies(), w, h);

        let restitution = self.restitution;
        let bodies = self.store.bodies_mut();
        self.grid.for_each_candidate_pair(|i, j| {
            if let Ok([a, b]) = bodies.get_disjoint_mut([i, j]) {
                collide(a, b, restitution);
            }
        });

        // pair correction may nudge a body past a wall it was just clamped to
        for body in self.store.bodies_mut() {
            confine(body, w, h);
        }
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.grid = SpatialGrid::default();
    }
}

/// Turns frame timestamps into clamped integration steps.
#[derive(Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let delta = self.last_ms.map(|last| (now_ms - last) as f32);
        self.last_ms = Some(now_ms);
        match delta {
            Some(d) if d > 0.0 => d.min(MAX_FRAME_DELTA_MS),
            _ => DEFAULT_FRAME_DELTA_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LogoImage;
    use std::sync::Arc;

    fn body(x: f32, y: f32, vx: f32, vy: f32, radius: f32, mass: f32) -> Body {
        Body::new(
            Vector2D::new(x, y),
            Vector2D::new(vx, vy),
            radius,
            mass,
            Arc::new(LogoImage::solid(1, 1, [255, 255, 255, 255])),
        )
    }

    fn config(restitution: f32) -> FloatingLogosConfig {
        FloatingLogosConfig {
            restitution,
            ..Default::default()
        }
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn test_elastic_equal_masses_swap() {
        let mut a = body(0., 0., 1., 0., 10., 1.);
        let mut b = body(15., 0., -1., 0., 10., 1.);
        assert_eq!(collide(&mut a, &mut b, 1.0), Contact::Resolved);
        assert_close(a.velocity.x, -1.);
        assert_close(b.velocity.x, 1.);
        assert_close(a.velocity.y, 0.);
    }

    #[test]
    fn test_inelastic_equalizes_normal_velocity() {
        let mut a = body(0., 0., 0.6, 0.2, 12., 3.);
        let mut b = body(20., 0., -0.3, 0., 12., 1.);
        assert_eq!(collide(&mut a, &mut b, 0.0), Contact::Resolved);
        assert_close(a.velocity.x, b.velocity.x);
        // the tangential component is untouched
        assert_close(a.velocity.y, 0.2);
    }

    #[test]
    fn test_correction_never_brings_bodies_closer() {
        let cases = [
            (body(0., 0., 0., 0., 10., 1.), body(5., 5., 0., 0., 20., 50.)),
            (body(0., 0., 0.5, 0., 30., 900.), body(40., 3., -0.5, 0., 16., 256.)),
            (body(100., 100., 0., 0., 28., 784.), body(100.5, 100., 0., 0., 28., 784.)),
        ];
        for (mut a, mut b) in cases {
            let before = (b.position - a.position).length();
            collide(&mut a, &mut b, 0.9);
            let after = (b.position - a.position).length();
            assert!(after >= before, "{after} < {before}");
        }
    }

    #[test]
    fn test_heavier_body_moves_less() {
        let mut a = body(0., 0., 0., 0., 10., 9.);
        let mut b = body(10., 0., 0., 0., 10., 1.);
        collide(&mut a, &mut b, 0.9);
        assert_close(a.position.x, -0.8);
        assert_close(b.position.x, 17.2);
    }

    #[test]
    fn test_separating_pair_keeps_velocities() {
        let mut a = body(0., 0., -0.5, 0., 10., 1.);
        let mut b = body(15., 0., 0.5, 0., 10., 1.);
        assert_eq!(collide(&mut a, &mut b, 0.9), Contact::Separating);
        assert_eq!(a.velocity.x, -0.5);
        assert_eq!(b.velocity.x, 0.5);
    }

    #[test]
    fn test_coincident_and_apart_pairs_are_skipped() {
        let mut a = body(10., 10., 0.3, 0., 10., 1.);
        let mut b = body(10., 10., -0.3, 0., 10., 1.);
        assert_eq!(collide(&mut a, &mut b, 0.9), Contact::Coincident);
        assert!(a.velocity.is_finite() && b.velocity.is_finite());

        let mut c = body(40., 10., 0., 0., 10., 1.);
        assert_eq!(collide(&mut a, &mut c, 0.9), Contact::Apart);
    }

    #[test]
    fn test_walls_reflect_inward() {
        let mut b = body(-5., 50., -0.4, 0., 10., 1.);
        resolve_walls(&mut b, 100., 100.);
        assert_eq!(b.position.x, 10.);
        assert_close(b.velocity.x, 0.38);

        let mut b = body(50., 120., 0., 0.2, 10., 1.);
        resolve_walls(&mut b, 100., 100.);
        assert_eq!(b.position.y, 90.);
        assert_close(b.velocity.y, -0.19);
    }

    #[test]
    fn test_step_keeps_bodies_in_bounds() {
        let mut sim = Simulation::new(&config(0.9), 300., 200.);
        for i in 0..20 {
            let x = 20. + (i % 5) as f32 * 55.;
            let y = 20. + (i / 5) as f32 * 40.;
            sim.store_mut()
                .push(body(x, y, 5. - i as f32 * 0.5, -3. + i as f32 * 0.3, 18., 324.));
        }
        for _ in 0..300 {
            sim.step(MAX_FRAME_DELTA_MS);
            for b in sim.bodies() {
                let r = b.radius();
                assert!(b.position.x >= r && b.position.x <= 300. - r);
                assert!(b.position.y >= r && b.position.y <= 200. - r);
                assert!(b.velocity.is_finite());
            }
        }
    }

    #[test]
    fn test_single_step_displacement_is_bounded_by_max_speed() {
        let mut sim = Simulation::new(&config(0.9), 1000., 1000.);
        sim.store_mut().push(body(500., 500., 10., -10., 20., 400.));
        sim.step(10.);
        let b = &sim.bodies()[0];
        assert_close(b.position.x, 509.);
        assert_close(b.position.y, 491.);
        assert_close(b.velocity.x, 0.9 * DAMPING);
    }

    #[test]
    fn test_frame_clock_clamps_delta() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(1000.), DEFAULT_FRAME_DELTA_MS);
        assert_eq!(clock.tick(1010.), 10.);
        assert_eq!(clock.tick(5000.), MAX_FRAME_DELTA_MS);
        assert_eq!(clock.tick(4000.), DEFAULT_FRAME_DELTA_MS);
    }
}
