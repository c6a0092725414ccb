use std::sync::Arc;

use rand::Rng;

use crate::config::LogoSpec;
use crate::loader::LogoImage;
use crate::vectors::Vector2D;

pub const SPAWN_SPEED: f32 = 0.25; // px/ms
pub const CLICK_INFLUENCE_RADIUS: f32 = 120.0;
pub const CLICK_STRENGTH: f32 = 0.9;
const IMPULSE_MIN_DISTANCE: f32 = 10.0;

/// A floating logo. Radius and mass are fixed once spawned.
#[derive(Clone, Debug)]
pub struct Body {
    pub position: Vector2D,
    pub velocity: Vector2D,
    radius: f32,
    mass: f32,
    image: Arc<LogoImage>,
}

impl Body {
    pub fn new(
        position: Vector2D,
        velocity: Vector2D,
        radius: f32,
        mass: f32,
        image: Arc<LogoImage>,
    ) -> Self {
        Self {
            position,
            velocity,
            radius,
            mass,
            image,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn image(&self) -> &LogoImage {
        &self.image
    }
}

#[derive(Default)]
pub struct BodyStore {
    bodies: Vec<Body>,
}

impl BodyStore {
    /// Appends a body at a random in-bounds position with a small random velocity.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        logo: &LogoSpec,
        density: f32,
        image: Arc<LogoImage>,
        bounds: Vector2D,
        rng: &mut R,
    ) -> &Body {
        let radius = logo.scaled_radius(density);
        let mass = logo.mass_for(radius);
        let position = Vector2D::new(
            random_span(rng, radius, bounds.x - radius),
            random_span(rng, radius, bounds.y - radius),
        );
        let velocity = Vector2D::new(
            rng.random_range(-SPAWN_SPEED..SPAWN_SPEED),
            rng.random_range(-SPAWN_SPEED..SPAWN_SPEED),
        );
        self.push(Body::new(position, velocity, radius, mass, image))
    }

    pub fn push(&mut self, body: Body) -> &Body {
        self.bodies.push(body);
        &self.bodies[self.bodies.len() - 1]
    }

    /// Pushes every body near `point` away from it, weaker with distance.
    pub fn apply_impulse(&mut self, point: Vector2D, influence_radius: f32, strength: f32) {
        for body in self.bodies.iter_mut() {
            let offset = body.position - point;
            let reach = body.radius + influence_radius;
            let dist_sq = offset.length_squared();
            if dist_sq >= reach * reach {
                continue;
            }
            let dist = dist_sq.sqrt().max(IMPULSE_MIN_DISTANCE);
            body.velocity += offset / dist * strength;
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
    }
}

// Surfaces narrower than the body put it in the middle.
fn random_span<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    if high > low {
        rng.random_range(low..high)
    } else {
        (low + high) / 2.0
    }
}
