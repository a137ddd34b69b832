use glam::{Vec2, Vec4};

use super::{BlendMode, Canvas};

/// Anything that advances and draws a particle field given a per-frame
/// velocity bias.
pub trait ParticleFeed {
    fn draw(&mut self, target: &mut Canvas, velocity_bias: Vec2);
}

#[derive(Debug, Clone)]
struct Particle {
    position: Vec2,
    velocity: Vec2,
    radius: f32,
}

/// Small linear congruential generator; keeps runs reproducible.
#[derive(Debug, Clone)]
struct Lcg {
    state: u32,
}

impl Lcg {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_f32(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        let value = (self.state >> 9) | 0x3f80_0000;
        f32::from_bits(value) - 1.0
    }

    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

/// Slowly drifting white dots that rise faster when the bias pushes upward.
/// Particles leaving the frame respawn on the opposite edge.
pub struct ParticleSystem {
    bounds: Vec2,
    particles: Vec<Particle>,
    rng: Lcg,
    color: Vec4,
}

impl ParticleSystem {
    pub fn new(width: u32, height: u32, count: usize) -> Self {
        Self::with_seed(width, height, count, 0x5eed)
    }

    pub fn with_seed(width: u32, height: u32, count: usize, seed: u32) -> Self {
        let bounds = Vec2::new(width as f32, height as f32);
        let mut rng = Lcg::new(seed);
        let particles = (0..count)
            .map(|_| Particle {
                position: Vec2::new(rng.range(0.0, bounds.x), rng.range(0.0, bounds.y)),
                velocity: Vec2::new(rng.range(-0.5, 0.5), rng.range(-1.0, -0.25)),
                radius: rng.range(2.0, 6.0),
            })
            .collect();
        Self {
            bounds,
            particles,
            rng,
            color: Vec4::new(1.0, 1.0, 1.0, 0.6),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.particles.iter().map(|p| p.position)
    }

    fn step(&mut self, velocity_bias: Vec2) {
        for p in self.particles.iter_mut() {
            // smaller particles read as farther away and move slower
            let depth = p.radius / 6.0;
            p.position += p.velocity + velocity_bias * depth;

            let r = p.radius;
            if p.position.y < -r {
                p.position.y = self.bounds.y + r;
                p.position.x = self.rng.range(0.0, self.bounds.x);
            } else if p.position.y > self.bounds.y + r {
                p.position.y = -r;
            }
            if p.position.x < -r {
                p.position.x = self.bounds.x + r;
            } else if p.position.x > self.bounds.x + r {
                p.position.x = -r;
            }
        }
    }
}

impl ParticleFeed for ParticleSystem {
    fn draw(&mut self, target: &mut Canvas, velocity_bias: Vec2) {
        self.step(velocity_bias);
        for p in &self.particles {
            target.fill_circle(p.position, p.radius, self.color, BlendMode::ALPHA);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upward_bias_moves_particles_up_faster() {
        let mut calm = ParticleSystem::with_seed(64, 10_000, 10, 7);
        let mut driven = ParticleSystem::with_seed(64, 10_000, 10, 7);

        let mut canvas = Canvas::new(64, 64);
        calm.draw(&mut canvas, Vec2::ZERO);
        driven.draw(&mut canvas, Vec2::new(0.0, -8.0));

        // only a particle wrapping past the top edge could break the ordering
        let higher = driven
            .positions()
            .zip(calm.positions())
            .filter(|(d, c)| d.y < c.y)
            .count();
        assert!(higher > driven.len() / 2);
    }

    #[test]
    fn particles_stay_near_bounds() {
        let mut system = ParticleSystem::new(64, 48, 30);
        let mut canvas = Canvas::new(64, 48);
        for _ in 0..500 {
            system.draw(&mut canvas, Vec2::new(0.0, -5.0));
        }
        for p in system.positions() {
            assert!(p.x >= -10.0 && p.x <= 74.0);
            assert!(p.y >= -10.0 && p.y <= 58.0);
        }
    }

    #[test]
    fn drawing_marks_the_canvas() {
        let mut system = ParticleSystem::new(32, 32, 5);
        let mut canvas = Canvas::new(32, 32);
        system.draw(&mut canvas, Vec2::ZERO);
        assert!(canvas.pixels().iter().any(|p| p.w > 0.0));
    }
}
