//! 2D Perlin noise
//!
//! Gradient noise over a 256-entry lookup table drawn from the game RNG, used
//! to scatter decorations in clumps. Output lies roughly in [-1, 1].

use glam::Vec2;
use rand::Rng;

use crate::from_degrees;

const WRAP: usize = 256;

#[derive(Debug, Clone)]
pub struct PerlinNoise {
    permutation: [u8; WRAP],
}

impl PerlinNoise {
    /// Table of values sampled with replacement from 0..256
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut permutation = [0u8; WRAP];
        for slot in &mut permutation {
            *slot = rng.random::<u8>();
        }
        Self { permutation }
    }

    /// Noise at (x, y) sampled at frequency `f`
    pub fn noise(&self, x: f32, y: f32, f: f32) -> f32 {
        let (x, y) = (x * f, y * f);
        let (cell_x, cell_y) = (x.floor(), y.floor());
        let (xf, yf) = (x - cell_x, y - cell_y);
        let (cx, cy) = (cell_x as i64, cell_y as i64);

        let top_right = Vec2::new(xf - 1.0, yf - 1.0).dot(self.gradient(cx + 1, cy + 1));
        let top_left = Vec2::new(xf, yf - 1.0).dot(self.gradient(cx, cy + 1));
        let bottom_right = Vec2::new(xf - 1.0, yf).dot(self.gradient(cx + 1, cy));
        let bottom_left = Vec2::new(xf, yf).dot(self.gradient(cx, cy));

        let u = fade(xf);
        let v = fade(yf);
        lerp(
            u,
            lerp(v, bottom_left, top_left),
            lerp(v, bottom_right, top_right),
        )
    }

    fn lookup(&self, v: i64) -> i64 {
        self.permutation[v.rem_euclid(WRAP as i64) as usize] as i64
    }

    /// Unit vector at a lattice point
    fn gradient(&self, x: i64, y: i64) -> Vec2 {
        let value = self.lookup(self.lookup(x) + y);
        from_degrees(1.0, value as f32 / (WRAP - 1) as f32 * 360.0)
    }
}

#[inline]
fn fade(t: f32) -> f32 {
    ((6.0 * t - 15.0) * t + 10.0) * t * t * t
}

#[inline]
fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t * (b - a)
}
