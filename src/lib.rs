//! Catacomb Crawler - simulation core for a top-down action roguelike
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spatial grid, Verlet physics, cave boundaries,
//!   state-machine AI, A* pathfinding, level generation)
//! - `data`: Data-driven presets (level themes, preset rooms, items, creatures)
//! - `audio`: Fire-and-forget sound requests handed to an external mixer
//!
//! Angles are in degrees throughout, measured from the +x axis towards +y.

pub mod audio;
pub mod data;
pub mod sim;

pub use data::{DataError, GameData};

use glam::Vec2;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// Game configuration constants
pub mod consts {
    /// Simulation ticks per second
    pub const FPS: u32 = 60;

    /// Spatial grid cell size (world units)
    pub const GRID_SIZE: f32 = 15.0;

    /// Default level physics
    pub const DEFAULT_FRICTION: f32 = 0.95;
    pub const DEFAULT_TRACTION: f32 = 1.0;

    /// Fraction of the snap-inside vector applied per tick
    pub const SNAP_SOFTENING: f32 = 0.3;
    /// Fraction of the overlap vector resolved per colliding pair
    pub const SEPARATION_SOFTENING: f32 = 0.1;

    /// AI distances
    pub const AGGRO_RANGE: f32 = 250.0;
    pub const ARRIVE_DISTANCE: f32 = 5.0;
    pub const FLEE_TRIGGER_RANGE: f32 = 100.0;
    /// Half-angle of the cone an attacker must face (degrees)
    pub const ATTACK_CONE: f32 = 45.0;

    /// Timers (ticks)
    pub const ATTACK_COOLDOWN_TICKS: u32 = 30;
    pub const WEAPON_COOLDOWN_TICKS: u32 = 5;

    /// Player defaults
    pub const PLAYER_MAX_HP: f32 = 50.0;
    pub const PLAYER_RADIUS: f32 = 8.0;
    pub const PLAYER_ACCELERATION: f32 = 0.1;
    pub const INVENTORY_CAPACITY: usize = 10;
    /// Camera leads the player by this many ticks of velocity
    pub const CAMERA_LEAD: f32 = 15.0;

    /// Level generation
    pub const MIN_ROOMS: u32 = 10;
    pub const MAX_ROOMS: u32 = 30;
    pub const PRESET_ROOM_CHANCE: f32 = 0.1;
    pub const ROOM_TURN: f32 = 60.0;
    pub const SPAWN_SAFE_RADIUS: f32 = 250.0;
    pub const DEFAULT_JAGGEDNESS: f32 = 6.0;
    pub const DECORATION_RADIUS: f32 = 8.0;
    pub const DECORATION_NOISE_SCALE: f32 = 0.005;
    pub const DECORATION_NOISE_THRESHOLD: f32 = 0.08;
    /// Decorations per square unit of bounding box, scaled by theme density
    pub const DECORATION_AREA_FACTOR: f32 = 0.0001;

    /// Looping object sounds only play within this distance of the listener
    pub const AUDIBLE_RANGE: f32 = 350.0;
}

/// Rotate a vector by `degrees` (counter-clockwise in +x/+y space)
#[inline]
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Vector of `length` pointing along `degrees`
#[inline]
pub fn from_degrees(length: f32, degrees: f32) -> Vec2 {
    rotate_degrees(Vec2::new(length, 0.0), degrees)
}

/// Heading of a vector in degrees, in (-180, 180]. Zero vector → 0.
#[inline]
pub fn heading_degrees(v: Vec2) -> f32 {
    v.y.atan2(v.x).to_degrees()
}

/// Normalize an angle to [-180, 180)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Uniform float in [lo, hi]; a degenerate range returns `lo`
#[inline]
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    lo + (hi - lo) * rng.random::<f32>()
}

/// Index picked in proportion to `weights`; `None` when nothing can be picked
pub fn weighted_choice<R: Rng + ?Sized>(weights: &[f32], rng: &mut R) -> Option<usize> {
    WeightedIndex::new(weights)
        .ok()
        .map(|index| index.sample(rng))
}
