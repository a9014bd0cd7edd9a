//! Procedural level generation
//!
//! A level grows from a single attach point at the origin. Each step pops a
//! random pending attach point, builds a room there (a single jittered circle,
//! or a hand-authored preset room), turns it by up to 60° and queues the
//! room's own attach points. Once the room budget runs out the rooms are
//! flattened into world space and the level is finished off:
//! - objects near the spawn point are culled
//! - an exit goes in a boundary that is both far away and late in the walk
//! - a run exit goes next to the spawn point
//! - decorations are scattered in Perlin noise clumps
//! - the boundary overlap graph is handed to the pathfinder

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::boundary::{Boundary, BoundaryHandler};
use super::circle::{Circle, Positioned};
use super::creature;
use super::object::WorldObject;
use super::objects::ObjectHandler;
use super::pathfind::AStarPathfinder;
use super::perlin::PerlinNoise;
use super::props;
use super::verlet::PhysicsConfig;
use crate::consts::{
    DECORATION_AREA_FACTOR, DECORATION_NOISE_SCALE, DECORATION_NOISE_THRESHOLD, DECORATION_RADIUS,
    MAX_ROOMS, MIN_ROOMS, PRESET_ROOM_CHANCE, ROOM_TURN, SPAWN_SAFE_RADIUS,
};
use crate::data::{DataError, GameData, ThemePreset, Weighted};
use crate::{from_degrees, rotate_degrees, uniform, weighted_choice};

/// Placement attempts allowed per decoration before giving up
const DECORATION_ATTEMPTS: usize = 200;

/// A position and heading (degrees) where another room may be attached
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachPoint {
    pub pos: Vec2,
    pub rotation: f32,
}

/// A room in local coordinates, waiting to be placed
#[derive(Debug, Clone)]
pub struct LevelGeneratorRoom {
    pub objects: Vec<WorldObject>,
    pub boundaries: Vec<Boundary>,
    pub attach_points: Vec<AttachPoint>,
    pub position: Vec2,
    pub rotation: f32,
}

impl LevelGeneratorRoom {
    pub fn new(
        objects: Vec<WorldObject>,
        boundaries: Vec<Boundary>,
        attach_points: Vec<AttachPoint>,
    ) -> Self {
        Self {
            objects,
            boundaries,
            attach_points,
            position: Vec2::ZERO,
            rotation: 0.0,
        }
    }

    fn to_world(&self, local: Vec2) -> Vec2 {
        self.position + rotate_degrees(local, self.rotation)
    }

    /// The room's attach points in world space
    pub fn world_attach_points(&self) -> Vec<AttachPoint> {
        self.attach_points
            .iter()
            .map(|point| AttachPoint {
                pos: self.to_world(point.pos),
                rotation: point.rotation + self.rotation,
            })
            .collect()
    }

    /// Move everything into world space: rotate, then translate
    pub fn flatten(self) -> (Vec<WorldObject>, Vec<Boundary>) {
        let mut objects = self.objects;
        let mut boundaries = self.boundaries;
        let (position, rotation) = (self.position, self.rotation);
        let to_world = |local: Vec2| position + rotate_degrees(local, rotation);

        for object in &mut objects {
            let pos = to_world(object.actor.circle.pos());
            object.actor.place(pos);
        }
        for boundary in &mut boundaries {
            let pos = to_world(boundary.pos());
            boundary.circle.set_pos(pos);
        }
        (objects, boundaries)
    }
}

/// Everything one level is made of
#[derive(Debug, Clone)]
pub struct Level {
    pub counter: u32,
    pub theme_key: u32,
    pub name: String,
    pub boundaries: BoundaryHandler,
    pub objects: ObjectHandler,
    pub pathfinder: AStarPathfinder,
    pub physics: PhysicsConfig,
}

impl Level {
    /// Centre of the first boundary
    pub fn spawn_point(&self) -> Vec2 {
        self.boundaries
            .boundaries()
            .first()
            .map_or(Vec2::ZERO, |b| b.pos())
    }
}

#[derive(Debug, Clone)]
pub struct LevelGenerator {
    pub level_counter: u32,
    theme_key: Option<u32>,
    perlin: PerlinNoise,
    pub preset_room_chance: f32,
}

impl LevelGenerator {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            level_counter: 0,
            theme_key: None,
            perlin: PerlinNoise::new(rng),
            preset_room_chance: PRESET_ROOM_CHANCE,
        }
    }

    /// Key of the theme used for the last level
    pub fn theme_key(&self) -> Option<u32> {
        self.theme_key
    }

    /// Advance the level counter and generate the next level
    pub fn next_level<R: Rng + ?Sized>(
        &mut self,
        data: &GameData,
        rng: &mut R,
    ) -> Result<Level, DataError> {
        self.level_counter += 1;
        let (key, theme) = data.theme_for_level(self.level_counter)?;
        if self.theme_key != Some(key) {
            log::info!("Entering '{}' (theme {key})", theme.level_name);
            self.theme_key = Some(key);
        }
        let mut level = self.generate_level(data, theme, rng)?;
        level.counter = self.level_counter;
        level.theme_key = key;
        Ok(level)
    }

    pub fn generate_level<R: Rng + ?Sized>(
        &self,
        data: &GameData,
        theme: &ThemePreset,
        rng: &mut R,
    ) -> Result<Level, DataError> {
        let mut attach_points = vec![AttachPoint {
            pos: Vec2::ZERO,
            rotation: uniform(rng, 0.0, 360.0),
        }];
        let mut rooms = Vec::new();
        let mut budget = rng.random_range(MIN_ROOMS..=MAX_ROOMS);
        while budget > 0 && !attach_points.is_empty() {
            let index = rng.random_range(0..attach_points.len());
            let attach = attach_points.remove(index);
            let mut room = self.generate_room(data, theme, rng)?;
            room.position = attach.pos;
            room.rotation = attach.rotation + uniform(rng, -ROOM_TURN, ROOM_TURN);
            attach_points.extend(room.world_attach_points());
            rooms.push(room);
            budget -= 1;
        }
        let room_count = rooms.len();

        let mut all_objects = Vec::new();
        let mut all_boundaries = Vec::new();
        for room in rooms {
            let (objects, boundaries) = room.flatten();
            all_objects.extend(objects);
            all_boundaries.extend(boundaries);
        }

        let mut objects = ObjectHandler::new();
        for object in all_objects {
            if !object.is_exit() && object.pos().length() < SPAWN_SAFE_RADIUS {
                continue;
            }
            objects.add_object(object);
        }

        let mut boundaries = BoundaryHandler::new();
        boundaries.extend(all_boundaries);

        if let Some(exit_at) = exit_position(&boundaries) {
            objects.add_object(props::exit(exit_at));
        }
        if let Some(first) = boundaries.boundaries().first() {
            let offset = from_degrees(first.radius() * 0.5, uniform(rng, 0.0, 360.0));
            objects.add_object(props::run_exit(first.pos() + offset));
        } else {
            log::warn!("Level has no boundaries; skipping exits");
        }

        self.decorate(theme, &boundaries, &mut objects, rng);

        let mut pathfinder = AStarPathfinder::new();
        let (nodes, edges) = boundaries.generate_nodes_and_edges();
        pathfinder.setup_graph(&nodes, &edges);

        log::info!(
            "Generated '{}': {room_count} rooms, {} boundaries, {} objects",
            theme.level_name,
            boundaries.len(),
            objects.len()
        );

        Ok(Level {
            counter: self.level_counter,
            theme_key: self.theme_key.unwrap_or_default(),
            name: theme.level_name.clone(),
            boundaries,
            objects,
            pathfinder,
            physics: PhysicsConfig {
                friction: theme.friction,
                traction: theme.traction,
            },
        })
    }

    /// Usually a simple room; a preset room when the theme has some and the dice say so
    pub fn generate_room<R: Rng + ?Sized>(
        &self,
        data: &GameData,
        theme: &ThemePreset,
        rng: &mut R,
    ) -> Result<LevelGeneratorRoom, DataError> {
        let roll = rng.random::<f32>();
        if roll < 1.0 - self.preset_room_chance || theme.preset_rooms.is_empty() {
            self.generate_simple_room(data, theme, rng)
        } else {
            self.generate_preset_room(data, theme, rng)
        }
    }

    /// One circle whose rim passes through the local origin
    pub fn generate_simple_room<R: Rng + ?Sized>(
        &self,
        data: &GameData,
        theme: &ThemePreset,
        rng: &mut R,
    ) -> Result<LevelGeneratorRoom, DataError> {
        let radius = uniform(rng, 40.0, 150.0);
        let centre = Vec2::new(radius, 0.0);
        let boundaries = vec![Boundary::new(centre, radius, theme.jaggedness, rng)];

        let mut attach_points = Vec::new();
        while attach_points.is_empty() || (rng.random::<f32>() > 0.7 && attach_points.len() < 2) {
            attach_points.push(AttachPoint {
                pos: from_degrees(radius - 20.0, uniform(rng, -60.0, 60.0)) + centre,
                rotation: 0.0,
            });
        }

        let mut objects = Vec::new();
        let mut placed = 0;
        while rng.random::<f32>() > 0.6 && placed < 2 {
            let Some(id) = pick(&theme.possible_objects, rng) else {
                break;
            };
            let pos = from_degrees(uniform(rng, radius * 0.5, radius - 20.0), uniform(rng, 0.0, 360.0));
            objects.push(props::prop(data, id, pos + centre)?);
            placed += 1;
        }

        placed = 0;
        while rng.random::<f32>() > 0.6 && placed < 2 {
            let Some(id) = pick(&theme.possible_enemies, rng) else {
                break;
            };
            let pos = from_degrees(uniform(rng, 0.0, radius - 20.0), uniform(rng, 0.0, 360.0));
            objects.push(creature::spawn(data, id, pos + centre)?);
            placed += 1;
        }

        placed = 0;
        while rng.random::<f32>() > 0.8 && placed < 2 {
            if theme.possible_chest_items.is_empty() {
                break;
            }
            let count = rng.random_range(1..=3);
            let contents: Vec<u32> = (0..count)
                .filter_map(|_| pick(&theme.possible_chest_items, rng))
                .collect();
            let pos = from_degrees(uniform(rng, 0.0, radius - 20.0), uniform(rng, 0.0, 360.0));
            objects.push(props::chest(pos + centre, contents));
            placed += 1;
        }

        Ok(LevelGeneratorRoom::new(objects, boundaries, attach_points))
    }

    /// A random hand-authored room from the theme
    pub fn generate_preset_room<R: Rng + ?Sized>(
        &self,
        data: &GameData,
        theme: &ThemePreset,
        rng: &mut R,
    ) -> Result<LevelGeneratorRoom, DataError> {
        let Some(key) = theme.preset_rooms.choose(rng) else {
            return self.generate_simple_room(data, theme, rng);
        };
        log::debug!("Preset room '{key}'");
        build_preset_room(data, key, theme.jaggedness, rng)
    }

    /// Scatter decorations where the noise is high enough and the circle fits inside
    fn decorate<R: Rng + ?Sized>(
        &self,
        theme: &ThemePreset,
        boundaries: &BoundaryHandler,
        objects: &mut ObjectHandler,
        rng: &mut R,
    ) {
        if theme.decoration_objects.is_empty() || theme.decoration_density <= 0.0 {
            return;
        }
        let Some(area) = boundaries.bounding_box() else {
            return;
        };
        let wanted = (area.area() * DECORATION_AREA_FACTOR * theme.decoration_density).ceil() as usize;
        let max_attempts = wanted.saturating_mul(DECORATION_ATTEMPTS);
        log::debug!("Scattering up to {wanted} decorations");

        let mut placed = 0;
        let mut attempts = 0;
        while placed < wanted {
            if attempts >= max_attempts {
                log::warn!("Placed {placed} of {wanted} decorations before giving up");
                break;
            }
            attempts += 1;

            let pos = Vec2::new(
                uniform(rng, area.min.x, area.max.x),
                uniform(rng, area.min.y, area.max.y),
            );
            let value = self.perlin.noise(pos.x, pos.y, DECORATION_NOISE_SCALE) / 2.0;
            if value < DECORATION_NOISE_THRESHOLD {
                continue;
            }
            let Some(&sprite) = theme.decoration_objects.choose(rng) else {
                break;
            };
            if !boundaries.circle_inside(&Circle::new(pos, DECORATION_RADIUS)) {
                continue;
            }
            objects.add_object(props::decoration(pos, DECORATION_RADIUS, sprite));
            placed += 1;
        }
    }
}

/// Build a preset room at its authored local positions
pub fn build_preset_room<R: Rng + ?Sized>(
    data: &GameData,
    key: &str,
    jaggedness: f32,
    rng: &mut R,
) -> Result<LevelGeneratorRoom, DataError> {
    let preset = data.preset_room(key)?;
    let mut objects = Vec::new();
    for placement in &preset.objects {
        objects.push(props::prop(data, placement.id, placement.pos)?);
    }
    for placement in &preset.enemies {
        objects.push(creature::spawn(data, placement.id, placement.pos)?);
    }
    for chest in &preset.chests {
        objects.push(props::chest(chest.pos, chest.items.clone()));
    }
    let boundaries = preset
        .boundaries
        .iter()
        .map(|b| Boundary::new(b.pos, b.radius, jaggedness, rng))
        .collect();
    let attach_points = preset
        .attach_points
        .iter()
        .map(|&(pos, rotation)| AttachPoint { pos, rotation })
        .collect();
    Ok(LevelGeneratorRoom::new(objects, boundaries, attach_points))
}

fn pick<R: Rng + ?Sized>(options: &[Weighted], rng: &mut R) -> Option<u32> {
    let weights: Vec<f32> = options.iter().map(|&(_, w)| w).collect();
    weighted_choice(&weights, rng).map(|index| options[index].0)
}

/// Boundary maximising `sqrt(index) * distance from origin`; later ones win ties
fn exit_position(boundaries: &BoundaryHandler) -> Option<Vec2> {
    let mut best: Option<(f32, Vec2)> = None;
    for (i, boundary) in boundaries.boundaries().iter().enumerate() {
        let score = (i as f32).sqrt() * boundary.pos().length();
        if best.is_none_or(|(top, _)| score >= top) {
            best = Some((score, boundary.pos()));
        }
    }
    best.map(|(_, pos)| pos)
}
