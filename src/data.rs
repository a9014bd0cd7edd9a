//! Data-driven presets
//!
//! Everything the asset loader hands to the core: level themes, preset rooms and
//! the item / prop / creature / status-effect / particle tables. Ids are indices
//! into the tables; themes are keyed by the first level number they apply to.
//!
//! A bundle is validated once when it is loaded, so a dangling id fails fast
//! instead of surfacing halfway through a run.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_FRICTION, DEFAULT_JAGGEDNESS, DEFAULT_TRACTION};

/// An id paired with a selection weight
pub type Weighted = (u32, f32);

/// Missing or malformed game data
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to parse game data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown item id {0}")]
    UnknownItem(u32),
    #[error("unknown object id {0}")]
    UnknownObject(u32),
    #[error("unknown creature id {0}")]
    UnknownCreature(u32),
    #[error("unknown status effect id {0}")]
    UnknownStatusEffect(u32),
    #[error("unknown particle effect id {0}")]
    UnknownParticleEffect(u32),
    #[error("unknown preset room '{0}'")]
    UnknownPresetRoom(String),
    #[error("no level theme covers level {0}")]
    NoTheme(u32),
}

fn default_friction() -> f32 {
    DEFAULT_FRICTION
}

fn default_traction() -> f32 {
    DEFAULT_TRACTION
}

fn default_jaggedness() -> f32 {
    DEFAULT_JAGGEDNESS
}

fn default_item_radius() -> f32 {
    8.0
}

fn default_true() -> bool {
    true
}

fn default_chance() -> f32 {
    1.0
}

fn default_blood() -> Option<[u8; 3]> {
    Some([138, 0, 39])
}

fn default_flash_rate() -> f32 {
    5.0
}

fn default_status_colour() -> [u8; 3] {
    [255, 0, 0]
}

/// Parameters for one level theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemePreset {
    pub level_name: String,
    #[serde(default)]
    pub possible_objects: Vec<Weighted>,
    #[serde(default)]
    pub possible_enemies: Vec<Weighted>,
    #[serde(default)]
    pub possible_chest_items: Vec<Weighted>,
    /// Keys into `GameData::preset_rooms`
    #[serde(default)]
    pub preset_rooms: Vec<String>,
    /// Sprite indices for decorations
    #[serde(default)]
    pub decoration_objects: Vec<u32>,
    #[serde(default)]
    pub decoration_density: f32,
    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default = "default_traction")]
    pub traction: f32,
    /// Maximum inward jitter of boundary outlines
    #[serde(default = "default_jaggedness")]
    pub jaggedness: f32,
}

/// A preset id placed at a room-local position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: u32,
    pub pos: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChestPlacement {
    pub pos: Vec2,
    pub items: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryPlacement {
    pub pos: Vec2,
    pub radius: f32,
}

/// Hand-authored room geometry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetRoom {
    #[serde(default)]
    pub objects: Vec<Placement>,
    #[serde(default)]
    pub enemies: Vec<Placement>,
    #[serde(default)]
    pub chests: Vec<ChestPlacement>,
    #[serde(default)]
    pub boundaries: Vec<BoundaryPlacement>,
    /// (position, rotation in degrees)
    #[serde(default)]
    pub attach_points: Vec<(Vec2, f32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPreset {
    pub name: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub attack_damage: f32,
    #[serde(default)]
    pub consume_hp: f32,
    /// Hits before breaking, -1 = unbreakable
    #[serde(default = "default_unbreakable")]
    pub durability: i32,
    #[serde(default)]
    pub removes_status_effects: Vec<u32>,
    #[serde(default = "default_item_radius")]
    pub radius: f32,
}

fn default_unbreakable() -> i32 {
    -1
}

/// A static level object (rocks, torches, campfires...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropPreset {
    pub name: String,
    pub radius: f32,
    /// Looping positional sound played while the prop is audible
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default = "default_true")]
    pub collidable: bool,
}

/// How a creature moves once it has noticed the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MovementStyle {
    /// Pathfind towards the player with a wide random wobble
    #[default]
    Chase,
    /// Pathfind towards the player, but only push off every `stride` ticks
    Slither { stride: u32 },
    /// Pathfind loosely with heavy jitter (clouds, bubbles)
    Drift,
    /// Run away from the player
    Flee,
}

/// What happens when a creature's hp reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeathStyle {
    /// Leave the level, dropping loot
    #[default]
    Remove,
    /// Collapse for `ticks`, then stand back up at full health
    Revive { ticks: u32 },
    /// Burst into `min..=max` creatures of species `into`
    Split { into: u32, min: u32, max: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreaturePreset {
    pub name: String,
    pub max_hp: f32,
    pub speed: f32,
    #[serde(default)]
    pub attack_damage: f32,
    pub radius: f32,
    #[serde(default)]
    pub drops: Vec<Weighted>,
    /// `null` disables blood particles
    #[serde(default = "default_blood")]
    pub blood_colour: Option<[u8; 3]>,
    #[serde(default)]
    pub invulnerable: bool,
    #[serde(default)]
    pub attack_status_effect: Option<u32>,
    #[serde(default = "default_chance")]
    pub attack_status_effect_chance: f32,
    #[serde(default)]
    pub movement: MovementStyle,
    #[serde(default)]
    pub death: DeathStyle,
    /// Occasionally played while following the player
    #[serde(default)]
    pub following_sound: Option<String>,
}

/// Named speed curves for status effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedCurve {
    /// sin(t * 2): staggers back and forth
    #[serde(rename = "mushroom")]
    Mushroom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpeedMultiplier {
    Fixed(f32),
    Curve(SpeedCurve),
}

impl Default for SpeedMultiplier {
    fn default() -> Self {
        SpeedMultiplier::Fixed(1.0)
    }
}

impl SpeedMultiplier {
    /// Multiplier at `time_secs` into the run
    pub fn at(&self, time_secs: f32) -> f32 {
        match self {
            SpeedMultiplier::Fixed(m) => *m,
            SpeedMultiplier::Curve(SpeedCurve::Mushroom) => (time_secs * 2.0).sin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEffectPreset {
    /// Ticks until the effect wears off, `None` = until cured
    #[serde(default)]
    pub active_timer: Option<u32>,
    #[serde(default)]
    pub damage: f32,
    /// Ticks between damage applications
    #[serde(default)]
    pub damage_timer: u32,
    #[serde(default)]
    pub speed_multiplier: SpeedMultiplier,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_status_colour")]
    pub colour: [u8; 3],
    #[serde(default)]
    pub screen_shake: f32,
    #[serde(default = "default_flash_rate")]
    pub flash_rate: f32,
    #[serde(default)]
    pub sound: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticlePreset {
    pub colour: [u8; 3],
    pub velocity: (f32, f32),
    pub z_velocity: (f32, f32),
    pub radius: (f32, f32),
}

/// The complete, validated data bundle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default)]
    pub items: Vec<ItemPreset>,
    #[serde(default)]
    pub objects: Vec<PropPreset>,
    #[serde(default)]
    pub creatures: Vec<CreaturePreset>,
    #[serde(default)]
    pub status_effects: Vec<StatusEffectPreset>,
    #[serde(default)]
    pub particles: Vec<ParticlePreset>,
    /// Keyed by the first level number the theme applies to
    #[serde(default)]
    pub themes: BTreeMap<u32, ThemePreset>,
    #[serde(default)]
    pub preset_rooms: BTreeMap<String, PresetRoom>,
}

/// Particle preset used for blood
pub const BLOOD_PARTICLES: u32 = 0;

impl GameData {
    /// Parse and validate a JSON bundle
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let data: GameData = serde_json::from_str(json)?;
        data.validate()?;
        log::info!(
            "Loaded game data: {} themes, {} preset rooms, {} creatures, {} items",
            data.themes.len(),
            data.preset_rooms.len(),
            data.creatures.len(),
            data.items.len()
        );
        Ok(data)
    }

    pub fn item(&self, id: u32) -> Result<&ItemPreset, DataError> {
        self.items.get(id as usize).ok_or(DataError::UnknownItem(id))
    }

    pub fn object(&self, id: u32) -> Result<&PropPreset, DataError> {
        self.objects.get(id as usize).ok_or(DataError::UnknownObject(id))
    }

    pub fn creature(&self, id: u32) -> Result<&CreaturePreset, DataError> {
        self.creatures
            .get(id as usize)
            .ok_or(DataError::UnknownCreature(id))
    }

    pub fn status_effect(&self, id: u32) -> Result<&StatusEffectPreset, DataError> {
        self.status_effects
            .get(id as usize)
            .ok_or(DataError::UnknownStatusEffect(id))
    }

    pub fn particle(&self, id: u32) -> Result<&ParticlePreset, DataError> {
        self.particles
            .get(id as usize)
            .ok_or(DataError::UnknownParticleEffect(id))
    }

    pub fn preset_room(&self, key: &str) -> Result<&PresetRoom, DataError> {
        self.preset_rooms
            .get(key)
            .ok_or_else(|| DataError::UnknownPresetRoom(key.to_string()))
    }

    /// The theme with the highest key not above `level`
    pub fn theme_for_level(&self, level: u32) -> Result<(u32, &ThemePreset), DataError> {
        self.themes
            .range(..=level)
            .next_back()
            .map(|(key, theme)| (*key, theme))
            .ok_or(DataError::NoTheme(level))
    }

    /// Check every cross-reference in the bundle
    pub fn validate(&self) -> Result<(), DataError> {
        for theme in self.themes.values() {
            for (id, _) in &theme.possible_objects {
                self.object(*id)?;
            }
            for (id, _) in &theme.possible_enemies {
                self.creature(*id)?;
            }
            for (id, _) in &theme.possible_chest_items {
                self.item(*id)?;
            }
            for key in &theme.preset_rooms {
                self.preset_room(key)?;
            }
        }

        for room in self.preset_rooms.values() {
            for placement in &room.objects {
                self.object(placement.id)?;
            }
            for placement in &room.enemies {
                self.creature(placement.id)?;
            }
            for chest in &room.chests {
                for id in &chest.items {
                    self.item(*id)?;
                }
            }
        }

        for creature in &self.creatures {
            for (id, _) in &creature.drops {
                self.item(*id)?;
            }
            if let Some(effect) = creature.attack_status_effect {
                self.status_effect(effect)?;
            }
            if let DeathStyle::Split { into, .. } = creature.death {
                self.creature(into)?;
            }
        }

        for item in &self.items {
            for id in &item.removes_status_effects {
                self.status_effect(*id)?;
            }
        }

        Ok(())
    }
}
