//! Game state and core simulation types
//!
//! Everything a run needs between ticks lives in [`GameState`]: the seeded RNG,
//! the data bundle, the level generator and the current level. The host talks
//! to it through [`super::tick`] and drains [`GameEvent`]s after every tick.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::levelgen::{Level, LevelGenerator};
use super::object::{ObjectId, ObjectKind, WorldObject};
use super::player::{Player, player_object, weapon_object};
use crate::audio::{SoundGroup, SoundRequest};
use crate::data::{DataError, GameData};

/// Facing the player starts each level with (degrees)
const SPAWN_ROTATION: f32 = 90.0;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    /// The player left through a run exit
    RunComplete,
    GameOver,
}

/// Something the host should react to
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Sound(SoundRequest),
    StopSoundGroup(SoundGroup),
    CameraShake(f32),
    /// Text for the message log
    Message(String),
    ObjectDied { id: ObjectId, pos: Vec2 },
    LevelEntered { counter: u32, name: String },
    RunEnded { loot_value: u32 },
    PlayerDied,
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub data: GameData,
    pub generator: LevelGenerator,
    pub level: Level,
    pub player_id: ObjectId,
    pub weapon_id: ObjectId,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Start a run on the first level
    pub fn new(seed: u64, data: GameData) -> Result<Self, DataError> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut generator = LevelGenerator::new(&mut rng);
        let level = generator.next_level(&data, &mut rng)?;
        log::info!("New run with seed {seed}");

        let mut state = Self {
            seed,
            rng,
            time_ticks: 0,
            phase: GamePhase::Playing,
            data,
            generator,
            level,
            player_id: ObjectId::default(),
            weapon_id: ObjectId::default(),
            events: Vec::new(),
        };
        let player = player_object(Vec2::ZERO);
        let weapon = weapon_object(ObjectId::default(), Vec2::ZERO);
        state.enter_level(player, weapon);
        Ok(state)
    }

    /// Generate the next level and carry the player and weapon over
    pub fn next_level(&mut self) -> Result<(), DataError> {
        let level = self.generator.next_level(&self.data, &mut self.rng)?;
        let mut previous = std::mem::replace(&mut self.level, level);

        let player = previous
            .objects
            .remove_object(self.player_id)
            .unwrap_or_else(|| player_object(Vec2::ZERO));
        let weapon = previous
            .objects
            .remove_object(self.weapon_id)
            .unwrap_or_else(|| weapon_object(ObjectId::default(), Vec2::ZERO));
        self.enter_level(player, weapon);
        Ok(())
    }

    fn enter_level(&mut self, mut player: WorldObject, mut weapon: WorldObject) {
        let spawn = self.level.spawn_point();

        player.actor.place(spawn);
        player.actor.rotation = SPAWN_ROTATION;
        if let Some(body) = player.actor.body.as_mut() {
            body.forget_boundaries();
        }
        self.player_id = self.level.objects.add_object(player);

        weapon.actor.place(spawn);
        if let Some(body) = weapon.actor.body.as_mut() {
            body.forget_boundaries();
        }
        if let ObjectKind::Weapon(w) = &mut weapon.kind {
            w.owner = self.player_id;
        }
        self.weapon_id = self.level.objects.add_object(weapon);

        log::info!(
            "Entered level {} ({}) at {spawn}",
            self.level.counter,
            self.level.name
        );
        self.events
            .push(GameEvent::Sound(SoundRequest::new("boom.ogg").pitch(0.75)));
        self.events.push(GameEvent::LevelEntered {
            counter: self.level.counter,
            name: self.level.name.clone(),
        });
    }

    pub fn player_object(&self) -> Option<&WorldObject> {
        self.level.objects.get(self.player_id)
    }

    pub fn player(&self) -> Option<&Player> {
        self.player_object().and_then(|o| o.as_player())
    }

    /// Value of everything the player carries
    pub fn loot_value(&self) -> u32 {
        self.player()
            .map_or(0, |p| p.gear.inventory.loot_value(&self.data))
    }

    /// Where the camera should look: slightly ahead of the player
    pub fn camera_target(&self) -> Vec2 {
        self.player_object()
            .map_or(Vec2::ZERO, |o| o.camera_target_pos())
    }

    /// Take the events produced so far
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
