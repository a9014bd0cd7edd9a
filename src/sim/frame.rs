//! Per-tick context
//!
//! A [`Frame`] is handed to every object while the handler walks the object
//! list. It exposes the level (boundaries, pathfinder, physics), the data
//! bundle, the RNG and the input, and collects two kinds of output:
//! - Events for the host (sounds, messages, camera shake), pushed immediately
//! - [`Commands`] that touch the object list itself, applied by the handler
//!   between the update and collision passes and again after collisions

use glam::Vec2;
use rand_pcg::Pcg32;

use super::boundary::BoundaryHandler;
use super::object::{ObjectId, WorldObject};
use super::pathfind::AStarPathfinder;
use super::props;
use super::state::GameEvent;
use super::tick::TickInput;
use super::verlet::PhysicsConfig;
use crate::GameData;
use crate::audio::{SoundGroup, SoundRequest};
use crate::consts::FPS;

/// Snapshot of the player taken before objects read it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    pub id: ObjectId,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub rotation: f32,
    pub equipped: Option<EquippedView>,
}

/// The item currently held by the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquippedView {
    pub item: u32,
    pub radius: f32,
    pub attack_damage: f32,
}

/// Run-level changes requested from inside a collision or update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NextLevel,
    EndRun,
    GameOver,
}

/// Deferred changes to the object list
#[derive(Debug, Default)]
pub struct Commands {
    pub spawns: Vec<WorldObject>,
    pub despawns: Vec<ObjectId>,
    /// Items the player (or its weapon) grabbed this frame
    pub pickups: Vec<ObjectId>,
    /// Successful weapon hits, each costing the equipped item one durability
    pub wear: u32,
    pub transition: Option<Transition>,
}

pub struct Frame<'a> {
    pub boundaries: &'a BoundaryHandler,
    pub pathfinder: &'a mut AStarPathfinder,
    pub physics: PhysicsConfig,
    pub data: &'a GameData,
    pub rng: &'a mut Pcg32,
    pub input: &'a TickInput,
    pub time_ticks: u64,
    pub player: Option<PlayerView>,
    pub events: &'a mut Vec<GameEvent>,
    pub commands: Commands,
}

impl Frame<'_> {
    pub fn time_secs(&self) -> f32 {
        self.time_ticks as f32 / FPS as f32
    }

    /// Where ambient sounds are heard from
    pub fn listener_pos(&self) -> Option<Vec2> {
        self.input.listener_pos.or(self.player.map(|p| p.pos))
    }

    pub fn play(&mut self, request: SoundRequest) {
        self.events.push(GameEvent::Sound(request));
    }

    pub fn is_group_playing(&self, group: &SoundGroup) -> bool {
        self.input.playing_sound_groups.contains(group)
    }

    pub fn stop_group(&mut self, group: SoundGroup) {
        self.events.push(GameEvent::StopSoundGroup(group));
    }

    pub fn message(&mut self, text: impl Into<String>) {
        self.events.push(GameEvent::Message(text.into()));
    }

    pub fn shake(&mut self, amount: f32) {
        if amount > 0.0 {
            self.events.push(GameEvent::CameraShake(amount));
        }
    }

    pub fn spawn(&mut self, object: WorldObject) {
        self.commands.spawns.push(object);
    }

    pub fn despawn(&mut self, id: ObjectId) {
        if !self.is_despawned(id) {
            self.commands.despawns.push(id);
        }
    }

    pub fn is_despawned(&self, id: ObjectId) -> bool {
        self.commands.despawns.contains(&id)
    }

    /// The first request of a frame wins
    pub fn request(&mut self, transition: Transition) {
        if self.commands.transition.is_none() {
            log::debug!("Transition requested: {transition:?}");
            self.commands.transition = Some(transition);
        }
    }

    /// Scatter `count` particles of a preset from `pos`
    pub fn spawn_particles(
        &mut self,
        preset: u32,
        pos: Vec2,
        count: usize,
        velocity: Vec2,
        colour: Option<[u8; 3]>,
    ) {
        let data = self.data;
        let preset = match data.particle(preset) {
            Ok(preset) => preset,
            Err(e) => {
                log::error!("{e}");
                return;
            }
        };
        for _ in 0..count {
            let particle = props::particle(preset, pos, velocity, colour, self.rng);
            self.commands.spawns.push(particle);
        }
    }

    /// Drop an item at rest at `pos`, then push it by `kick`
    pub fn spawn_item(&mut self, item: u32, durability: Option<i32>, pos: Vec2, kick: Vec2) {
        match props::item(self.data, item, durability, pos) {
            Ok(mut object) => {
                if let Some(body) = object.actor.body.as_mut() {
                    body.accelerate(kick);
                }
                self.commands.spawns.push(object);
            }
            Err(e) => log::error!("{e}"),
        }
    }
}
