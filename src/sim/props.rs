//! Level furniture
//!
//! Props, chests, exits, loose items, particles and decorations, plus the
//! factories that build them from data.

use glam::Vec2;
use rand::Rng;

use super::frame::Frame;
use super::object::{Actor, AnimationKey, ObjectKind, WorldObject};
use super::state_machine::{State, StateMachine};
use crate::audio::{SoundGroup, SoundRequest};
use crate::consts::AUDIBLE_RANGE;
use crate::data::{DataError, GameData, ParticlePreset};
use crate::{from_degrees, uniform};

pub const CHEST_RADIUS: f32 = 10.0;
pub const EXIT_RADIUS: f32 = 8.0;
/// Height particles are launched from
pub const PARTICLE_START_HEIGHT: f32 = 8.0;
const PARTICLE_GRAVITY: f32 = 0.1;

/// Static object with an optional ambient loop
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub preset: u32,
    pub sound: Option<String>,
    pub playing: bool,
}

impl Prop {
    /// Start the loop when the listener comes in range, stop it when it leaves
    pub fn update(&mut self, actor: &mut Actor, frame: &mut Frame<'_>) {
        let Some(sound) = &self.sound else {
            return;
        };
        let audible = frame
            .listener_pos()
            .is_some_and(|listener| listener.distance(actor.circle.pos()) < AUDIBLE_RANGE);
        let group = SoundGroup::Object(actor.id);
        if audible && !self.playing {
            frame.play(
                SoundRequest::new(sound)
                    .at(actor.circle.pos())
                    .group(group)
                    .looping(),
            );
            self.playing = true;
        } else if !audible && self.playing {
            frame.stop_group(group);
            self.playing = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChestState {
    Closed,
    Open,
}

pub struct ChestCtx<'c, 'a> {
    pub actor: &'c mut Actor,
    pub contents: &'c [u32],
    pub frame: &'c mut Frame<'a>,
    pub other: &'c WorldObject,
}

impl<'c, 'a> State<ChestCtx<'c, 'a>> for ChestState {
    fn enter(&mut self, ctx: &mut ChestCtx<'c, 'a>) {
        match self {
            ChestState::Closed => ctx.actor.set_animation(AnimationKey::Closed),
            ChestState::Open => {
                let pos = ctx.actor.circle.pos();
                ctx.actor.collidable = false;
                ctx.actor.set_animation(AnimationKey::Open);
                let pitch = uniform(ctx.frame.rng, 0.9, 1.1);
                ctx.frame.play(SoundRequest::new("chest.ogg").at(pos).pitch(pitch));
                for &item in ctx.contents {
                    let offset =
                        from_degrees(uniform(ctx.frame.rng, 5.0, 10.0), uniform(ctx.frame.rng, 0.0, 360.0));
                    ctx.frame.spawn_item(item, None, pos + offset, Vec2::ZERO);
                }
            }
        }
    }

    fn collide(&mut self, ctx: &mut ChestCtx<'c, 'a>) -> Option<Self> {
        (*self == ChestState::Closed && ctx.other.is_player()).then_some(ChestState::Open)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chest {
    pub contents: Vec<u32>,
    pub state: StateMachine<ChestState>,
}

impl Chest {
    pub fn new(contents: Vec<u32>) -> Self {
        Self {
            contents,
            state: StateMachine::new(ChestState::Closed),
        }
    }

    pub fn is_open(&self) -> bool {
        *self.state.current() == ChestState::Open
    }

    pub fn collide(&mut self, actor: &mut Actor, other: &WorldObject, frame: &mut Frame<'_>) {
        let mut ctx = ChestCtx {
            actor,
            contents: &self.contents,
            frame,
            other,
        };
        self.state.collide(&mut ctx);
    }
}

/// An item lying in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub id: u32,
    pub durability: i32,
}

/// Ballistic particle with a fake height
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub colour: [u8; 3],
    pub z: f32,
    pub z_velocity: f32,
    pub velocity: Vec2,
}

impl Particle {
    /// Fall under gravity; freeze once landed
    pub fn update(&mut self, actor: &mut Actor) {
        if self.z <= 0.0 {
            self.z = 0.0;
            return;
        }
        self.z_velocity -= PARTICLE_GRAVITY;
        self.z += self.z_velocity;
        actor.circle.translate(self.velocity);
    }

    pub fn has_landed(&self) -> bool {
        self.z <= 0.0
    }
}

pub fn prop(data: &GameData, id: u32, pos: Vec2) -> Result<WorldObject, DataError> {
    let preset = data.object(id)?;
    let mut actor = Actor::new(pos, preset.radius);
    actor.collidable = preset.collidable;
    let prop = Prop {
        preset: id,
        sound: preset.sound.clone(),
        playing: false,
    };
    Ok(WorldObject::new(actor, ObjectKind::Prop(prop)))
}

pub fn chest(pos: Vec2, contents: Vec<u32>) -> WorldObject {
    let mut actor = Actor::new(pos, CHEST_RADIUS);
    actor.set_animation(AnimationKey::Closed);
    WorldObject::new(actor, ObjectKind::Chest(Chest::new(contents)))
}

pub fn exit(pos: Vec2) -> WorldObject {
    WorldObject::new(Actor::new(pos, EXIT_RADIUS), ObjectKind::Exit)
}

pub fn run_exit(pos: Vec2) -> WorldObject {
    WorldObject::new(Actor::new(pos, EXIT_RADIUS), ObjectKind::RunExit)
}

pub fn decoration(pos: Vec2, radius: f32, sprite: u32) -> WorldObject {
    let mut actor = Actor::new(pos, radius);
    actor.collidable = false;
    WorldObject::new(actor, ObjectKind::Decoration { sprite })
}

/// A loose item; `durability` defaults to the preset's
pub fn item(
    data: &GameData,
    id: u32,
    durability: Option<i32>,
    pos: Vec2,
) -> Result<WorldObject, DataError> {
    let preset = data.item(id)?;
    let actor = Actor::new(pos, preset.radius).with_body();
    let item = Item {
        id,
        durability: durability.unwrap_or(preset.durability),
    };
    Ok(WorldObject::new(actor, ObjectKind::Item(item)))
}

/// One particle flung from `pos`, inheriting `velocity`
pub fn particle<R: Rng + ?Sized>(
    preset: &ParticlePreset,
    pos: Vec2,
    velocity: Vec2,
    colour: Option<[u8; 3]>,
    rng: &mut R,
) -> WorldObject {
    let (v_lo, v_hi) = preset.velocity;
    let (z_lo, z_hi) = preset.z_velocity;
    let (r_lo, r_hi) = preset.radius;
    let speed = uniform(rng, v_lo, v_hi);
    let direction = uniform(rng, 0.0, 360.0);
    let particle = Particle {
        colour: colour.unwrap_or(preset.colour),
        z: PARTICLE_START_HEIGHT,
        z_velocity: uniform(rng, z_lo, z_hi),
        velocity: from_degrees(speed, direction) + velocity,
    };
    let mut actor = Actor::new(pos, uniform(rng, r_lo, r_hi));
    actor.collidable = false;
    WorldObject::new(actor, ObjectKind::Particle(particle))
}
