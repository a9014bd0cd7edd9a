//! World objects
//!
//! Every thing in a level is a [`WorldObject`]: an [`Actor`] holding the
//! capabilities it has (a circle, optionally a Verlet body and entity vitals)
//! plus an [`ObjectKind`] with the behaviour specific to it.
//!
//! Update order for one object:
//! 1. Weapons first follow their owner
//! 2. Verlet integration for objects with a body
//! 3. Kind-specific behaviour (state machines, sounds)
//! 4. Snap back inside the boundaries

use glam::Vec2;

use super::circle::{Circle, Positioned};
use super::creature::Creature;
use super::entity::Entity;
use super::frame::{Frame, Transition};
use super::player::{self, Player, Weapon};
use super::props::{Chest, Item, Particle, Prop};
use super::verlet::VerletBody;
use crate::consts::CAMERA_LEAD;

/// Stable handle of an object within one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(pub u32);

/// Named animation the renderer should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationKey {
    #[default]
    Idle,
    Moving,
    Dead,
    Open,
    Closed,
}

/// Capabilities shared by all object kinds
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ObjectId,
    pub circle: Circle,
    pub collidable: bool,
    /// Facing in degrees
    pub rotation: f32,
    pub flipped: bool,
    pub animation: AnimationKey,
    pub body: Option<VerletBody>,
    pub vitals: Option<Entity>,
}

impl Actor {
    /// A static, collidable actor
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            id: ObjectId::default(),
            circle: Circle::new(pos, radius),
            collidable: true,
            rotation: 0.0,
            flipped: false,
            animation: AnimationKey::Idle,
            body: None,
            vitals: None,
        }
    }

    /// Give the actor a Verlet body at rest
    pub fn with_body(mut self) -> Self {
        self.body = Some(VerletBody::at(self.circle.pos()));
        self
    }

    pub fn with_vitals(mut self, vitals: Entity) -> Self {
        self.vitals = Some(vitals);
        self
    }

    pub fn velocity(&self) -> Vec2 {
        self.body.as_ref().map_or(Vec2::ZERO, |body| body.velocity)
    }

    pub fn accelerate(&mut self, by: Vec2) {
        if let Some(body) = self.body.as_mut() {
            body.accelerate(by);
        }
    }

    /// Teleport without introducing velocity
    pub fn place(&mut self, pos: Vec2) {
        match self.body.as_mut() {
            Some(body) => body.place(&mut self.circle, pos),
            None => self.circle.set_pos(pos),
        }
    }

    pub fn set_animation(&mut self, animation: AnimationKey) {
        self.animation = animation;
    }

    pub fn is_verlet(&self) -> bool {
        self.body.is_some()
    }
}

impl Positioned for Actor {
    fn circle(&self) -> &Circle {
        &self.circle
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Background scenery: drawn, never updated, never collides
    Decoration { sprite: u32 },
    Prop(Prop),
    Chest(Chest),
    Exit,
    RunExit,
    Item(Item),
    Particle(Particle),
    Creature(Box<Creature>),
    Player(Box<Player>),
    Weapon(Weapon),
}

#[derive(Debug, Clone)]
pub struct WorldObject {
    pub actor: Actor,
    pub kind: ObjectKind,
}

impl WorldObject {
    pub fn new(actor: Actor, kind: ObjectKind) -> Self {
        Self { actor, kind }
    }

    pub fn id(&self) -> ObjectId {
        self.actor.id
    }

    pub fn is_decoration(&self) -> bool {
        matches!(self.kind, ObjectKind::Decoration { .. })
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, ObjectKind::Player(_))
    }

    pub fn is_creature(&self) -> bool {
        matches!(self.kind, ObjectKind::Creature(_))
    }

    pub fn is_exit(&self) -> bool {
        matches!(self.kind, ObjectKind::Exit | ObjectKind::RunExit)
    }

    pub fn as_item(&self) -> Option<&Item> {
        match &self.kind {
            ObjectKind::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            ObjectKind::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.kind {
            ObjectKind::Player(player) => Some(player),
            _ => None,
        }
    }

    /// Decorations and particles never take part in collisions
    pub fn in_collision_grid(&self) -> bool {
        !matches!(
            self.kind,
            ObjectKind::Decoration { .. } | ObjectKind::Particle(_)
        )
    }

    pub fn update(&mut self, frame: &mut Frame<'_>) {
        let WorldObject { actor, kind } = self;
        match kind {
            ObjectKind::Decoration { .. } => return,
            ObjectKind::Particle(particle) => {
                particle.update(actor);
                return;
            }
            ObjectKind::Weapon(weapon) => weapon.follow_owner(actor, frame),
            _ => {}
        }

        if let Some(body) = actor.body.as_mut() {
            body.integrate(&mut actor.circle, &frame.physics);
        }

        match kind {
            ObjectKind::Creature(creature) => creature.update(actor, frame),
            ObjectKind::Player(player) => player.update(actor, frame),
            ObjectKind::Weapon(weapon) => weapon.update(actor, frame),
            ObjectKind::Prop(prop) => prop.update(actor, frame),
            _ => {}
        }

        if let Some(body) = actor.body.as_mut() {
            frame.boundaries.snap_inside(&mut actor.circle, body, frame.rng);
        }
    }

    /// React to touching `other`. The handler calls this both ways round.
    pub fn collide(&mut self, other: &mut WorldObject, frame: &mut Frame<'_>) {
        let WorldObject { actor, kind } = self;
        match kind {
            ObjectKind::Creature(creature) => creature.collide(actor, other, frame),
            ObjectKind::Player(player) => player.collide(other, frame),
            ObjectKind::Weapon(weapon) => weapon.collide(actor, other, frame),
            ObjectKind::Chest(chest) => chest.collide(actor, other, frame),
            ObjectKind::Exit if other.is_player() && frame.input.interact => {
                frame.request(Transition::NextLevel);
            }
            ObjectKind::RunExit if other.is_player() && frame.input.interact => {
                frame.request(Transition::EndRun);
            }
            _ => {}
        }
    }

    /// Change hp if this object has vitals; true when hp was allowed to change
    pub fn change_hp(&mut self, by: f32, attacker: Option<Vec2>, frame: &mut Frame<'_>) -> bool {
        if self.is_player() {
            player::change_player_hp(&mut self.actor, by, attacker, frame)
        } else {
            self.actor.change_hp(by, attacker, frame)
        }
    }

    /// Only the player carries status effects
    pub fn add_status_effect(&mut self, effect: u32, frame: &mut Frame<'_>) {
        if let ObjectKind::Player(player) = &mut self.kind {
            player.add_status_effect(effect, frame);
        }
    }

    /// Where an external camera should look
    pub fn camera_target_pos(&self) -> Vec2 {
        match self.kind {
            ObjectKind::Player(_) => self.actor.circle.pos() + self.actor.velocity() * CAMERA_LEAD,
            _ => self.actor.circle.pos(),
        }
    }
}

impl Positioned for WorldObject {
    fn circle(&self) -> &Circle {
        &self.actor.circle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_resets_velocity() {
        let mut actor = Actor::new(Vec2::ZERO, 4.0).with_body();
        if let Some(body) = actor.body.as_mut() {
            body.velocity = Vec2::new(3.0, 0.0);
        }
        actor.place(Vec2::new(10.0, 10.0));
        assert_eq!(actor.circle.pos(), Vec2::new(10.0, 10.0));
        assert_eq!(actor.velocity(), Vec2::ZERO);
        assert_eq!(actor.body.as_ref().map(|b| b.previous_pos), Some(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn test_static_actor_ignores_acceleration() {
        let mut actor = Actor::new(Vec2::ZERO, 4.0);
        actor.accelerate(Vec2::X);
        assert!(!actor.is_verlet());
        assert_eq!(actor.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_collision_grid_membership() {
        let decoration = WorldObject::new(
            Actor::new(Vec2::ZERO, 8.0),
            ObjectKind::Decoration { sprite: 0 },
        );
        let exit = WorldObject::new(Actor::new(Vec2::ZERO, 8.0), ObjectKind::Exit);
        assert!(!decoration.in_collision_grid());
        assert!(exit.in_collision_grid());
        assert!(exit.is_exit());
    }
}
