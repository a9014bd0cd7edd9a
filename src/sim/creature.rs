//! Enemy creatures
//!
//! A creature runs three independent layers:
//! - vitals: alive, then one of the death styles (removed, down, split)
//! - movement: idle / following / fleeing, steered by the A* pathfinder
//! - attacks: a cooldown window opened by touching the player while facing it
//!
//! A layer that wants to freeze another (a skeleton collapsing) records the
//! request in the context; it is applied before the next layer runs.

use glam::Vec2;
use rand::Rng;

use super::circle::Positioned;
use super::entity::{Entity, roll_drops};
use super::frame::Frame;
use super::object::{Actor, AnimationKey, ObjectKind, WorldObject};
use super::state::GameEvent;
use super::state_machine::{State, StateMachine};
use crate::audio::{SoundGroup, SoundRequest};
use crate::consts::{
    AGGRO_RANGE, ARRIVE_DISTANCE, ATTACK_CONE, ATTACK_COOLDOWN_TICKS, FLEE_TRIGGER_RANGE,
};
use crate::data::{DataError, DeathStyle, GameData, MovementStyle};
use crate::{from_degrees, heading_degrees, normalize_degrees, rotate_degrees, uniform};

/// Probability per tick of a following creature making its noise
const FOLLOWING_SOUND_CHANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalState {
    Alive,
    /// Removed from the level, loot dropped
    Dead,
    /// Collapsed; stands back up when the timer runs out
    Down { timer: u32 },
    /// Burst into smaller creatures
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Idle,
    Following,
    Fleeing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackState {
    NotAttacking,
    Attacking { timer: u32 },
}

/// Per-creature memory shared by the layers
#[derive(Debug, Clone, PartialEq)]
pub struct Mind {
    pub species: u32,
    pub movement: MovementStyle,
    pub death: DeathStyle,
    /// Last known position worth walking to
    pub target: Vec2,
    pub attack_status_effect: Option<u32>,
    pub attack_status_effect_chance: f32,
    pub following_sound: Option<String>,
    /// Ticks spent following, paces slithering movers
    pub gait: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    pub vitals: StateMachine<VitalState>,
    pub movement: StateMachine<MovementState>,
    pub attacks: StateMachine<AttackState>,
    pub mind: Mind,
}

/// Layer activity changes requested while a layer runs
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerSwitches {
    pub movement: Option<bool>,
    pub attacks: Option<bool>,
}

pub struct CreatureCtx<'c, 'a> {
    pub actor: &'c mut Actor,
    pub mind: &'c mut Mind,
    pub frame: &'c mut Frame<'a>,
    /// The object being touched, during collisions
    pub other: Option<&'c mut WorldObject>,
    pub switches: LayerSwitches,
}

impl CreatureCtx<'_, '_> {
    fn vitals(&mut self) -> Option<&mut Entity> {
        self.actor.vitals.as_mut()
    }

    fn speed(&self) -> f32 {
        self.actor.vitals.as_ref().map_or(0.0, |v| v.speed)
    }

    fn distance_to_player(&self) -> Option<f32> {
        let player = self.frame.player?;
        Some(self.actor.circle.pos().distance(player.pos))
    }

    /// Pathfind to `target`, face that way, wobble by up to `wobble` degrees and push off
    fn step_towards(&mut self, target: Vec2, wobble: f32) {
        let radius = self.frame.player.map_or(0.0, |p| p.radius);
        let frame = &mut *self.frame;
        let steer = frame
            .pathfinder
            .pathfind(frame.boundaries, &self.actor.circle, target, radius);
        self.actor.rotation = heading_degrees(steer);
        let push = rotate_degrees(steer, uniform(frame.rng, -wobble, wobble));
        let speed = self.speed();
        self.actor.accelerate(push * speed);
    }

    fn despawn_self(&mut self) {
        let id = self.actor.id;
        self.frame.despawn(id);
        self.frame.events.push(GameEvent::ObjectDied {
            id,
            pos: self.actor.circle.pos(),
        });
    }
}

impl<'c, 'a> State<CreatureCtx<'c, 'a>> for VitalState {
    fn enter(&mut self, ctx: &mut CreatureCtx<'c, 'a>) {
        match *self {
            VitalState::Alive => {}
            VitalState::Dead => {
                ctx.despawn_self();
                let drops = ctx.actor.vitals.as_ref().map(|v| v.drops.clone()).unwrap_or_default();
                let pos = ctx.actor.circle.pos();
                let velocity = ctx.actor.velocity();
                for item in roll_drops(&drops, ctx.frame.rng) {
                    let offset = scatter(ctx.frame.rng);
                    ctx.frame.spawn_item(item, None, pos + offset, velocity);
                }
            }
            VitalState::Down { .. } => {
                ctx.switches.movement = Some(false);
                ctx.switches.attacks = Some(false);
                if let Some(vitals) = ctx.vitals() {
                    vitals.invulnerable = true;
                }
            }
            VitalState::Split => {
                if let DeathStyle::Split { into, min, max } = ctx.mind.death {
                    let count = ctx.frame.rng.random_range(min.min(max)..=max.max(min));
                    let pos = ctx.actor.circle.pos();
                    let velocity = ctx.actor.velocity();
                    for _ in 0..count {
                        let offset = scatter(ctx.frame.rng);
                        match spawn(ctx.frame.data, into, pos + offset) {
                            Ok(mut child) => {
                                if let Some(body) = child.actor.body.as_mut() {
                                    body.accelerate(velocity);
                                }
                                ctx.frame.spawn(child);
                            }
                            Err(e) => log::error!("{e}"),
                        }
                    }
                }
                ctx.despawn_self();
            }
        }
    }

    fn update(&mut self, ctx: &mut CreatureCtx<'c, 'a>) -> Option<Self> {
        match self {
            VitalState::Alive => {
                let dead = ctx.actor.vitals.as_ref().is_some_and(Entity::is_dead);
                dead.then(|| match ctx.mind.death {
                    DeathStyle::Remove => VitalState::Dead,
                    DeathStyle::Revive { ticks } => VitalState::Down { timer: ticks },
                    DeathStyle::Split { .. } => VitalState::Split,
                })
            }
            VitalState::Down { timer } => {
                ctx.actor.set_animation(AnimationKey::Dead);
                *timer = timer.saturating_sub(1);
                if *timer > 0 {
                    return None;
                }
                if let Some(vitals) = ctx.vitals() {
                    vitals.invulnerable = false;
                    vitals.hp = vitals.max_hp;
                }
                ctx.switches.movement = Some(true);
                ctx.switches.attacks = Some(true);
                Some(VitalState::Alive)
            }
            VitalState::Dead | VitalState::Split => None,
        }
    }
}

impl<'c, 'a> State<CreatureCtx<'c, 'a>> for MovementState {
    fn setup(&mut self, ctx: &mut CreatureCtx<'c, 'a>) {
        // Skittish creatures start out facing anywhere
        if *self == MovementState::Idle && ctx.mind.movement == MovementStyle::Flee {
            ctx.actor.rotation = uniform(ctx.frame.rng, 0.0, 360.0);
        }
    }

    fn enter(&mut self, ctx: &mut CreatureCtx<'c, 'a>) {
        if *self == MovementState::Idle {
            ctx.mind.target = Vec2::ZERO;
        }
    }

    fn update(&mut self, ctx: &mut CreatureCtx<'c, 'a>) -> Option<Self> {
        match self {
            MovementState::Idle => {
                ctx.actor.set_animation(AnimationKey::Idle);
                let distance = ctx.distance_to_player()?;
                if ctx.mind.movement == MovementStyle::Flee {
                    (distance <= FLEE_TRIGGER_RANGE).then_some(MovementState::Fleeing)
                } else {
                    (distance <= AGGRO_RANGE).then_some(MovementState::Following)
                }
            }
            MovementState::Following => follow(ctx),
            MovementState::Fleeing => {
                ctx.actor.set_animation(AnimationKey::Moving);
                let player = ctx.frame.player?;
                let pos = ctx.actor.circle.pos();
                if pos.distance(player.pos) > AGGRO_RANGE {
                    return Some(MovementState::Idle);
                }
                let away = pos - (player.pos - pos) * 10.0;
                ctx.mind.target = away;
                ctx.step_towards(away, 90.0);
                None
            }
        }
    }
}

fn follow(ctx: &mut CreatureCtx<'_, '_>) -> Option<MovementState> {
    ctx.actor.set_animation(AnimationKey::Moving);
    if let Some(player) = ctx.frame.player {
        if ctx.actor.circle.pos().distance(player.pos) <= AGGRO_RANGE {
            ctx.mind.target = player.pos;
        }
    }
    if ctx.actor.circle.pos().distance(ctx.mind.target) < ARRIVE_DISTANCE {
        return Some(MovementState::Idle);
    }

    ctx.mind.gait = ctx.mind.gait.wrapping_add(1);
    let target = ctx.mind.target;
    match ctx.mind.movement {
        MovementStyle::Chase | MovementStyle::Flee => ctx.step_towards(target, 90.0),
        MovementStyle::Slither { stride } => {
            if ctx.mind.gait % stride.max(1) == 0 {
                ctx.step_towards(target, 20.0);
            }
        }
        MovementStyle::Drift => {
            ctx.step_towards(target, 90.0);
            let jitter = from_degrees(
                uniform(ctx.frame.rng, 0.0, 6.0),
                uniform(ctx.frame.rng, 0.0, 360.0),
            );
            let speed = ctx.speed();
            ctx.actor.accelerate(jitter * speed);
        }
    }

    if let Some(sound) = &ctx.mind.following_sound {
        let group = SoundGroup::Object(ctx.actor.id);
        if !ctx.frame.is_group_playing(&group)
            && ctx.frame.rng.random::<f32>() < FOLLOWING_SOUND_CHANCE
        {
            let pos = ctx.actor.circle.pos();
            ctx.frame.play(SoundRequest::new(sound).at(pos).group(group));
        }
    }
    None
}

impl<'c, 'a> State<CreatureCtx<'c, 'a>> for AttackState {
    fn enter(&mut self, ctx: &mut CreatureCtx<'c, 'a>) {
        let AttackState::Attacking { timer } = self else {
            return;
        };
        *timer = ATTACK_COOLDOWN_TICKS;

        let damage = ctx.actor.vitals.as_ref().map_or(0.0, |v| v.attack_damage);
        let pos = ctx.actor.circle.pos();
        let Some(target) = ctx.other.as_deref_mut() else {
            return;
        };
        target.change_hp(-damage, Some(pos), ctx.frame);
        if let Some(effect) = ctx.mind.attack_status_effect {
            if ctx.frame.rng.random::<f32>() <= ctx.mind.attack_status_effect_chance {
                target.add_status_effect(effect, ctx.frame);
            }
        }
    }

    fn update(&mut self, _ctx: &mut CreatureCtx<'c, 'a>) -> Option<Self> {
        match self {
            AttackState::NotAttacking => None,
            AttackState::Attacking { timer } => {
                *timer = timer.saturating_sub(1);
                (*timer == 0).then_some(AttackState::NotAttacking)
            }
        }
    }

    fn collide(&mut self, ctx: &mut CreatureCtx<'c, 'a>) -> Option<Self> {
        if *self != AttackState::NotAttacking {
            return None;
        }
        let other = ctx.other.as_deref()?;
        if !other.is_player() {
            return None;
        }
        let facing = heading_degrees(other.pos() - ctx.actor.circle.pos());
        let off = normalize_degrees(ctx.actor.rotation - facing).abs();
        (off < ATTACK_CONE).then_some(AttackState::Attacking { timer: 0 })
    }
}

/// Random offset of 5 to 10 units
fn scatter<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    from_degrees(uniform(rng, 5.0, 10.0), uniform(rng, 0.0, 360.0))
}

impl Creature {
    fn apply(&mut self, switches: LayerSwitches) {
        if let Some(active) = switches.movement {
            self.movement.set_active(active);
        }
        if let Some(active) = switches.attacks {
            self.attacks.set_active(active);
        }
    }

    pub fn update(&mut self, actor: &mut Actor, frame: &mut Frame<'_>) {
        let id = actor.id;
        let Creature {
            vitals,
            movement,
            attacks,
            mind,
        } = self;
        let mut ctx = CreatureCtx {
            actor,
            mind,
            frame,
            other: None,
            switches: LayerSwitches::default(),
        };

        vitals.update(&mut ctx);
        let switches = std::mem::take(&mut ctx.switches);
        if ctx.frame.is_despawned(id) {
            return;
        }
        if let Some(active) = switches.movement {
            movement.set_active(active);
        }
        if let Some(active) = switches.attacks {
            attacks.set_active(active);
        }
        movement.update(&mut ctx);
        attacks.update(&mut ctx);
    }

    pub fn collide(&mut self, actor: &mut Actor, other: &mut WorldObject, frame: &mut Frame<'_>) {
        let mut ctx = CreatureCtx {
            actor,
            mind: &mut self.mind,
            frame,
            other: Some(other),
            switches: LayerSwitches::default(),
        };
        self.vitals.collide(&mut ctx);
        self.movement.collide(&mut ctx);
        self.attacks.collide(&mut ctx);
        let switches = ctx.switches;
        self.apply(switches);
    }

    pub fn is_attacking(&self) -> bool {
        matches!(self.attacks.current(), AttackState::Attacking { .. })
    }
}

/// Build a creature of `species` standing at `pos`
pub fn spawn(data: &GameData, species: u32, pos: Vec2) -> Result<WorldObject, DataError> {
    let preset = data.creature(species)?;
    let actor = Actor::new(pos, preset.radius)
        .with_body()
        .with_vitals(Entity::from_preset(preset));

    let mut attacks = StateMachine::new(AttackState::NotAttacking);
    if preset.movement == MovementStyle::Flee {
        attacks.set_active(false);
    }
    let creature = Creature {
        vitals: StateMachine::new(VitalState::Alive),
        movement: StateMachine::new(MovementState::Idle),
        attacks,
        mind: Mind {
            species,
            movement: preset.movement,
            death: preset.death,
            target: Vec2::ZERO,
            attack_status_effect: preset.attack_status_effect,
            attack_status_effect_chance: preset.attack_status_effect_chance,
            following_sound: preset.following_sound.clone(),
            gait: 0,
        },
    };
    Ok(WorldObject::new(actor, ObjectKind::Creature(Box::new(creature))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CreaturePreset;

    fn goblin() -> CreaturePreset {
        CreaturePreset {
            name: "Goblin".into(),
            max_hp: 20.0,
            speed: 0.1,
            attack_damage: 5.0,
            radius: 8.0,
            drops: vec![(0, 0.5)],
            blood_colour: Some([45, 69, 7]),
            invulnerable: false,
            attack_status_effect: None,
            attack_status_effect_chance: 1.0,
            movement: MovementStyle::Chase,
            death: DeathStyle::Remove,
            following_sound: None,
        }
    }

    #[test]
    fn test_spawn_uses_preset() {
        let data = GameData {
            creatures: vec![goblin()],
            ..Default::default()
        };
        let object = spawn(&data, 0, Vec2::new(3.0, 4.0)).unwrap();
        assert_eq!(object.actor.circle.radius(), 8.0);
        assert_eq!(object.actor.vitals.as_ref().map(|v| v.hp), Some(20.0));
        assert!(object.actor.is_verlet());
        let ObjectKind::Creature(creature) = &object.kind else {
            panic!("expected a creature");
        };
        assert_eq!(creature.vitals.current(), &VitalState::Alive);
        assert_eq!(creature.movement.current(), &MovementState::Idle);
        assert!(creature.attacks.is_active());
    }

    #[test]
    fn test_fleeing_species_never_attacks() {
        let mut scientist = goblin();
        scientist.movement = MovementStyle::Flee;
        let data = GameData {
            creatures: vec![scientist],
            ..Default::default()
        };
        let object = spawn(&data, 0, Vec2::ZERO).unwrap();
        let ObjectKind::Creature(creature) = &object.kind else {
            panic!("expected a creature");
        };
        assert!(!creature.attacks.is_active());
    }

    #[test]
    fn test_unknown_species() {
        assert!(matches!(
            spawn(&GameData::default(), 4, Vec2::ZERO),
            Err(DataError::UnknownCreature(4))
        ));
    }
}
