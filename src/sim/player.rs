//! The player and the weapon it swings
//!
//! The player is an entity with two layers (vitals, movement), an inventory
//! and a set of status effects. Its weapon is a separate Verlet object that
//! orbits the player in the direction it faces and hits creatures it sweeps
//! into. Inventory changes requested by the weapon go through the frame's
//! command buffer, since the weapon never holds the player.

use std::collections::BTreeMap;

use glam::Vec2;

use super::circle::Positioned;
use super::entity::Entity;
use super::frame::{Frame, Transition};
use super::object::{Actor, AnimationKey, ObjectId, ObjectKind, WorldObject};
use super::state_machine::{State, StateMachine};
use crate::audio::{SoundGroup, SoundRequest};
use crate::consts::{
    ATTACK_CONE, INVENTORY_CAPACITY, PLAYER_ACCELERATION, PLAYER_MAX_HP, PLAYER_RADIUS,
    WEAPON_COOLDOWN_TICKS,
};
use crate::data::{GameData, StatusEffectPreset};
use crate::{from_degrees, heading_degrees, normalize_degrees, uniform};

/// Fraction of the remaining turn the weapon catches up each tick
const WEAPON_TURN_RATE: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryItem {
    pub id: u32,
    /// Hits left, -1 = unbreakable
    pub durability: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    items: Vec<InventoryItem>,
    capacity: usize,
    equipped: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(INVENTORY_CAPACITY)
    }
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
            equipped: 0,
        }
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// False when full
    pub fn add(&mut self, item: InventoryItem) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn equipped_index(&self) -> usize {
        self.equipped
    }

    pub fn equipped(&self) -> Option<&InventoryItem> {
        self.items.get(self.equipped)
    }

    pub fn equipped_mut(&mut self) -> Option<&mut InventoryItem> {
        self.items.get_mut(self.equipped)
    }

    /// Cycle the equipped slot, wrapping at both ends
    pub fn change_equipped(&mut self, by: i32) {
        if self.items.is_empty() {
            self.equipped = 0;
            return;
        }
        let len = self.items.len() as i32;
        self.equipped = (self.equipped as i32 + by).rem_euclid(len) as usize;
    }

    /// Remove the equipped item, keeping the slot index in range
    pub fn take_equipped(&mut self) -> Option<InventoryItem> {
        if self.equipped >= self.items.len() {
            return None;
        }
        let item = self.items.remove(self.equipped);
        if self.equipped >= self.items.len() {
            self.equipped = self.items.len().saturating_sub(1);
        }
        Some(item)
    }

    /// Summed cost of everything carried
    pub fn loot_value(&self, data: &GameData) -> u32 {
        self.items
            .iter()
            .filter_map(|item| data.item(item.id).ok())
            .map(|preset| preset.cost)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct StatusEffect {
    pub id: u32,
    pub preset: StatusEffectPreset,
    /// `None` lasts until cured
    pub active_timer: Option<u32>,
    pub damage_timer: u32,
}

impl StatusEffect {
    pub fn new(id: u32, preset: StatusEffectPreset) -> Self {
        Self {
            id,
            active_timer: preset.active_timer,
            damage_timer: preset.damage_timer,
            preset,
        }
    }

    fn sound_group(&self) -> SoundGroup {
        SoundGroup::Named(format!("status_{}", self.preset.text))
    }
}

/// Everything the player carries
#[derive(Debug, Clone, Default)]
pub struct Gear {
    pub inventory: Inventory,
    pub status_effects: BTreeMap<u32, StatusEffect>,
}

impl Gear {
    /// Replaces any effect with the same id
    pub fn add_status_effect(&mut self, id: u32, frame: &mut Frame<'_>) {
        let preset = match frame.data.status_effect(id) {
            Ok(preset) => preset.clone(),
            Err(e) => {
                log::error!("{e}");
                return;
            }
        };
        frame.message(preset.text.clone());
        let effect = StatusEffect::new(id, preset);
        if let Some(sound) = &effect.preset.sound {
            frame.stop_group(effect.sound_group());
            frame.play(SoundRequest::new(sound).group(effect.sound_group()).looping());
        }
        self.status_effects.insert(id, effect);
    }

    pub fn remove_status_effect(&mut self, id: u32, frame: &mut Frame<'_>) {
        if let Some(effect) = self.status_effects.remove(&id) {
            frame.stop_group(effect.sound_group());
        }
    }

    /// Product of every effect's speed multiplier
    pub fn speed_multiplier(&self, time_secs: f32) -> f32 {
        self.status_effects
            .values()
            .map(|effect| effect.preset.speed_multiplier.at(time_secs))
            .product()
    }

    fn update_status_effects(&mut self, actor: &mut Actor, frame: &mut Frame<'_>) {
        let ids: Vec<u32> = self.status_effects.keys().copied().collect();
        for id in ids {
            let Some(effect) = self.status_effects.get_mut(&id) else {
                continue;
            };
            if let Some(timer) = effect.active_timer.as_mut() {
                *timer = timer.saturating_sub(1);
                if *timer == 0 {
                    self.remove_status_effect(id, frame);
                    continue;
                }
            }

            frame.shake(effect.preset.screen_shake);
            effect.damage_timer = effect.damage_timer.saturating_sub(1);
            let damage = if effect.damage_timer == 0 {
                effect.damage_timer = effect.preset.damage_timer;
                effect.preset.damage
            } else {
                0.0
            };
            if damage != 0.0 {
                change_player_hp(actor, -damage, None, frame);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerVital {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerMovement {
    Walking,
}

pub struct PlayerCtx<'c, 'a> {
    pub actor: &'c mut Actor,
    pub gear: &'c mut Gear,
    pub frame: &'c mut Frame<'a>,
}

impl<'c, 'a> State<PlayerCtx<'c, 'a>> for PlayerVital {
    fn enter(&mut self, ctx: &mut PlayerCtx<'c, 'a>) {
        if *self == PlayerVital::Dead {
            ctx.actor.set_animation(AnimationKey::Dead);
            ctx.frame.request(Transition::GameOver);
        }
    }

    fn update(&mut self, ctx: &mut PlayerCtx<'c, 'a>) -> Option<Self> {
        let dead = ctx.actor.vitals.as_ref().is_some_and(Entity::is_dead);
        (*self == PlayerVital::Alive && dead).then_some(PlayerVital::Dead)
    }
}

impl<'c, 'a> State<PlayerCtx<'c, 'a>> for PlayerMovement {
    fn update(&mut self, ctx: &mut PlayerCtx<'c, 'a>) -> Option<Self> {
        let multiplier = ctx.gear.speed_multiplier(ctx.frame.time_secs());
        let movement = ctx.frame.input.movement.normalize_or_zero() * PLAYER_ACCELERATION * multiplier;
        ctx.actor.accelerate(movement);
        if movement != Vec2::ZERO {
            ctx.actor.set_animation(AnimationKey::Moving);
            ctx.actor.rotation = heading_degrees(movement);
        } else {
            ctx.actor.set_animation(AnimationKey::Idle);
        }

        let input = ctx.frame.input;
        if input.consume {
            consume_equipped(ctx);
        }
        if input.previous_item {
            ctx.gear.inventory.change_equipped(-1);
        }
        if input.next_item {
            ctx.gear.inventory.change_equipped(1);
        }
        if input.drop_item {
            drop_equipped(ctx);
        }
        None
    }
}

fn consume_equipped(ctx: &mut PlayerCtx<'_, '_>) {
    let Some(item) = ctx.gear.inventory.equipped().copied() else {
        return;
    };
    let data = ctx.frame.data;
    let preset = match data.item(item.id) {
        Ok(preset) => preset,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    change_player_hp(ctx.actor, preset.consume_hp, None, ctx.frame);
    ctx.gear.inventory.take_equipped();
    ctx.frame.message(format!("Consumed {}.", preset.name));
    for &effect in &preset.removes_status_effects {
        ctx.gear.remove_status_effect(effect, ctx.frame);
    }
    ctx.frame.play(SoundRequest::new("gulp"));
}

fn drop_equipped(ctx: &mut PlayerCtx<'_, '_>) {
    let Some(item) = ctx.gear.inventory.take_equipped() else {
        return;
    };
    let data = ctx.frame.data;
    let preset = match data.item(item.id) {
        Ok(preset) => preset,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    let pos = ctx.actor.circle.pos();
    let rotation = ctx.actor.rotation;
    let mut drop_at = pos + from_degrees(ctx.actor.circle.radius() + preset.radius, rotation);
    if !ctx.gear.inventory.is_empty() {
        let spread = uniform(ctx.frame.rng, -90.0, 90.0);
        drop_at += from_degrees(preset.radius * 2.0, rotation + spread);
    }
    ctx.frame.spawn_item(item.id, Some(item.durability), drop_at, Vec2::ZERO);
    ctx.frame.play(SoundRequest::new("drop"));
    ctx.frame.message(format!("Dropped {}.", preset.name));
}

#[derive(Debug, Clone)]
pub struct Player {
    pub vitals: StateMachine<PlayerVital>,
    pub movement: StateMachine<PlayerMovement>,
    pub gear: Gear,
}

impl Player {
    pub fn new() -> Self {
        Self {
            vitals: StateMachine::new(PlayerVital::Alive),
            movement: StateMachine::new(PlayerMovement::Walking),
            gear: Gear::default(),
        }
    }

    pub fn is_dead(&self) -> bool {
        *self.vitals.current() == PlayerVital::Dead
    }

    pub fn update(&mut self, actor: &mut Actor, frame: &mut Frame<'_>) {
        let mut ctx = PlayerCtx {
            actor,
            gear: &mut self.gear,
            frame,
        };
        self.vitals.update(&mut ctx);
        self.movement.update(&mut ctx);
        self.gear.update_status_effects(actor, frame);
    }

    /// Grab items while the pick-up input is held
    pub fn collide(&mut self, other: &mut WorldObject, frame: &mut Frame<'_>) {
        if self.is_dead() {
            return;
        }
        request_pickup(other, frame);
    }

    pub fn add_status_effect(&mut self, id: u32, frame: &mut Frame<'_>) {
        self.gear.add_status_effect(id, frame);
    }

    /// Add a picked-up item; announces it and returns false when full
    pub fn pick_up(&mut self, item: InventoryItem, frame: &mut Frame<'_>) -> bool {
        if !self.gear.inventory.add(item) {
            return false;
        }
        let name = frame
            .data
            .item(item.id)
            .map(|preset| preset.name.clone())
            .unwrap_or_default();
        frame.message(format!("Found {name}."));
        frame.stop_group(SoundGroup::named("pickup"));
        frame.play(SoundRequest::new("pickup").group(SoundGroup::named("pickup")));
        true
    }

    /// One weapon hit's worth of wear on the equipped item
    pub fn wear_equipped(&mut self, pos: Vec2, frame: &mut Frame<'_>) {
        let Some(item) = self.gear.inventory.equipped_mut() else {
            return;
        };
        if item.durability == -1 {
            return;
        }
        item.durability = (item.durability - 1).max(0);
        if item.durability > 0 {
            return;
        }
        let Some(broken) = self.gear.inventory.take_equipped() else {
            return;
        };
        let name = frame
            .data
            .item(broken.id)
            .map(|preset| preset.name.clone())
            .unwrap_or_default();
        frame.play(SoundRequest::new("break").at(pos));
        frame.message(format!("{name} broke!"));
        frame.spawn_particles(crate::data::BLOOD_PARTICLES, pos, 6, Vec2::ZERO, Some([130, 130, 130]));
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

fn request_pickup(other: &WorldObject, frame: &mut Frame<'_>) {
    if other.as_item().is_some() && frame.input.pick_up {
        frame.commands.pickups.push(other.id());
    }
}

/// Change the player's hp; damage also plays the hurt sound
pub fn change_player_hp(
    actor: &mut Actor,
    by: f32,
    attacker: Option<Vec2>,
    frame: &mut Frame<'_>,
) -> bool {
    let changed = actor.change_hp(by, attacker, frame);
    if changed && by < 0.0 {
        let group = SoundGroup::named("playerHurt");
        frame.stop_group(group.clone());
        frame.play(
            SoundRequest::new("hurt")
                .volume((-by / 10.0).clamp(0.15, 0.4))
                .group(group),
        );
    }
    changed
}

/// The player, at full health and at rest
pub fn player_object(pos: Vec2) -> WorldObject {
    let actor = Actor::new(pos, PLAYER_RADIUS)
        .with_body()
        .with_vitals(Entity::new(PLAYER_MAX_HP, PLAYER_ACCELERATION, 0.0));
    WorldObject::new(actor, ObjectKind::Player(Box::new(Player::new())))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponState {
    Ready,
    Swinging { timer: u32 },
}

pub struct WeaponCtx<'c, 'a> {
    pub actor: &'c mut Actor,
    pub owner: ObjectId,
    pub frame: &'c mut Frame<'a>,
    pub other: Option<&'c mut WorldObject>,
}

impl<'c, 'a> State<WeaponCtx<'c, 'a>> for WeaponState {
    fn enter(&mut self, ctx: &mut WeaponCtx<'c, 'a>) {
        let WeaponState::Swinging { timer } = self else {
            return;
        };
        *timer = WEAPON_COOLDOWN_TICKS;

        let Some(player) = ctx.frame.player else {
            return;
        };
        let damage = player.equipped.map_or(0.0, |item| item.attack_damage);
        let Some(target) = ctx.other.as_deref_mut() else {
            return;
        };
        if target.change_hp(-damage, Some(player.pos), ctx.frame) {
            ctx.frame.commands.wear += 1;
        }
    }

    fn update(&mut self, _ctx: &mut WeaponCtx<'c, 'a>) -> Option<Self> {
        match self {
            WeaponState::Ready => None,
            WeaponState::Swinging { timer } => {
                *timer = timer.saturating_sub(1);
                (*timer == 0).then_some(WeaponState::Ready)
            }
        }
    }

    fn collide(&mut self, ctx: &mut WeaponCtx<'c, 'a>) -> Option<Self> {
        if *self != WeaponState::Ready {
            return None;
        }
        let other = ctx.other.as_deref()?;
        if other.as_item().is_some() {
            request_pickup(other, ctx.frame);
            return None;
        }
        if !other.is_creature() || other.id() == ctx.owner {
            return None;
        }
        let player = ctx.frame.player?;
        player.equipped?;
        let facing = heading_degrees(other.pos() - player.pos);
        let off = normalize_degrees(ctx.actor.rotation - facing).abs();
        (off < ATTACK_CONE).then_some(WeaponState::Swinging { timer: 0 })
    }
}

/// The player's equipped item, as a physical object
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub owner: ObjectId,
    pub state: StateMachine<WeaponState>,
}

impl Weapon {
    pub fn new(owner: ObjectId) -> Self {
        Self {
            owner,
            state: StateMachine::new(WeaponState::Ready),
        }
    }

    /// Hold the equipped item out in front of the player
    pub fn follow_owner(&mut self, actor: &mut Actor, frame: &mut Frame<'_>) {
        let Some(player) = frame.player.filter(|p| p.id == self.owner) else {
            actor.collidable = false;
            return;
        };
        let Some(equipped) = player.equipped else {
            actor.collidable = false;
            return;
        };

        let turn = normalize_degrees(player.rotation - actor.rotation);
        actor.rotation = normalize_degrees(actor.rotation + turn * WEAPON_TURN_RATE);
        actor.collidable = true;
        actor.circle.set_radius(equipped.radius);
        let pos = player.pos + from_degrees(player.radius + equipped.radius, actor.rotation);
        actor.place(pos);
        actor.flipped = pos.x < player.pos.x;
    }

    pub fn update(&mut self, actor: &mut Actor, frame: &mut Frame<'_>) {
        let mut ctx = WeaponCtx {
            actor,
            owner: self.owner,
            frame,
            other: None,
        };
        self.state.update(&mut ctx);
    }

    pub fn collide(&mut self, actor: &mut Actor, other: &mut WorldObject, frame: &mut Frame<'_>) {
        let mut ctx = WeaponCtx {
            actor,
            owner: self.owner,
            frame,
            other: Some(other),
        };
        self.state.collide(&mut ctx);
    }
}

/// A weapon with nothing equipped yet
pub fn weapon_object(owner: ObjectId, pos: Vec2) -> WorldObject {
    let mut actor = Actor::new(pos, 0.0).with_body();
    actor.collidable = false;
    WorldObject::new(actor, ObjectKind::Weapon(Weapon::new(owner)))
}
