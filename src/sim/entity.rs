//! Entity vitals
//!
//! Hit points and combat stats for anything that can be hurt. Taking damage
//! knocks the entity away from its attacker, shakes the camera, plays a hit
//! sound and sprays blood, all scaled by the same knockback factor.

use glam::Vec2;
use rand::Rng;

use super::frame::Frame;
use super::object::Actor;
use crate::audio::SoundRequest;
use crate::data::{BLOOD_PARTICLES, CreaturePreset, Weighted};
use crate::{uniform, weighted_choice};

/// Number of picks made from a drop table
pub const DROP_ROLLS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub hp: f32,
    pub max_hp: f32,
    pub speed: f32,
    pub attack_damage: f32,
    pub invulnerable: bool,
    pub drops: Vec<Weighted>,
    /// `None` disables blood particles
    pub blood_colour: Option<[u8; 3]>,
}

impl Entity {
    /// Full health, no drops, default blood
    pub fn new(max_hp: f32, speed: f32, attack_damage: f32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            speed,
            attack_damage,
            invulnerable: false,
            drops: Vec::new(),
            blood_colour: Some([138, 0, 39]),
        }
    }

    pub fn from_preset(preset: &CreaturePreset) -> Self {
        Self {
            hp: preset.max_hp,
            max_hp: preset.max_hp,
            speed: preset.speed,
            attack_damage: preset.attack_damage,
            invulnerable: preset.invulnerable,
            drops: preset.drops.clone(),
            blood_colour: preset.blood_colour,
        }
    }

    /// Clamp `hp + by` into [0, max]. False (and untouched) while invulnerable.
    pub fn apply_hp_change(&mut self, by: f32) -> bool {
        if self.invulnerable {
            return false;
        }
        self.hp = (self.hp + by).clamp(0.0, self.max_hp);
        true
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }
}

/// Strength of a hit's side effects; approaches 10 for large hits
pub fn knockback_factor(damage: f32) -> f32 {
    10.0 - 10f32.powf(1.0 - damage / 25.0)
}

/// Up to three weighted picks from a drop table, each of which may come up
/// empty (an implicit "nothing" entry of weight 1)
pub fn roll_drops<R: Rng + ?Sized>(drops: &[Weighted], rng: &mut R) -> Vec<u32> {
    if drops.is_empty() {
        return Vec::new();
    }
    let weights: Vec<f32> = drops.iter().map(|&(_, w)| w).chain([1.0]).collect();
    (0..DROP_ROLLS)
        .filter_map(|_| weighted_choice(&weights, rng))
        .filter_map(|index| drops.get(index).map(|&(id, _)| id))
        .collect()
}

impl Actor {
    /// Change hp and play out the consequences of damage.
    ///
    /// Returns false when the actor has no vitals or is invulnerable.
    pub fn change_hp(&mut self, by: f32, attacker: Option<Vec2>, frame: &mut Frame<'_>) -> bool {
        let Some(vitals) = self.vitals.as_mut() else {
            return false;
        };
        if !vitals.apply_hp_change(by) {
            return false;
        }
        if by < 0.0 {
            self.take_hit(-by, attacker, frame);
        }
        true
    }

    fn take_hit(&mut self, damage: f32, attacker: Option<Vec2>, frame: &mut Frame<'_>) {
        let pos = self.circle.pos();
        let away = attacker.map_or(Vec2::ZERO, |from| (pos - from).normalize_or_zero());
        let factor = knockback_factor(damage);

        self.accelerate(away * factor);
        frame.shake(factor * 10.0);
        let volume = factor * 0.15 + uniform(frame.rng, -0.1, 0.1);
        frame.play(SoundRequest::new("hit").at(pos).volume(volume));

        let Some(vitals) = self.vitals.as_ref() else {
            return;
        };
        if let Some(colour) = vitals.blood_colour {
            let mut count = (factor * 2.0) as usize;
            if vitals.hp <= 0.0 {
                count *= 2;
            }
            let velocity = self.velocity() + away;
            frame.spawn_particles(BLOOD_PARTICLES, pos, count, velocity, Some(colour));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_hp_clamps() {
        let mut vitals = Entity::new(20.0, 0.1, 5.0);
        assert!(vitals.apply_hp_change(-25.0));
        assert_eq!(vitals.hp, 0.0);
        assert!(vitals.is_dead());
        assert!(vitals.apply_hp_change(100.0));
        assert_eq!(vitals.hp, 20.0);
    }

    #[test]
    fn test_invulnerable_never_changes() {
        let mut vitals = Entity::new(20.0, 0.1, 5.0);
        vitals.invulnerable = true;
        for by in [-1000.0, -1.0, 0.0, 5.0] {
            assert!(!vitals.apply_hp_change(by));
            assert_eq!(vitals.hp, 20.0);
        }
    }

    #[test]
    fn test_knockback_factor_curve() {
        assert!((knockback_factor(25.0) - 9.0).abs() < 1e-5);
        assert!(knockback_factor(0.1) > 0.0);
        assert!(knockback_factor(0.1) < knockback_factor(5.0));
        assert!(knockback_factor(200.0) < 10.0);
    }

    #[test]
    fn test_roll_drops() {
        let mut rng = Pcg32::seed_from_u64(4);
        assert!(roll_drops(&[], &mut rng).is_empty());

        let always = [(7, 1_000_000.0)];
        let mut sevens = 0;
        for _ in 0..20 {
            let drops = roll_drops(&always, &mut rng);
            assert!(drops.len() <= DROP_ROLLS);
            assert!(drops.iter().all(|&id| id == 7));
            sevens += drops.len();
        }
        assert!(sevens > 50);

        let never = [(7, 0.0)];
        assert!(roll_drops(&never, &mut rng).is_empty());
    }
}
