//! Object and collision handling
//!
//! Each frame:
//! 1. Every non-decoration object updates, in insertion order
//! 2. Spawns, despawns and inventory changes from the update pass are applied
//! 3. The collision grid is rebuilt and every unique nearby pair that is
//!    collidable and overlapping collides both ways, then gets pushed apart
//! 4. Commands from the collision pass are applied
//!
//! A transition requested during collisions (an exit reached, the player
//! dying) stops the pass immediately: the object set is about to be replaced.

use glam::Vec2;

use super::circle::Positioned;
use super::frame::{EquippedView, Frame, PlayerView};
use super::grid::PositionGrid;
use super::object::{ObjectId, ObjectKind, WorldObject};
use super::player::InventoryItem;
use crate::GameData;
use crate::consts::SEPARATION_SOFTENING;

#[derive(Debug, Clone, Default)]
pub struct ObjectHandler {
    objects: Vec<WorldObject>,
    grid: PositionGrid,
    next_id: u32,
}

impl ObjectHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and hand out its id
    pub fn add_object(&mut self, mut object: WorldObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        object.actor.id = id;
        self.objects.push(object);
        id
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<WorldObject> {
        let index = self.index_of(id)?;
        Some(self.objects.remove(index))
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut WorldObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    pub fn player(&self) -> Option<&WorldObject> {
        self.objects.iter().find(|o| o.is_player())
    }

    fn player_mut(&mut self) -> Option<&mut WorldObject> {
        self.objects.iter_mut().find(|o| o.is_player())
    }

    /// Objects in painter's order: ascending y, ties in insertion order
    pub fn draw_order(&self) -> Vec<&WorldObject> {
        let mut order: Vec<&WorldObject> = self.objects.iter().collect();
        order.sort_by(|a, b| a.pos().y.total_cmp(&b.pos().y));
        order
    }

    pub fn update(&mut self, frame: &mut Frame<'_>) {
        frame.player = self.player().map(|p| player_view(p, frame.data));
        for object in &mut self.objects {
            if object.is_decoration() {
                continue;
            }
            object.update(frame);
            if object.is_player() {
                frame.player = Some(player_view(object, frame.data));
            }
        }
        self.apply_commands(frame);

        if frame.commands.transition.is_none() {
            self.handle_collisions(frame);
            self.apply_commands(frame);
        }
    }

    /// Collide every unique overlapping pair once
    pub fn handle_collisions(&mut self, frame: &mut Frame<'_>) {
        self.grid.rebuild(
            self.objects
                .iter()
                .enumerate()
                .filter(|(_, o)| o.in_collision_grid())
                .map(|(i, o)| (i, &o.actor.circle)),
        );
        let pairs: Vec<(usize, usize)> = self.grid.iterate_pairs().collect();

        for (a, b) in pairs {
            let (first, second) = pair_mut(&mut self.objects, a, b);
            if frame.is_despawned(first.id()) || frame.is_despawned(second.id()) {
                continue;
            }
            if !first.actor.collidable || !second.actor.collidable {
                continue;
            }
            if !first.actor.circle.is_colliding(&second.actor.circle) {
                continue;
            }

            first.collide(second, frame);
            second.collide(first, frame);
            if frame.commands.transition.is_some() {
                return;
            }
            collision_response(first, second);
        }
    }

    /// Apply and clear the frame's command buffer
    pub fn apply_commands(&mut self, frame: &mut Frame<'_>) {
        let pickups = std::mem::take(&mut frame.commands.pickups);
        for id in pickups {
            self.pick_up(id, frame);
        }

        let wear = std::mem::take(&mut frame.commands.wear);
        if wear > 0 {
            if let Some(player) = self.player_mut() {
                let pos = player.pos();
                if let Some(state) = player.as_player_mut() {
                    for _ in 0..wear {
                        state.wear_equipped(pos, frame);
                    }
                }
            }
        }

        let despawns = std::mem::take(&mut frame.commands.despawns);
        if !despawns.is_empty() {
            self.objects.retain(|o| !despawns.contains(&o.id()));
        }

        // Wear can spawn particles, so spawns go last
        let spawns = std::mem::take(&mut frame.commands.spawns);
        for object in spawns {
            self.add_object(object);
        }
    }

    fn pick_up(&mut self, id: ObjectId, frame: &mut Frame<'_>) {
        if frame.is_despawned(id) {
            return;
        }
        let Some(item) = self.get(id).and_then(|o| o.as_item()).copied() else {
            return;
        };
        let Some(player) = self.player_mut().and_then(|p| p.as_player_mut()) else {
            return;
        };
        let carried = InventoryItem {
            id: item.id,
            durability: item.durability,
        };
        if player.pick_up(carried, frame) {
            frame.despawn(id);
        }
    }
}

/// Push two overlapping objects apart.
///
/// Both or neither physics-driven: split by `ra² / (ra² + rb²)`. Otherwise only
/// the physics-driven one moves.
pub fn collision_response(a: &mut WorldObject, b: &mut WorldObject) {
    let overlap = a.actor.circle.overlap_vector(&b.actor.circle);
    if overlap == Vec2::ZERO {
        return;
    }
    let ratio = match (a.actor.is_verlet(), b.actor.is_verlet()) {
        (true, false) => 0.0,
        (false, true) => 1.0,
        _ => {
            let ra = a.radius() * a.radius();
            let rb = b.radius() * b.radius();
            if ra + rb == 0.0 { 0.5 } else { ra / (ra + rb) }
        }
    };
    a.actor.circle.translate(overlap * (ratio - 1.0) * SEPARATION_SOFTENING);
    b.actor.circle.translate(overlap * ratio * SEPARATION_SOFTENING);
}

fn player_view(object: &WorldObject, data: &GameData) -> PlayerView {
    let equipped = object
        .as_player()
        .and_then(|p| p.gear.inventory.equipped())
        .and_then(|item| {
            data.item(item.id).ok().map(|preset| EquippedView {
                item: item.id,
                radius: preset.radius,
                attack_damage: preset.attack_damage,
            })
        });
    PlayerView {
        id: object.id(),
        pos: object.pos(),
        velocity: object.actor.velocity(),
        radius: object.radius(),
        rotation: object.actor.rotation,
        equipped,
    }
}

/// Two distinct elements of a slice, mutably
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boundary::{Boundary, BoundaryHandler};
    use crate::sim::creature::{self, MovementState, VitalState};
    use crate::sim::frame::Commands;
    use crate::sim::object::Actor;
    use crate::sim::pathfind::AStarPathfinder;
    use crate::sim::player::player_object;
    use crate::sim::props;
    use crate::sim::state::GameEvent;
    use crate::sim::tick::TickInput;
    use crate::audio::SoundGroup;
    use crate::sim::verlet::PhysicsConfig;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DATA: &str = r#"{
        "items": [
            {"name": "Bone", "cost": 2},
            {"name": "Toadstool", "consume_hp": -5}
        ],
        "creatures": [
            {"name": "Goblin", "max_hp": 20, "speed": 0.1, "attack_damage": 5, "radius": 8,
             "blood_colour": null},
            {"name": "Skeleton", "max_hp": 15, "speed": 0.1, "radius": 8, "blood_colour": null,
             "death": {"kind": "revive", "ticks": 3}},
            {"name": "Big Slime", "max_hp": 30, "speed": 0.05, "radius": 10, "blood_colour": null,
             "death": {"kind": "split", "into": 3, "min": 2, "max": 2}},
            {"name": "Slime", "max_hp": 10, "speed": 0.15, "radius": 8, "blood_colour": null},
            {"name": "Rat", "max_hp": 5, "speed": 0.2, "radius": 5, "blood_colour": null,
             "movement": {"kind": "flee"}},
            {"name": "Hound", "max_hp": 20, "speed": 0.1, "radius": 8, "blood_colour": null,
             "following_sound": "growl"}
        ],
        "particles": [{"colour": [1, 1, 1], "velocity": [0, 1], "z_velocity": [0, 1], "radius": [1, 2]}]
    }"#;

    struct World {
        boundaries: BoundaryHandler,
        pathfinder: AStarPathfinder,
        data: GameData,
        rng: Pcg32,
        events: Vec<GameEvent>,
    }

    impl World {
        fn new() -> Self {
            let mut rng = Pcg32::seed_from_u64(1);
            let mut boundaries = BoundaryHandler::new();
            boundaries.add_boundary(Boundary::new(Vec2::ZERO, 300.0, 6.0, &mut rng));
            Self {
                boundaries,
                pathfinder: AStarPathfinder::new(),
                data: GameData::from_json(DATA).unwrap(),
                rng,
                events: Vec::new(),
            }
        }

        fn frame<'a>(&'a mut self, input: &'a TickInput) -> Frame<'a> {
            Frame {
                boundaries: &self.boundaries,
                pathfinder: &mut self.pathfinder,
                physics: PhysicsConfig::default(),
                data: &self.data,
                rng: &mut self.rng,
                input,
                time_ticks: 0,
                player: None,
                events: &mut self.events,
                commands: Commands::default(),
            }
        }
    }

    fn kill(object: &mut WorldObject) {
        if let Some(vitals) = object.actor.vitals.as_mut() {
            vitals.hp = 0.0;
        }
    }

    fn creature_state(handler: &ObjectHandler, id: ObjectId) -> (VitalState, MovementState, bool) {
        let Some(ObjectKind::Creature(c)) = handler.get(id).map(|o| &o.kind) else {
            panic!("expected a creature");
        };
        (*c.vitals.current(), *c.movement.current(), c.movement.is_active())
    }

    fn object(pos: Vec2, radius: f32, verlet: bool) -> WorldObject {
        let mut actor = Actor::new(pos, radius);
        if verlet {
            actor = actor.with_body();
        }
        WorldObject::new(actor, ObjectKind::RunExit)
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut handler = ObjectHandler::new();
        let a = handler.add_object(object(Vec2::ZERO, 1.0, false));
        let b = handler.add_object(object(Vec2::ZERO, 1.0, false));
        assert_eq!((a, b), (ObjectId(0), ObjectId(1)));
        assert!(handler.remove_object(a).is_some());
        assert!(handler.get(a).is_none());
        assert_eq!(handler.len(), 1);
    }

    #[test]
    fn test_response_splits_by_area() {
        let mut a = object(Vec2::ZERO, 10.0, true);
        let mut b = object(Vec2::new(10.0, 0.0), 10.0, true);
        collision_response(&mut a, &mut b);
        // overlap 10, ratio 0.5, softened by 0.1
        assert!((a.pos() - Vec2::new(-0.5, 0.0)).length() < 1e-5);
        assert!((b.pos() - Vec2::new(10.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_response_never_moves_static_side() {
        let mut moving = object(Vec2::ZERO, 10.0, true);
        let mut fixed = object(Vec2::new(10.0, 0.0), 10.0, false);
        collision_response(&mut moving, &mut fixed);
        assert_eq!(fixed.pos(), Vec2::new(10.0, 0.0));
        assert!((moving.pos() - Vec2::new(-1.0, 0.0)).length() < 1e-5);

        let mut fixed = object(Vec2::ZERO, 10.0, false);
        let mut moving = object(Vec2::new(10.0, 0.0), 10.0, true);
        collision_response(&mut fixed, &mut moving);
        assert_eq!(fixed.pos(), Vec2::ZERO);
        assert!((moving.pos() - Vec2::new(11.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_apart_objects_stay_put() {
        let mut a = object(Vec2::ZERO, 1.0, true);
        let mut b = object(Vec2::new(5.0, 0.0), 1.0, true);
        collision_response(&mut a, &mut b);
        assert_eq!(a.pos(), Vec2::ZERO);
        assert_eq!(b.pos(), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_draw_order_by_y() {
        let mut handler = ObjectHandler::new();
        let low = handler.add_object(object(Vec2::new(0.0, 50.0), 1.0, false));
        let high = handler.add_object(object(Vec2::new(0.0, -50.0), 1.0, false));
        let ids: Vec<ObjectId> = handler.draw_order().iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![high, low]);
    }

    #[test]
    fn test_killing_blow_removes_creature_once() {
        let mut world = World::new();
        let input = TickInput::default();
        let mut handler = ObjectHandler::new();
        let goblin = creature::spawn(&world.data, 0, Vec2::ZERO).unwrap();
        let id = handler.add_object(goblin);

        let mut frame = world.frame(&input);
        let target = handler.get_mut(id).unwrap();
        assert!(target.change_hp(-25.0, None, &mut frame));
        assert_eq!(target.actor.vitals.as_ref().map(|v| v.hp), Some(0.0));

        handler.update(&mut frame);
        assert!(handler.get(id).is_none());
        handler.update(&mut frame);
        let deaths = world
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::ObjectDied { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_player_picks_up_touching_item() {
        let mut world = World::new();
        let input = TickInput {
            pick_up: true,
            ..Default::default()
        };
        let mut handler = ObjectHandler::new();
        let player = handler.add_object(player_object(Vec2::ZERO));
        let bone = props::item(&world.data, 0, None, Vec2::new(4.0, 0.0)).unwrap();
        let bone = handler.add_object(bone);

        let mut frame = world.frame(&input);
        handler.update(&mut frame);
        assert!(handler.get(bone).is_none());
        let carried = handler
            .get(player)
            .and_then(|p| p.as_player())
            .map(|p| p.gear.inventory.len());
        assert_eq!(carried, Some(1));
        assert!(
            world
                .events
                .iter()
                .any(|e| *e == GameEvent::Message("Found Bone.".into()))
        );
    }

    #[test]
    fn test_exit_needs_interact() {
        let mut world = World::new();
        let mut handler = ObjectHandler::new();
        handler.add_object(player_object(Vec2::ZERO));
        handler.add_object(props::exit(Vec2::new(5.0, 0.0)));

        let idle = TickInput::default();
        let mut frame = world.frame(&idle);
        handler.update(&mut frame);
        assert_eq!(frame.commands.transition, None);

        let interact = TickInput {
            interact: true,
            ..Default::default()
        };
        let mut frame = world.frame(&interact);
        handler.update(&mut frame);
        assert_eq!(
            frame.commands.transition,
            Some(crate::sim::frame::Transition::NextLevel)
        );
    }

    #[test]
    fn test_dropped_item_starts_at_rest() {
        let mut world = World::new();
        let input = TickInput::default();
        let mut handler = ObjectHandler::new();
        let mut frame = world.frame(&input);
        frame.spawn_item(0, None, Vec2::new(7.0, 0.0), Vec2::ZERO);
        handler.apply_commands(&mut frame);
        handler.update(&mut frame);

        let bone = &handler.objects()[0];
        assert_eq!(bone.pos(), Vec2::new(7.0, 0.0));
        assert_eq!(bone.actor.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_downed_creature_stands_back_up() {
        let mut world = World::new();
        let input = TickInput::default();
        let mut handler = ObjectHandler::new();
        let id = handler.add_object(creature::spawn(&world.data, 1, Vec2::ZERO).unwrap());
        let mut frame = world.frame(&input);

        if let Some(object) = handler.get_mut(id) {
            kill(object);
        }
        handler.update(&mut frame);
        assert_eq!(
            creature_state(&handler, id),
            (VitalState::Down { timer: 3 }, MovementState::Idle, false)
        );
        // Hits while down are ignored
        let skeleton = handler.get_mut(id).unwrap();
        assert!(!skeleton.change_hp(-5.0, None, &mut frame));

        handler.update(&mut frame);
        handler.update(&mut frame);
        assert!(matches!(creature_state(&handler, id).0, VitalState::Down { .. }));
        handler.update(&mut frame);
        assert_eq!(
            creature_state(&handler, id),
            (VitalState::Alive, MovementState::Idle, true)
        );
        let vitals = handler.get(id).and_then(|o| o.actor.vitals.as_ref()).unwrap();
        assert_eq!(vitals.hp, 15.0);
        assert!(!vitals.invulnerable);
        assert!(!world.events.iter().any(|e| matches!(e, GameEvent::ObjectDied { .. })));
    }

    #[test]
    fn test_split_creature_bursts_into_children() {
        let mut world = World::new();
        let input = TickInput::default();
        let mut handler = ObjectHandler::new();
        let at = Vec2::new(20.0, -10.0);
        let id = handler.add_object(creature::spawn(&world.data, 2, at).unwrap());
        let mut frame = world.frame(&input);

        if let Some(object) = handler.get_mut(id) {
            kill(object);
        }
        handler.update(&mut frame);
        assert!(handler.get(id).is_none());

        let children: Vec<&WorldObject> = handler
            .objects()
            .iter()
            .filter(|o| matches!(&o.kind, ObjectKind::Creature(c) if c.mind.species == 3))
            .collect();
        assert_eq!(children.len(), 2);
        // Freshly spawned bodies have not moved yet
        assert!(children.iter().all(|c| c.actor.velocity() == Vec2::ZERO));
        assert!(children.iter().all(|c| c.pos().distance(at) <= 12.0));
        assert_eq!(
            world
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::ObjectDied { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_flee_species_starts_facing_anywhere() {
        let mut world = World::new();
        let input = TickInput::default();
        let mut handler = ObjectHandler::new();
        let rat = handler.add_object(creature::spawn(&world.data, 4, Vec2::ZERO).unwrap());
        let goblin = handler.add_object(creature::spawn(&world.data, 0, Vec2::new(50.0, 0.0)).unwrap());

        let mut frame = world.frame(&input);
        handler.update(&mut frame);
        let rotation = |id| handler.get(id).map(|o| o.actor.rotation);
        let facing = rotation(rat).unwrap();
        assert!(facing != 0.0 && (0.0..360.0).contains(&facing));
        assert_eq!(rotation(goblin), Some(0.0));
    }

    #[test]
    fn test_aggro_range_is_inclusive() {
        let mut world = World::new();
        let input = TickInput::default();
        let mut handler = ObjectHandler::new();
        handler.add_object(player_object(Vec2::ZERO));
        let goblin = creature::spawn(&world.data, 0, Vec2::new(crate::consts::AGGRO_RANGE, 0.0));
        let goblin = handler.add_object(goblin.unwrap());

        let mut frame = world.frame(&input);
        handler.update(&mut frame);
        assert_eq!(creature_state(&handler, goblin).1, MovementState::Following);
    }

    #[test]
    fn test_follow_sound_waits_for_playing_group() {
        let mut world = World::new();
        let mut handler = ObjectHandler::new();
        handler.add_object(player_object(Vec2::ZERO));
        let hound = creature::spawn(&world.data, 5, Vec2::new(100.0, 0.0)).unwrap();
        let hound = handler.add_object(hound);
        let input = TickInput {
            playing_sound_groups: vec![SoundGroup::Object(hound)],
            ..Default::default()
        };

        let mut frame = world.frame(&input);
        for _ in 0..200 {
            handler.update(&mut frame);
        }
        assert_eq!(creature_state(&handler, hound).1, MovementState::Following);
        assert!(
            !world
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::Sound(s) if s.name == "growl"))
        );
    }

    #[test]
    fn test_eating_harmful_item_hurts() {
        let mut world = World::new();
        let input = TickInput {
            consume: true,
            ..Default::default()
        };
        let mut handler = ObjectHandler::new();
        let player = handler.add_object(player_object(Vec2::ZERO));
        if let Some(p) = handler.get_mut(player).and_then(|o| o.as_player_mut()) {
            p.gear.inventory.add(InventoryItem { id: 1, durability: -1 });
        }

        let mut frame = world.frame(&input);
        handler.update(&mut frame);
        let hp = handler.get(player).and_then(|o| o.actor.vitals.as_ref()).map(|v| v.hp);
        assert_eq!(hp, Some(crate::consts::PLAYER_MAX_HP - 5.0));
        assert!(
            world
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::Sound(s) if s.name == "hurt"))
        );
        assert!(
            world
                .events
                .contains(&GameEvent::Message("Consumed Toadstool.".into()))
        );
    }
}
