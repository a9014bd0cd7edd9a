//! Fixed timestep simulation tick
//!
//! One call advances the run by one frame: objects update, collide, and any
//! level transition requested along the way is applied at the end.

use glam::Vec2;

use super::frame::{Commands, Frame, Transition};
use super::state::{GameEvent, GamePhase, GameState};
use crate::audio::SoundGroup;
use crate::data::DataError;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Desired movement direction; normalised by the player
    pub movement: Vec2,
    /// Use exits
    pub interact: bool,
    pub pick_up: bool,
    /// Consume the equipped item
    pub consume: bool,
    pub previous_item: bool,
    pub next_item: bool,
    /// Drop the equipped item
    pub drop_item: bool,
    /// Where ambient sounds are heard from; defaults to the player
    pub listener_pos: Option<Vec2>,
    /// Groups the host's mixer is still playing
    pub playing_sound_groups: Vec<SoundGroup>,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) -> Result<(), DataError> {
    if state.phase != GamePhase::Playing {
        return Ok(());
    }

    let transition = {
        let level = &mut state.level;
        let mut frame = Frame {
            boundaries: &level.boundaries,
            pathfinder: &mut level.pathfinder,
            physics: level.physics,
            data: &state.data,
            rng: &mut state.rng,
            input,
            time_ticks: state.time_ticks,
            player: None,
            events: &mut state.events,
            commands: Commands::default(),
        };
        level.objects.update(&mut frame);
        frame.commands.transition
    };
    state.time_ticks += 1;

    match transition {
        None => {}
        Some(Transition::NextLevel) => state.next_level()?,
        Some(Transition::EndRun) => {
            let loot_value = state.loot_value();
            log::info!("Run complete with {loot_value} loot");
            state.phase = GamePhase::RunComplete;
            state.events.push(GameEvent::RunEnded { loot_value });
        }
        Some(Transition::GameOver) => {
            log::info!("Player died on level {}", state.level.counter);
            state.phase = GamePhase::GameOver;
            state.events.push(GameEvent::PlayerDied);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameData;
    use crate::sim::circle::Positioned;
    use crate::sim::object::ObjectKind;
    use crate::sim::player::InventoryItem;
    use crate::sim::props;

    const DATA: &str = include_str!("../../assets/game_data.json");

    fn state(seed: u64) -> GameState {
        GameState::new(seed, GameData::from_json(DATA).unwrap()).unwrap()
    }

    fn run(seed: u64, ticks: usize) -> (Vec<Vec2>, Vec<GameEvent>) {
        let mut state = state(seed);
        let input = TickInput {
            movement: Vec2::new(1.0, 0.5),
            ..Default::default()
        };
        for _ in 0..ticks {
            tick(&mut state, &input).unwrap();
        }
        let positions = state.level.objects.objects().iter().map(|o| o.pos()).collect();
        (positions, state.drain_events())
    }

    #[test]
    fn test_tick_is_deterministic() {
        assert_eq!(run(1234, 120), run(1234, 120));
    }

    #[test]
    fn test_player_moves_with_input() {
        let mut state = state(5);
        let start = state.player_object().unwrap().pos();
        let input = TickInput {
            movement: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        for _ in 0..10 {
            tick(&mut state, &input).unwrap();
        }
        assert!(state.player_object().unwrap().pos().y > start.y);
        assert_eq!(state.time_ticks, 10);
    }

    #[test]
    fn test_exit_with_interact_loads_next_level() {
        let mut state = state(9);
        let at = state.player_object().unwrap().pos();
        state.level.objects.add_object(props::exit(at));
        state.drain_events();

        tick(&mut state, &TickInput::default()).unwrap();
        assert_eq!(state.level.counter, 1);

        let interact = TickInput {
            interact: true,
            ..Default::default()
        };
        tick(&mut state, &interact).unwrap();
        assert_eq!(state.level.counter, 2);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::LevelEntered { counter: 2, .. }))
        );
    }

    #[test]
    fn test_run_exit_ends_run_with_loot() {
        let mut state = state(9);
        let at = state.player_object().unwrap().pos();
        if let Some(player) = state
            .level
            .objects
            .get_mut(state.player_id)
            .and_then(|o| o.as_player_mut())
        {
            player.gear.inventory.add(InventoryItem { id: 3, durability: -1 });
        }
        let expected = state.data.item(3).unwrap().cost;
        state.level.objects.add_object(props::run_exit(at));

        let interact = TickInput {
            interact: true,
            ..Default::default()
        };
        tick(&mut state, &interact).unwrap();
        assert_eq!(state.phase, GamePhase::RunComplete);
        assert!(
            state
                .events
                .contains(&GameEvent::RunEnded { loot_value: expected })
        );

        // Finished runs no longer advance
        let ticks = state.time_ticks;
        tick(&mut state, &interact).unwrap();
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_player_death_ends_game() {
        let mut state = state(11);
        if let Some(player) = state.level.objects.get_mut(state.player_id) {
            if let Some(vitals) = player.actor.vitals.as_mut() {
                vitals.hp = 0.0;
            }
            assert!(matches!(player.kind, ObjectKind::Player(_)));
        }
        tick(&mut state, &TickInput::default()).unwrap();
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.events.contains(&GameEvent::PlayerDied));
    }
}
