//! Catacomb Crawler headless runner
//!
//! Plays a scripted run against the bundled data and logs what happens.
//! Usage: `catacomb-crawler [seed] [ticks]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), catacomb_crawler::DataError> {
    use catacomb_crawler::GameData;
    use catacomb_crawler::audio::SoundQueue;
    use catacomb_crawler::sim::{GameEvent, GamePhase, GameState, TickInput, tick};
    use catacomb_crawler::{consts::FPS, from_degrees};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);
    let ticks: u64 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60 * u64::from(FPS));

    let data = GameData::from_json(include_str!("../assets/game_data.json"))?;
    let mut state = GameState::new(seed, data)?;
    let sounds = SoundQueue::new();
    let mut deaths = 0;

    log::info!("Catacomb Crawler (headless) starting: seed {seed}, {ticks} ticks");
    while state.time_ticks < ticks && state.phase == GamePhase::Playing {
        // Wander in a slow circle, grabbing everything and taking every exit
        let t = state.time_ticks;
        let input = TickInput {
            movement: from_degrees(1.0, (t / 2) as f32 % 360.0),
            interact: true,
            pick_up: true,
            next_item: t % (10 * u64::from(FPS)) == 0,
            ..Default::default()
        };
        tick(&mut state, &input)?;

        let events = state.drain_events();
        sounds.forward_events(&events);
        for event in events {
            match event {
                GameEvent::Message(text) => log::info!("> {text}"),
                GameEvent::ObjectDied { .. } => deaths += 1,
                GameEvent::RunEnded { loot_value } => log::info!("Escaped with {loot_value} loot"),
                GameEvent::PlayerDied => log::info!("The catacombs claim another"),
                _ => {}
            }
        }
        // No mixer in headless mode
        sounds.drain();
    }

    log::info!(
        "Finished after {} ticks on level {} ({}): {:?}, {deaths} kills, {} loot",
        state.time_ticks,
        state.level.counter,
        state.level.name,
        state.phase,
        state.loot_value()
    );
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is driven by the host page on the web
}
