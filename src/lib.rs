//! Elimination Race - Checkpoint racing with last-place elimination
//!
//! The race core talks to its host through the `world` capability traits.
//! `run()` drives one demo race against the in-memory headless world.

pub mod headless;
pub mod race;
pub mod simulation;
pub mod world;

use env_logger::{Builder, Env};
use glam::Vec3;

pub use headless::{HeadlessWorld, LogNotifier, RecordingNotifier};
pub use race::{RaceConfig, RaceController, RaceError, RaceEvent, RaceSnapshot, RaceState};
pub use simulation::{GameServer, ServerStats};
pub use world::{EntityHandle, EntityKind, Notifier, WorldService};

/// Demo loop: every leg fits inside the default off-course tolerance
const DEMO_TRACK: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [35.0, 0.0, 0.0],
    [35.0, 35.0, 0.0],
    [0.0, 35.0, 0.0],
];

const DEMO_SEED: u64 = 7;

/// Simulated seconds before the demo gives up on a finish
const DEMO_TIME_LIMIT: f32 = 600.0;

type DemoController = RaceController<HeadlessWorld, LogNotifier>;

/// Run one headless race. The first CLI argument may name a JSON config.
pub fn run() -> Result<(), RaceError> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading race config from {}", path);
            RaceConfig::load(path)?
        }
        None => RaceConfig::default(),
    };

    let mut race = RaceController::new(config, HeadlessWorld::with_seed(DEMO_SEED), LogNotifier);
    for position in DEMO_TRACK {
        race.add_checkpoint(Vec3::from_array(position));
    }
    race.place_prop("prop_mp_ramp_03", Vec3::new(17.5, 0.0, 0.0))?;
    log::info!("ramp placed");

    let mut server = GameServer::new(race);
    server.start_race()?;

    let delta = server.tick_interval();
    let max_ticks = (DEMO_TIME_LIMIT / delta) as u32;
    for _ in 0..max_ticks {
        drive_player(server.race_mut());
        server.race_mut().world_mut().advance(delta);
        let snapshot = server.step(delta);

        for event in server.race_mut().drain_events() {
            if let Ok(json) = serde_json::to_string(&event) {
                log::debug!("event {}", json);
            }
        }
        if snapshot.state == RaceState::Ended {
            break;
        }
    }

    match server.race().winner() {
        Some(winner) => log::info!("racer {} takes the race", winner),
        None => {
            log::warn!("no finish within {}s, stopping", DEMO_TIME_LIMIT);
            server.reset();
        }
    }
    let stats = server.get_stats();
    log::info!(
        "average tick {:.3} ms at {} ticks/s",
        stats.avg_tick_time_ms,
        stats.tick_rate
    );
    Ok(())
}

/// Stand-in for player input: steer the human racer at its next checkpoint
fn drive_player(race: &mut DemoController) {
    let Some(human) = race.agents().iter().find(|a| a.is_human()) else {
        return;
    };
    let (body, vehicle) = (human.body(), human.vehicle());
    let Ok(target) = race.track().checkpoint_at(human.checkpoint_index()).map(|c| c.position) else {
        return;
    };
    race.world_mut().issue_navigate_intent(body, vehicle, target);
}
