//! Simulation - Tick driver around the race controller
//!
//! Turns wall-clock time into `update` calls, keeps tick timing statistics
//! and lets a host pause or reset the race between ticks.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::race::controller::{RaceController, RaceSnapshot, RaceState};
use crate::race::error::RaceError;
use crate::world::{Notifier, WorldService};

/// Number of recent ticks averaged in the stats
const TICK_WINDOW: usize = 60;

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub tick_rate: f32,
    /// Mean over the last 60 ticks
    pub avg_tick_time_ms: f32,
    /// Racers still in the race
    pub racer_count: usize,
    pub race_state: RaceState,
    pub paused: bool,
}

/// Drives a race controller at the configured tick rate
pub struct GameServer<W: WorldService, N: Notifier> {
    race: RaceController<W, N>,
    /// Target tick rate (ticks per second)
    tick_rate: f32,
    /// Last tick timestamp
    last_tick: Instant,
    /// Recent tick durations in milliseconds
    tick_times: Vec<f32>,
    paused: bool,
}

impl<W: WorldService, N: Notifier> GameServer<W, N> {
    /// Create a game server around a race controller
    pub fn new(race: RaceController<W, N>) -> Self {
        let tick_rate = race.config().tick_rate;
        Self {
            race,
            tick_rate,
            last_tick: Instant::now(),
            tick_times: Vec::with_capacity(TICK_WINDOW),
            paused: false,
        }
    }

    /// Start the race countdown
    pub fn start_race(&mut self) -> Result<(), RaceError> {
        self.race.start()?;
        self.paused = false;
        self.last_tick = Instant::now();
        Ok(())
    }

    /// Advance by the wall-clock time since the previous tick
    pub fn tick(&mut self) -> RaceSnapshot {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.step(delta)
    }

    /// Advance by an explicit `delta` seconds
    pub fn step(&mut self, delta: f32) -> RaceSnapshot {
        if self.paused {
            return self.race.get_snapshot();
        }

        let tick_start = Instant::now();
        self.race.update(delta);

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > TICK_WINDOW {
            self.tick_times.remove(0);
        }

        self.race.get_snapshot()
    }

    /// Seconds per tick at the target rate
    pub fn tick_interval(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> RaceSnapshot {
        self.race.get_snapshot()
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            tick_rate: self.tick_rate,
            avg_tick_time_ms: avg_tick_time,
            racer_count: self.race.agents().len(),
            race_state: self.race.state(),
            paused: self.paused,
        }
    }

    /// Stop advancing the race; ticks only report snapshots until resumed
    pub fn pause(&mut self) {
        if !self.paused {
            log::info!("race paused");
            self.paused = true;
        }
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.paused {
            log::info!("race resumed");
            self.paused = false;
            // time spent paused doesn't count
            self.last_tick = Instant::now();
        }
    }

    /// Tear down any race in progress and clear the stats
    pub fn reset(&mut self) {
        self.race.abort();
        self.paused = false;
        self.tick_times.clear();
        log::info!("race reset");
    }

    /// Check if the server is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Get the race controller
    pub fn race(&self) -> &RaceController<W, N> {
        &self.race
    }

    /// Get the race controller mutably
    pub fn race_mut(&mut self) -> &mut RaceController<W, N> {
        &mut self.race
    }
}
