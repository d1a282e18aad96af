//! Config - Race tunables
//!
//! Every constant the simulation uses lives here so a race can be reshaped
//! from a JSON file without touching code.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::race::error::RaceError;

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Lap count at which a racer wins
    pub total_laps: u32,
    /// Number of autonomous racers spawned next to the player
    pub autonomous_count: usize,
    /// Proximity that counts as reaching a checkpoint (exclusive)
    pub checkpoint_radius: f32,
    /// Max distance from the expected checkpoint before a respawn (exclusive)
    pub cheat_distance: f32,
    /// Max vehicle speed before a respawn (exclusive)
    pub speed_cap: f32,
    /// Bodies below this height are recovered
    pub floor_height: f32,
    /// Seconds a racer stays frozen after a respawn
    pub respawn_delay: f32,
    /// Countdown length in whole seconds
    pub countdown_secs: u32,
    /// Pickup trigger distance (exclusive)
    pub pickup_radius: f32,
    /// Speed added by a pickup
    pub pickup_boost: f32,
    /// Prop model of the moving hazard
    pub hazard_model: String,
    /// Hazard anchor relative to checkpoint 1
    pub hazard_offset: Vec3,
    /// Peak sideways swing of a moving hazard
    pub hazard_amplitude: f32,
    /// Pickup position relative to checkpoint 2
    pub pickup_offset: Vec3,
    /// Ring prop model placed on every checkpoint
    pub checkpoint_model: String,
    /// Model every racer spawns in
    pub vehicle_model: String,
    /// Ambient condition applied on start and on teardown
    pub ambient_condition: String,
    /// Target ticks per second for the driver loop
    pub tick_rate: f32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            total_laps: 3,
            autonomous_count: 4,
            checkpoint_radius: 5.0,
            cheat_distance: 50.0,
            speed_cap: 60.0,
            floor_height: -10.0,
            respawn_delay: 2.0,
            countdown_secs: 3,
            pickup_radius: 3.0,
            pickup_boost: 10.0,
            hazard_model: "prop_barrel_02a".to_string(),
            hazard_offset: Vec3::new(0.0, 5.0, 0.0),
            hazard_amplitude: 10.0,
            pickup_offset: Vec3::new(0.0, 0.0, 1.0),
            checkpoint_model: "prop_checkpoint_02b".to_string(),
            vehicle_model: "bati".to_string(),
            ambient_condition: "CLEAR".to_string(),
            tick_rate: 60.0,
        }
    }
}

impl RaceConfig {
    /// Parse a config; missing keys fall back to defaults
    pub fn from_json(text: &str) -> Result<Self, RaceError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RaceError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject values a race can't run with
    pub fn validate(&self) -> Result<(), RaceError> {
        // racers begin on lap 1, so a single-lap race could never be won
        if self.total_laps < 2 {
            return Err(RaceError::InvalidConfig("total_laps must be at least 2".into()));
        }
        let positive = [
            ("checkpoint_radius", self.checkpoint_radius),
            ("cheat_distance", self.cheat_distance),
            ("speed_cap", self.speed_cap),
            ("pickup_radius", self.pickup_radius),
            ("tick_rate", self.tick_rate),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(RaceError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.respawn_delay < 0.0 {
            return Err(RaceError::InvalidConfig("respawn_delay can't be negative".into()));
        }
        Ok(())
    }
}
