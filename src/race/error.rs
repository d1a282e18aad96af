//! Error - Race error taxonomy

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::race::agent::AgentId;
use crate::world::WorldError;

/// Which anti-cheat rule an agent broke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Violation {
    /// Too far from the checkpoint it is expected to reach next
    OffCourse { distance: f32 },
    /// Vehicle faster than the configured cap
    Overspeed { speed: f32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffCourse { distance } => write!(f, "{distance:.1} units off course"),
            Self::Overspeed { speed } => write!(f, "speed {speed:.1} over the cap"),
        }
    }
}

/// Everything that can go wrong setting up or running a race
#[derive(Debug, Error)]
pub enum RaceError {
    /// Fewer than 2 checkpoints at `start`
    #[error("track needs at least 2 checkpoints, has {checkpoints}")]
    InvalidTrack { checkpoints: usize },

    /// Preset track index past the end of the list
    #[error("no preset track {index} ({available} available)")]
    InvalidIndex { index: usize, available: usize },

    /// Checkpoint lookup past the end; at `index == len` the lap is done
    #[error("checkpoint {index} out of range for a track of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Reported and acted on by a respawn, never returned
    #[error("cheating detected for racer {agent}: {violation}")]
    CheatDetected { agent: AgentId, violation: Violation },

    /// The world couldn't create an entity
    #[error(transparent)]
    EntityUnavailable(#[from] WorldError),

    /// Malformed config JSON
    #[error("invalid race config: {0}")]
    Config(#[from] serde_json::Error),

    /// Config values a race can't run with
    #[error("invalid race config: {0}")]
    InvalidConfig(String),

    /// Config file couldn't be read
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
