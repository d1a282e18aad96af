//! Race Module
//!
//! Track, racers, obstacles and the controller that runs the elimination
//! policy over them.

pub mod agent;
pub mod config;
pub mod controller;
pub mod error;
pub mod hazards;
pub mod registry;
pub mod track;

pub use agent::{Agent, AgentId, AgentSnapshot, Control};
pub use config::RaceConfig;
pub use controller::{RaceController, RaceEvent, RaceSnapshot, RaceState, VEHICLE_MODELS};
pub use error::{RaceError, Violation};
pub use hazards::{Hazard, Pickup};
pub use registry::{EntityRegistry, Owner};
pub use track::{Checkpoint, Track, PRESET_TRACKS};
