//! Agent - Per-racer progress state machine
//!
//! Human and autonomous racers share the same progress, recovery and
//! anti-cheat logic. The only thing autonomous racers add is a navigate
//! intent to the host's movement engine whenever their target changes.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::race::config::RaceConfig;
use crate::race::error::{RaceError, Violation};
use crate::race::registry::{EntityRegistry, Owner};
use crate::race::track::Track;
use crate::world::{EntityHandle, EntityKind, WorldService};

/// Stable racer id, unique within a controller
pub type AgentId = u32;

/// Highest primary colour index a spawned vehicle can get
const VEHICLE_COLORS: u8 = 160;

/// Who drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Control {
    /// Steered by external input
    Human,
    /// Steered by navigate intents to the host movement engine
    Autonomous,
}

/// What happened to an agent during one update
#[derive(Debug, Default)]
pub struct AgentTick {
    /// Index of the checkpoint reached this tick
    pub reached: Option<usize>,
    /// Respawned because the body or vehicle was lost
    pub recovered: bool,
    /// Rule broken when the anti-cheat check fired
    pub cheat: Option<Violation>,
    /// Checkpoint index the agent was put back on
    pub respawned_at: Option<usize>,
}

/// One racer: a body seated in a vehicle, plus its lap progress
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    control: Control,
    /// Player body or spawned driver
    body: EntityHandle,
    vehicle: EntityHandle,
    /// Next checkpoint to reach; equals the track length once the lap is done
    checkpoint_index: usize,
    /// Lap being driven, starting at 1
    lap_count: u32,
    /// Seconds left frozen after a respawn
    respawn_timer: f32,
    /// Checkpoint the movement engine was last sent to
    navigating_to: Option<usize>,
}

impl Agent {
    /// Wrap already seated entities; progress starts at checkpoint 0 of lap 1
    pub fn new(id: AgentId, control: Control, body: EntityHandle, vehicle: EntityHandle) -> Self {
        Self {
            id,
            control,
            body,
            vehicle,
            checkpoint_index: 0,
            lap_count: 1,
            respawn_timer: 0.0,
            navigating_to: None,
        }
    }

    /// Materialize a racer seated in a fresh vehicle at `start`.
    ///
    /// The human reuses the player's body; autonomous racers get a driver.
    /// Everything created is registered under the agent, so a failure
    /// halfway can be cleaned up with `Owner::Agent(id)`.
    pub fn spawn(
        id: AgentId,
        control: Control,
        vehicle_model: &str,
        start: Vec3,
        world: &mut dyn WorldService,
        registry: &mut EntityRegistry,
    ) -> Result<Self, RaceError> {
        let body = match control {
            Control::Human => {
                let player = world.player();
                world.set_position(player, start);
                player
            }
            Control::Autonomous => {
                registry.spawn(world, Owner::Agent(id), EntityKind::Driver, start)?
            }
        };

        let color = rand::thread_rng().gen_range(0..VEHICLE_COLORS);
        let vehicle = registry.spawn(
            world,
            Owner::Agent(id),
            EntityKind::Vehicle {
                model: vehicle_model.to_string(),
                color,
            },
            start,
        )?;
        world.seat_occupant(body, vehicle);

        Ok(Self::new(id, control, body, vehicle))
    }

    /// Run one tick of recovery, progress and anti-cheat checks
    pub fn update(
        &mut self,
        track: &Track,
        config: &RaceConfig,
        world: &mut dyn WorldService,
        delta: f32,
    ) -> AgentTick {
        let mut tick = AgentTick::default();

        if self.respawn_timer > 0.0 {
            self.respawn_timer -= delta;
            if self.respawn_timer <= 0.0 {
                self.respawn_timer = 0.0;
                world.set_frozen(self.vehicle, false);
            }
            return tick;
        }

        if self.needs_recovery(config, world) {
            tick.recovered = true;
            tick.respawned_at = self.respawn(track, config, world);
            return tick;
        }

        if self.is_at_checkpoint(track, config, world) {
            tick.reached = Some(self.checkpoint_index);
            self.checkpoint_index += 1;
        }

        if let Some(violation) = self.check_for_cheating(track, config, world) {
            tick.cheat = Some(violation);
            tick.respawned_at = self.respawn(track, config, world);
            return tick;
        }

        self.steer(track, world);
        tick
    }

    /// Send an autonomous racer towards its current checkpoint,
    /// unless it is already headed there
    pub fn steer(&mut self, track: &Track, world: &mut dyn WorldService) {
        if self.control != Control::Autonomous
            || self.navigating_to == Some(self.checkpoint_index)
        {
            return;
        }
        if let Ok(checkpoint) = track.checkpoint_at(self.checkpoint_index) {
            world.issue_navigate_intent(self.body, self.vehicle, checkpoint.position);
            self.navigating_to = Some(self.checkpoint_index);
        }
    }

    /// Dead, out of the vehicle, or fallen through the world
    fn needs_recovery(&self, config: &RaceConfig, world: &dyn WorldService) -> bool {
        if world.is_wrecked(self.body) || world.is_wrecked(self.vehicle) {
            return true;
        }
        if !world.is_seated(self.body, self.vehicle) {
            return true;
        }
        match world.position(self.body) {
            Some(position) => position.z < config.floor_height,
            None => true,
        }
    }

    fn is_at_checkpoint(
        &self,
        track: &Track,
        config: &RaceConfig,
        world: &dyn WorldService,
    ) -> bool {
        let (Ok(checkpoint), Some(position)) = (
            track.checkpoint_at(self.checkpoint_index),
            world.position(self.body),
        ) else {
            return false;
        };
        position.distance(checkpoint.position) < config.checkpoint_radius
    }

    fn check_for_cheating(
        &self,
        track: &Track,
        config: &RaceConfig,
        world: &dyn WorldService,
    ) -> Option<Violation> {
        let expected = track.checkpoint_at(self.checkpoint_index).ok()?;
        let position = world.position(self.body)?;

        let distance = position.distance(expected.position);
        if distance > config.cheat_distance {
            return Some(Violation::OffCourse { distance });
        }
        let speed = world.speed(self.vehicle);
        if speed > config.speed_cap {
            return Some(Violation::Overspeed { speed });
        }
        None
    }

    /// Put the racer back on the last checkpoint it cleared and freeze it
    /// for the grace period. Returns the checkpoint index used.
    pub fn respawn(
        &mut self,
        track: &Track,
        config: &RaceConfig,
        world: &mut dyn WorldService,
    ) -> Option<usize> {
        let index = self.checkpoint_index.saturating_sub(1);
        let target = track.checkpoint_at(index).ok()?.position;

        world.set_position(self.body, target);
        world.set_position(self.vehicle, target);
        world.set_speed(self.vehicle, 0.0);
        world.seat_occupant(self.body, self.vehicle);
        if config.respawn_delay > 0.0 {
            world.set_frozen(self.vehicle, true);
            self.respawn_timer = config.respawn_delay;
        }
        // teleporting drops whatever task the movement engine had
        self.navigating_to = None;

        log::warn!("racer {} respawned at checkpoint {}", self.id, index);
        Some(index)
    }

    /// Every checkpoint of the lap has been reached
    pub fn has_finished_lap(&self, track: &Track) -> bool {
        self.checkpoint_index >= track.len()
    }

    /// Back to checkpoint 0 for the next lap
    pub fn reset_lap_progress(&mut self) {
        self.checkpoint_index = 0;
    }

    /// Count one more lap; the caller resets progress afterwards
    pub fn advance_lap(&mut self) {
        self.lap_count += 1;
    }

    /// Destroy everything registered for this racer. The human body stays.
    pub fn remove(&self, world: &mut dyn WorldService, registry: &mut EntityRegistry) {
        registry.release_owner(world, Owner::Agent(self.id));
    }

    /// Get the racer id
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Get who drives
    pub fn control(&self) -> Control {
        self.control
    }

    /// Check if the racer is steered by external input
    pub fn is_human(&self) -> bool {
        self.control == Control::Human
    }

    /// Get the racer's body handle
    pub fn body(&self) -> EntityHandle {
        self.body
    }

    /// Get the racer's vehicle handle
    pub fn vehicle(&self) -> EntityHandle {
        self.vehicle
    }

    /// Get the next checkpoint to reach
    pub fn checkpoint_index(&self) -> usize {
        self.checkpoint_index
    }

    /// Get the lap being driven
    pub fn lap_count(&self) -> u32 {
        self.lap_count
    }

    /// Check if the racer is frozen in its respawn grace period
    pub fn is_respawning(&self) -> bool {
        self.respawn_timer > 0.0
    }
}

/// Compact racer state for UI/IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub control: Control,
    pub checkpoint_index: usize,
    pub lap_count: u32,
    pub respawning: bool,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            control: agent.control,
            checkpoint_index: agent.checkpoint_index,
            lap_count: agent.lap_count,
            respawning: agent.is_respawning(),
        }
    }
}
