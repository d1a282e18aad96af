//! Controller - Race lifecycle and lap/elimination policy
//!
//! Owns every piece of race state. The host calls `update` once per tick;
//! the countdown and respawn delays are timed states advanced by that call
//! rather than blocking waits.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::race::agent::{Agent, AgentId, AgentSnapshot, AgentTick, Control};
use crate::race::config::RaceConfig;
use crate::race::error::{RaceError, Violation};
use crate::race::hazards::{Hazard, Pickup};
use crate::race::registry::{EntityRegistry, Owner};
use crate::race::track::{Track, PRESET_TRACKS};
use crate::world::{BlipStyle, EntityHandle, EntityKind, Notifier, WorldService};

/// Stock vehicle choices offered during setup
pub const VEHICLE_MODELS: &[&str] = &["Bati", "Sanchez", "Hexer"];

/// Race lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceState {
    Idle,
    Countdown,
    Running,
    /// Torn down; behaves like `Idle` for the next `start`
    Ended,
}

/// Things collaborators may want to broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RaceEvent {
    CountdownTick { remaining: u32 },
    Started,
    CheckpointReached { agent: AgentId, checkpoint: usize },
    CheatDetected { agent: AgentId, violation: Violation },
    Respawned { agent: AgentId, checkpoint: usize },
    PickupCollected { agent: AgentId },
    LapCompleted { agent: AgentId, lap: u32 },
    LapAdvanced { lap: u32 },
    Eliminated { agent: AgentId },
    Won { agent: AgentId, human: bool },
    Ended,
}

/// Compact race summary for a UI or IPC collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub state: RaceState,
    pub current_lap: u32,
    pub total_laps: u32,
    /// Seconds left before GO
    pub countdown: f32,
    /// Seconds since GO
    pub elapsed_time: f32,
    pub checkpoint_count: usize,
    pub winner: Option<AgentId>,
    pub agents: Vec<AgentSnapshot>,
}

/// Runs one race at a time against a world and a notifier
pub struct RaceController<W: WorldService, N: Notifier> {
    config: RaceConfig,
    state: RaceState,
    track: Track,
    agents: Vec<Agent>,
    hazards: Vec<Hazard>,
    pickups: Vec<Pickup>,
    registry: EntityRegistry,
    world: W,
    notifier: N,
    /// Race-wide lap, closes once every racer has completed it
    current_lap: u32,
    /// Seconds left before GO
    countdown: f32,
    /// Last countdown number shown
    announced: u32,
    /// Seconds since GO
    elapsed_time: f32,
    winner: Option<AgentId>,
    events: Vec<RaceEvent>,
    next_agent_id: AgentId,
}

impl<W: WorldService, N: Notifier> RaceController<W, N> {
    /// Create an idle controller with an empty track
    pub fn new(config: RaceConfig, world: W, notifier: N) -> Self {
        Self {
            config,
            state: RaceState::Idle,
            track: Track::new(),
            agents: Vec::new(),
            hazards: Vec::new(),
            pickups: Vec::new(),
            registry: EntityRegistry::new(),
            world,
            notifier,
            current_lap: 1,
            countdown: 0.0,
            announced: 0,
            elapsed_time: 0.0,
            winner: None,
            events: Vec::new(),
            next_agent_id: 0,
        }
    }

    // ---- setup ----

    /// Check if the track has enough checkpoints to race on
    pub fn has_valid_track(&self) -> bool {
        self.track.is_valid()
    }

    /// Append a checkpoint and make it visible. Returns the new checkpoint count.
    pub fn add_checkpoint(&mut self, position: Vec3) -> usize {
        let checkpoint = *self.track.add_checkpoint(position);
        let index = self.track.len() - 1;
        self.spawn_checkpoint_visuals(index, checkpoint.position, checkpoint.is_start);
        self.track.len()
    }

    /// Swap in a preset course, releasing the old checkpoints' visuals first
    pub fn load_track(&mut self, index: usize) -> Result<(), RaceError> {
        if let Err(err) = self.track.load(index) {
            self.notifier.notify(&err.to_string());
            return Err(err);
        }

        self.registry
            .release_where(&mut self.world, |owner| matches!(owner, Owner::Checkpoint(_)));
        for (i, checkpoint) in self.track.checkpoints().to_vec().into_iter().enumerate() {
            self.spawn_checkpoint_visuals(i, checkpoint.position, checkpoint.is_start);
        }

        log::info!("loaded track {} ({})", index + 1, PRESET_TRACKS[index].name);
        self.notifier.notify(&format!("Loaded track: {}", index + 1));
        Ok(())
    }

    fn spawn_checkpoint_visuals(&mut self, index: usize, position: Vec3, is_start: bool) {
        let style = if is_start {
            BlipStyle::Start
        } else {
            BlipStyle::Standard
        };
        let visuals = [
            EntityKind::Blip { style },
            EntityKind::Prop {
                model: self.config.checkpoint_model.clone(),
            },
        ];
        for kind in visuals {
            if let Err(err) = self
                .registry
                .spawn(&mut self.world, Owner::Checkpoint(index), kind, position)
            {
                log::warn!("checkpoint {} visual unavailable: {}", index, err);
            }
        }
    }

    /// Pick the model every racer spawns in; stored lowercased
    pub fn set_vehicle_model(&mut self, model: &str) {
        self.config.vehicle_model = model.to_lowercase();
    }

    /// Drop a decorative prop into the world; it goes away with the next teardown
    pub fn place_prop(&mut self, model: &str, position: Vec3) -> Result<EntityHandle, RaceError> {
        self.registry.spawn(
            &mut self.world,
            Owner::Prop,
            EntityKind::Prop {
                model: model.to_string(),
            },
            position,
        )
    }

    // ---- lifecycle ----

    /// Spawn racers, hazards and pickups and begin the countdown.
    /// Does nothing if a race is already counting down or running.
    pub fn start(&mut self) -> Result<(), RaceError> {
        if matches!(self.state, RaceState::Countdown | RaceState::Running) {
            log::debug!("start ignored, race already {:?}", self.state);
            return Ok(());
        }
        if let Err(err) = self.config.validate() {
            log::warn!("refusing to start: {}", err);
            self.notifier.notify(&err.to_string());
            return Err(err);
        }
        let start = self
            .track
            .start()
            .map(|c| c.position)
            .filter(|_| self.track.is_valid());
        let Some(start) = start else {
            let err = RaceError::InvalidTrack {
                checkpoints: self.track.len(),
            };
            self.notifier.notify("Add at least 2 checkpoints first!");
            return Err(err);
        };

        self.release_racers();
        self.current_lap = 1;
        self.elapsed_time = 0.0;
        self.winner = None;

        if let Err(err) = self.spawn_agent(Control::Human, start) {
            log::warn!("could not spawn the player's vehicle: {}", err);
            self.release_racers();
            self.state = RaceState::Idle;
            self.notifier.notify("Couldn't spawn your vehicle, race aborted");
            return Err(err);
        }
        for _ in 0..self.config.autonomous_count {
            if let Err(err) = self.spawn_agent(Control::Autonomous, start) {
                log::warn!("skipping an autonomous racer: {}", err);
            }
        }
        for agent in &self.agents {
            self.world.set_frozen(agent.vehicle(), true);
        }

        self.spawn_obstacles();

        log::info!(
            "race starting: {} racers, {} checkpoints, {} laps",
            self.agents.len(),
            self.track.len(),
            self.config.total_laps
        );
        self.state = RaceState::Countdown;
        self.countdown = self.config.countdown_secs as f32;
        self.announced = self.config.countdown_secs;
        if self.config.countdown_secs == 0 {
            self.go();
        } else {
            self.announce(self.announced);
        }
        Ok(())
    }

    fn spawn_agent(&mut self, control: Control, start: Vec3) -> Result<(), RaceError> {
        let id = self.next_agent_id;
        self.next_agent_id += 1;
        match Agent::spawn(
            id,
            control,
            &self.config.vehicle_model,
            start,
            &mut self.world,
            &mut self.registry,
        ) {
            Ok(agent) => {
                self.agents.push(agent);
                Ok(())
            }
            Err(err) => {
                self.registry.release_owner(&mut self.world, Owner::Agent(id));
                Err(err)
            }
        }
    }

    /// One moving hazard by checkpoint 1 and one pickup by checkpoint 2, when the track has them
    fn spawn_obstacles(&mut self) {
        if let Ok(checkpoint) = self.track.checkpoint_at(1) {
            let anchor = checkpoint.position + self.config.hazard_offset;
            match Hazard::spawn(
                self.hazards.len(),
                &self.config.hazard_model,
                anchor,
                true,
                &mut self.world,
                &mut self.registry,
            ) {
                Ok(hazard) => self.hazards.push(hazard),
                Err(err) => log::warn!("racing without a hazard: {}", err),
            }
        }
        if let Ok(checkpoint) = self.track.checkpoint_at(2) {
            let position = checkpoint.position + self.config.pickup_offset;
            match Pickup::spawn(self.pickups.len(), position, &mut self.world, &mut self.registry) {
                Ok(pickup) => self.pickups.push(pickup),
                Err(err) => log::warn!("racing without a pickup: {}", err),
            }
        }
    }

    /// Release racers, hazards and pickups left over from a previous race
    fn release_racers(&mut self) {
        self.agents.clear();
        self.hazards.clear();
        self.pickups.clear();
        self.registry.release_where(&mut self.world, |owner| {
            matches!(owner, Owner::Agent(_) | Owner::Hazard(_) | Owner::Pickup(_))
        });
    }

    fn announce(&mut self, remaining: u32) {
        self.notifier.show_transient_message(&remaining.to_string(), 1000);
        self.events.push(RaceEvent::CountdownTick { remaining });
    }

    fn go(&mut self) {
        self.state = RaceState::Running;
        self.countdown = 0.0;
        self.notifier.show_transient_message("GO!", 1000);
        for agent in &mut self.agents {
            self.world.set_frozen(agent.vehicle(), false);
            agent.steer(&self.track, &mut self.world);
        }
        self.world.set_ambient_condition(&self.config.ambient_condition);
        self.events.push(RaceEvent::Started);
        log::info!("GO");
    }

    /// Advance the race by `delta` seconds
    pub fn update(&mut self, delta: f32) {
        match self.state {
            RaceState::Idle | RaceState::Ended => {}
            RaceState::Countdown => self.update_countdown(delta),
            RaceState::Running => self.update_running(delta),
        }
    }

    fn update_countdown(&mut self, delta: f32) {
        self.countdown -= delta;
        if self.countdown <= 0.0 {
            self.go();
            return;
        }
        let remaining = self.countdown.ceil() as u32;
        if remaining < self.announced {
            self.announced = remaining;
            self.announce(remaining);
        }
    }

    fn update_running(&mut self, delta: f32) {
        if self.agents.is_empty() {
            log::info!("no racers left");
            self.end();
            return;
        }
        self.elapsed_time += delta;

        for agent in &mut self.agents {
            let tick = agent.update(&self.track, &self.config, &mut self.world, delta);
            record_agent_tick(agent.id(), tick, &mut self.events, &mut self.notifier);
        }

        for hazard in &self.hazards {
            hazard.update(self.elapsed_time, self.config.hazard_amplitude, &mut self.world);
        }

        for pickup in &mut self.pickups {
            if let Some(agent) = pickup.update(
                &self.agents,
                self.config.pickup_radius,
                self.config.pickup_boost,
                &mut self.world,
            ) {
                log::info!("racer {} collected a speed boost", agent);
                self.notifier.notify("Speed boost collected!");
                self.events.push(RaceEvent::PickupCollected { agent });
            }
        }

        self.check_race_progress();
        if self.state != RaceState::Running {
            return;
        }

        self.notifier.show_transient_message(
            &format!(
                "Lap: {}/{} | Racers: {}",
                self.current_lap,
                self.config.total_laps,
                self.agents.len()
            ),
            100,
        );
    }

    /// Lap bookkeeping, win check, then lap closure and elimination
    fn check_race_progress(&mut self) {
        let total_laps = self.config.total_laps;

        for i in 0..self.agents.len() {
            let agent = &mut self.agents[i];
            if !agent.has_finished_lap(&self.track) || agent.lap_count() >= total_laps {
                continue;
            }
            agent.advance_lap();
            agent.reset_lap_progress();
            let (id, lap, human) = (agent.id(), agent.lap_count(), agent.is_human());
            log::info!("racer {} started lap {}", id, lap);
            self.events.push(RaceEvent::LapCompleted { agent: id, lap });

            if lap == total_laps {
                log::info!("racer {} won", id);
                self.winner = Some(id);
                self.notifier
                    .notify(if human { "You finished!" } else { "A racer finished!" });
                self.events.push(RaceEvent::Won { agent: id, human });
                self.end();
                return;
            }
        }

        let current_lap = self.current_lap;
        if current_lap < total_laps
            && !self.agents.is_empty()
            && self.agents.iter().all(|a| a.lap_count() > current_lap)
        {
            self.current_lap += 1;
            log::info!("lap {} closed, race on lap {}", current_lap, self.current_lap);
            self.events.push(RaceEvent::LapAdvanced {
                lap: self.current_lap,
            });
            self.eliminate_last_racer();
        }
    }

    fn eliminate_last_racer(&mut self) {
        if self.agents.len() <= 1 {
            return;
        }
        let keys: Vec<(u32, usize)> = self
            .agents
            .iter()
            .map(|a| (a.lap_count(), a.checkpoint_index()))
            .collect();
        let Some(index) = trailing_index(&keys) else {
            return;
        };
        if keys.iter().all(|k| *k == keys[index]) {
            log::info!("photo finish, nobody eliminated");
            return;
        }

        let agent = self.agents.remove(index);
        agent.remove(&mut self.world, &mut self.registry);
        log::info!("racer {} eliminated, {} left", agent.id(), self.agents.len());
        self.notifier.notify("Last racer eliminated!");
        self.events.push(RaceEvent::Eliminated { agent: agent.id() });
    }

    /// Cancel a countdown or running race. Returns whether anything was torn down.
    pub fn abort(&mut self) -> bool {
        if !matches!(self.state, RaceState::Countdown | RaceState::Running) {
            return false;
        }
        log::info!("race aborted");
        self.end();
        true
    }

    /// Take a racer out of the race from outside the elimination policy
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        let Some(index) = self.agents.iter().position(|a| a.id() == id) else {
            return false;
        };
        let agent = self.agents.remove(index);
        agent.remove(&mut self.world, &mut self.registry);
        true
    }

    fn end(&mut self) {
        self.agents.clear();
        self.hazards.clear();
        self.pickups.clear();
        self.registry.release_all(&mut self.world);
        self.track.clear();
        self.world.set_ambient_condition(&self.config.ambient_condition);
        self.notifier.notify("Race ended!");
        self.events.push(RaceEvent::Ended);
        self.state = RaceState::Ended;
        log::info!("race ended");
    }

    // ---- queries ----

    /// Get current race state
    pub fn state(&self) -> RaceState {
        self.state
    }

    /// Check if racers are on the move
    pub fn is_running(&self) -> bool {
        self.state == RaceState::Running
    }

    /// Get the race-wide lap
    pub fn current_lap(&self) -> u32 {
        self.current_lap
    }

    /// Get the lap count that wins
    pub fn total_laps(&self) -> u32 {
        self.config.total_laps
    }

    /// Get the race configuration
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Get the current track
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Get the number of checkpoints on the track
    pub fn checkpoint_count(&self) -> usize {
        self.track.len()
    }

    /// Get the racers still in the race, in spawn order
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Get the hazards of the current race
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    /// Get the pickups of the current race
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Get every entity the race has put in the world
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Get the winner of the last finished race
    pub fn winner(&self) -> Option<AgentId> {
        self.winner
    }

    /// Get the world service
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Get the world service mutably
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Get the notifier
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Hand over everything recorded since the last call
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            state: self.state,
            current_lap: self.current_lap,
            total_laps: self.config.total_laps,
            countdown: self.countdown,
            elapsed_time: self.elapsed_time,
            checkpoint_count: self.track.len(),
            winner: self.winner,
            agents: self.agents.iter().map(AgentSnapshot::from).collect(),
        }
    }
}

fn record_agent_tick(
    id: AgentId,
    tick: AgentTick,
    events: &mut Vec<RaceEvent>,
    notifier: &mut dyn Notifier,
) {
    if let Some(checkpoint) = tick.reached {
        log::debug!("racer {} reached checkpoint {}", id, checkpoint);
        events.push(RaceEvent::CheckpointReached { agent: id, checkpoint });
    }
    if tick.recovered {
        log::warn!("racer {} lost its vehicle", id);
    }
    if let Some(violation) = tick.cheat {
        log::warn!("{}", RaceError::CheatDetected { agent: id, violation });
        notifier.notify("Cheating detected!");
        events.push(RaceEvent::CheatDetected { agent: id, violation });
    }
    if let Some(checkpoint) = tick.respawned_at {
        notifier.notify("Respawned at last checkpoint!");
        events.push(RaceEvent::Respawned { agent: id, checkpoint });
    }
}

/// Position of the racer furthest behind, by `(lap, checkpoint)`.
/// Ties go to whoever comes first.
pub fn trailing_index(progress: &[(u32, usize)]) -> Option<usize> {
    progress
        .iter()
        .enumerate()
        .min_by_key(|(_, key)| **key)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessWorld, RecordingNotifier};

    type Controller = RaceController<HeadlessWorld, RecordingNotifier>;

    fn controller_with(config: RaceConfig, checkpoints: &[Vec3]) -> Controller {
        let mut controller =
            RaceController::new(config, HeadlessWorld::new(), RecordingNotifier::default());
        for &position in checkpoints {
            controller.add_checkpoint(position);
        }
        controller
    }

    fn loop_track() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(30.0, 0.0, 0.0),
            Vec3::new(30.0, 30.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        ]
    }

    fn running(checkpoints: &[Vec3]) -> Controller {
        let mut controller = controller_with(RaceConfig::default(), checkpoints);
        controller.start().unwrap();
        for _ in 0..3 {
            controller.update(1.0);
        }
        assert_eq!(controller.state(), RaceState::Running);
        controller
    }

    /// Park an agent on a position, body and vehicle
    fn park(controller: &mut Controller, agent: usize, position: Vec3) {
        let (body, vehicle) = {
            let a = &controller.agents()[agent];
            (a.body(), a.vehicle())
        };
        controller.world_mut().set_position(body, position);
        controller.world_mut().set_position(vehicle, position);
    }

    /// Walk every agent through the given checkpoints, one tick per checkpoint
    fn drive_all(controller: &mut Controller, positions: &[Vec3]) {
        for &position in positions {
            for i in 0..controller.agents().len() {
                park(controller, i, position);
            }
            controller.update(0.1);
        }
    }

    #[test]
    fn track_validity_follows_checkpoint_count() {
        let mut controller = controller_with(RaceConfig::default(), &[]);
        assert!(!controller.has_valid_track());
        controller.add_checkpoint(Vec3::ZERO);
        assert!(!controller.has_valid_track());
        assert_eq!(controller.add_checkpoint(Vec3::X), 2);
        assert!(controller.has_valid_track());
    }

    #[test]
    fn checkpoints_get_blip_and_ring() {
        let controller = controller_with(RaceConfig::default(), &loop_track());
        assert_eq!(controller.registry().owned_by(Owner::Checkpoint(0)).count(), 2);
        let start_blip = controller
            .registry()
            .owned_by(Owner::Checkpoint(0))
            .any(|e| e.kind == EntityKind::Blip { style: BlipStyle::Start });
        assert!(start_blip);
        let other_blip = controller
            .registry()
            .owned_by(Owner::Checkpoint(1))
            .any(|e| e.kind == EntityKind::Blip { style: BlipStyle::Standard });
        assert!(other_blip);
    }

    #[test]
    fn start_with_invalid_track_stays_idle() {
        let mut controller = controller_with(RaceConfig::default(), &[Vec3::ZERO]);
        let err = controller.start().unwrap_err();
        assert!(matches!(err, RaceError::InvalidTrack { checkpoints: 1 }));
        assert_eq!(controller.state(), RaceState::Idle);
        assert!(controller.agents().is_empty());
        let last = controller.notifier().notifications.last().map(String::as_str);
        assert_eq!(last, Some("Add at least 2 checkpoints first!"));
    }

    #[test]
    fn unwinnable_config_refuses_to_start() {
        let config = RaceConfig {
            total_laps: 1,
            autonomous_count: 0,
            ..Default::default()
        };
        let mut controller = controller_with(config, &[Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)]);
        let err = controller.start().unwrap_err();
        assert!(matches!(err, RaceError::InvalidConfig(_)));
        assert_eq!(controller.state(), RaceState::Idle);
        assert!(controller.agents().is_empty());
        // only the checkpoint blips and rings
        assert_eq!(controller.world().entity_count(), 4);
    }

    #[test]
    fn shortest_race_ends_after_one_lap() {
        let config = RaceConfig {
            total_laps: 2,
            autonomous_count: 0,
            ..Default::default()
        };
        let track = [Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)];
        let mut controller = controller_with(config, &track);
        controller.start().unwrap();
        for _ in 0..3 {
            controller.update(1.0);
        }
        drive_all(&mut controller, &track);
        assert_eq!(controller.state(), RaceState::Ended);
        assert!(controller.winner().is_some());
    }

    #[test]
    fn load_track_replaces_visuals() {
        let checkpoints = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut controller = controller_with(RaceConfig::default(), &checkpoints);
        controller.load_track(0).unwrap();
        assert_eq!(controller.checkpoint_count(), 4);
        assert_eq!(controller.registry().len(), 8);
        assert_eq!(controller.world().entity_count(), 8);
    }

    #[test]
    fn load_track_bad_index_changes_nothing() {
        let mut controller = controller_with(RaceConfig::default(), &[Vec3::ZERO, Vec3::X]);
        let err = controller.load_track(7).unwrap_err();
        assert!(matches!(err, RaceError::InvalidIndex { index: 7, .. }));
        assert_eq!(controller.checkpoint_count(), 2);
        assert_eq!(controller.registry().len(), 4);
    }

    #[test]
    fn start_spawns_field_and_counts_down() {
        let mut controller = controller_with(RaceConfig::default(), &loop_track());
        controller.start().unwrap();
        assert_eq!(controller.state(), RaceState::Countdown);
        assert_eq!(controller.agents().len(), 5);
        assert_eq!(controller.agents().iter().filter(|a| a.is_human()).count(), 1);
        assert_eq!(controller.hazards().len(), 1);
        assert_eq!(controller.pickups().len(), 1);
        assert!(controller.agents().iter().all(|a| controller.world().is_frozen(a.vehicle())));

        // already counting down: no-op
        controller.start().unwrap();
        assert_eq!(controller.agents().len(), 5);

        controller.update(1.0);
        controller.update(1.0);
        assert_eq!(controller.state(), RaceState::Countdown);
        controller.update(1.0);
        assert_eq!(controller.state(), RaceState::Running);
        assert!(controller.agents().iter().all(|a| !controller.world().is_frozen(a.vehicle())));
        assert_eq!(controller.world().ambient_condition(), Some("CLEAR"));

        let shown: Vec<&str> = controller
            .notifier()
            .transient
            .iter()
            .map(|(text, _)| text.as_str())
            .collect();
        assert_eq!(&shown[..4], &["3", "2", "1", "GO!"]);
        assert!(controller.drain_events().contains(&RaceEvent::Started));
    }

    #[test]
    fn autonomous_racers_get_first_intent_on_go() {
        let controller = running(&loop_track());
        assert_eq!(controller.world().intents_issued(), 4);
    }

    #[test]
    fn two_checkpoint_track_skips_pickup() {
        let checkpoints = [Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)];
        let mut controller = controller_with(RaceConfig::default(), &checkpoints);
        controller.start().unwrap();
        assert_eq!(controller.hazards().len(), 1);
        assert!(controller.pickups().is_empty());
    }

    #[test]
    fn failed_hazard_spawn_is_not_fatal() {
        let mut controller = controller_with(RaceConfig::default(), &loop_track());
        controller
            .world_mut()
            .fail_spawns_matching(|kind| {
                matches!(kind, EntityKind::Prop { model } if model == "prop_barrel_02a")
            });
        controller.start().unwrap();
        assert_eq!(controller.state(), RaceState::Countdown);
        assert!(controller.hazards().is_empty());
        assert_eq!(controller.pickups().len(), 1);
    }

    #[test]
    fn failed_player_vehicle_aborts_start() {
        let mut controller = controller_with(RaceConfig::default(), &loop_track());
        let before = controller.registry().len();
        controller
            .world_mut()
            .fail_spawns_matching(|kind| matches!(kind, EntityKind::Vehicle { .. }));
        let err = controller.start().unwrap_err();
        assert!(matches!(err, RaceError::EntityUnavailable(_)));
        assert_eq!(controller.state(), RaceState::Idle);
        assert!(controller.agents().is_empty());
        assert_eq!(controller.registry().len(), before);
    }

    #[test]
    fn vehicle_model_is_lowercased() {
        let mut controller = controller_with(RaceConfig::default(), &loop_track());
        controller.set_vehicle_model(VEHICLE_MODELS[1]);
        controller.start().unwrap();
        let vehicle = controller.agents()[0].vehicle();
        assert!(matches!(
            controller.world().kind(vehicle),
            Some(EntityKind::Vehicle { model, .. }) if model == "sanchez"
        ));
    }

    #[test]
    fn update_is_noop_when_idle() {
        let mut controller = controller_with(RaceConfig::default(), &loop_track());
        controller.update(1.0);
        assert_eq!(controller.state(), RaceState::Idle);
        assert!(controller.notifier().transient.is_empty());
    }

    #[test]
    fn simultaneous_lap_advances_without_elimination() {
        let mut controller = running(&loop_track());
        drive_all(&mut controller, &loop_track());

        assert_eq!(controller.agents().len(), 5);
        assert!(controller.agents().iter().all(|a| a.lap_count() == 2));
        assert!(controller.agents().iter().all(|a| a.checkpoint_index() == 0));
        assert_eq!(controller.current_lap(), 2);
        assert!(!controller
            .drain_events()
            .iter()
            .any(|e| matches!(e, RaceEvent::Eliminated { .. })));
    }

    #[test]
    fn last_racer_across_the_line_is_eliminated() {
        let mut controller = running(&loop_track());
        let track = loop_track();
        let last = controller.agents()[2].id();

        // everyone but agent 2 completes the lap and gets one checkpoint into the next
        for &position in &track {
            for i in 0..controller.agents().len() {
                if i != 2 {
                    park(&mut controller, i, position);
                }
            }
            controller.update(0.1);
        }
        for i in 0..controller.agents().len() {
            if i != 2 {
                park(&mut controller, i, track[0]);
            }
        }
        controller.update(0.1);
        assert_eq!(controller.current_lap(), 1);

        // agent 2 finally closes the lap
        for &position in &track {
            park(&mut controller, 2, position);
            controller.update(0.1);
        }

        assert_eq!(controller.current_lap(), 2);
        assert_eq!(controller.agents().len(), 4);
        assert!(controller.agents().iter().all(|a| a.id() != last));
        assert!(controller
            .drain_events()
            .contains(&RaceEvent::Eliminated { agent: last }));
    }

    #[test]
    fn reaching_final_lap_wins_immediately() {
        let mut controller = running(&loop_track());
        let track = loop_track();
        let human = controller.agents()[0].id();

        for _ in 0..2 {
            for &position in &track {
                park(&mut controller, 0, position);
                controller.update(0.1);
            }
        }

        assert_eq!(controller.state(), RaceState::Ended);
        assert_eq!(controller.winner(), Some(human));
        assert!(controller.agents().is_empty());
        assert!(controller.registry().is_empty());
        assert_eq!(controller.world().entity_count(), 0);
        assert_eq!(controller.checkpoint_count(), 0);
        assert!(controller.notifier().notifications.iter().any(|n| n == "You finished!"));
        assert!(controller.notifier().notifications.iter().any(|n| n == "Race ended!"));
    }

    #[test]
    fn single_survivor_is_never_eliminated() {
        let mut config = RaceConfig::default();
        config.autonomous_count = 0;
        config.total_laps = 4;
        let mut controller = controller_with(config, &loop_track());
        controller.start().unwrap();
        for _ in 0..3 {
            controller.update(1.0);
        }
        drive_all(&mut controller, &loop_track());
        assert_eq!(controller.current_lap(), 2);
        assert_eq!(controller.agents().len(), 1);
        assert_eq!(controller.state(), RaceState::Running);
    }

    #[test]
    fn trailing_index_picks_lowest_checkpoint() {
        let progress = [(1, 2), (1, 0), (1, 2), (1, 1)];
        assert_eq!(trailing_index(&progress), Some(1));
    }

    #[test]
    fn trailing_index_ties_go_to_first() {
        let progress = [(2, 3), (2, 1), (2, 1)];
        assert_eq!(trailing_index(&progress), Some(1));
        assert_eq!(trailing_index(&[]), None);
    }

    #[test]
    fn trailing_index_counts_laps_first() {
        let progress = [(3, 0), (2, 3)];
        assert_eq!(trailing_index(&progress), Some(1));
    }

    #[test]
    fn pickup_boost_reaches_one_racer() {
        let mut controller = running(&loop_track());
        let pickup = controller.pickups()[0].position();
        // close enough to grab the pickup, still inside the cheat tolerance of checkpoint 0
        park(&mut controller, 1, pickup + Vec3::new(0.0, 2.0, 0.0));
        controller.update(0.1);
        let events = controller.drain_events();
        let collected: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, RaceEvent::PickupCollected { .. }))
            .collect();
        assert_eq!(collected.len(), 1);
        assert!(!controller.pickups()[0].is_active());
    }

    #[test]
    fn cheat_is_reported_not_fatal() {
        let mut controller = running(&loop_track());
        park(&mut controller, 0, Vec3::new(-200.0, 0.0, 0.0));
        controller.update(0.1);
        assert_eq!(controller.state(), RaceState::Running);
        assert!(controller.notifier().notifications.iter().any(|n| n == "Cheating detected!"));
        assert!(controller
            .drain_events()
            .iter()
            .any(|e| matches!(e, RaceEvent::CheatDetected { .. })));
    }

    #[test]
    fn progress_is_reported_every_tick() {
        let mut controller = running(&loop_track());
        controller.update(0.1);
        let (text, duration) = controller.notifier().transient.last().cloned().unwrap();
        assert_eq!(text, "Lap: 1/3 | Racers: 5");
        assert_eq!(duration, 100);
    }

    #[test]
    fn removing_every_racer_ends_the_race() {
        let mut controller = running(&loop_track());
        let ids: Vec<AgentId> = controller.agents().iter().map(|a| a.id()).collect();
        for id in ids {
            assert!(controller.remove_agent(id));
        }
        controller.update(0.1);
        assert_eq!(controller.state(), RaceState::Ended);
    }

    #[test]
    fn abort_during_countdown_tears_down() {
        let mut controller = controller_with(RaceConfig::default(), &loop_track());
        controller.place_prop("prop_mp_ramp_03", Vec3::new(5.0, 5.0, 0.0)).unwrap();
        controller.start().unwrap();
        assert!(controller.abort());
        assert_eq!(controller.state(), RaceState::Ended);
        assert_eq!(controller.world().entity_count(), 0);
        assert!(!controller.abort());
    }

    #[test]
    fn restart_after_end_needs_a_new_track() {
        let mut controller = running(&loop_track());
        controller.abort();
        assert!(controller.start().is_err());
        controller.load_track(0).unwrap();
        controller.start().unwrap();
        assert_eq!(controller.state(), RaceState::Countdown);
        assert_eq!(controller.current_lap(), 1);
        assert_eq!(controller.agents().len(), 5);
    }
}
