//! Headless - In-memory world and notifiers
//!
//! `HeadlessWorld` keeps entities in a map and stands in for the host's
//! movement engine with a straight-line mover, which is all the demo and
//! the tests need.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::world::{EntityHandle, EntityKind, Notifier, WorldError, WorldService};

/// Speed lost per second while a vehicle is above its cruise speed
const BOOST_DECAY: f32 = 5.0;

#[derive(Debug, Clone)]
struct WorldEntity {
    /// `None` for the player body
    kind: Option<EntityKind>,
    position: Vec3,
    speed: f32,
    /// Speed the mover drives this vehicle at
    cruise_speed: f32,
    frozen: bool,
    wrecked: bool,
    seated_in: Option<EntityHandle>,
}

impl WorldEntity {
    fn new(kind: Option<EntityKind>, position: Vec3, cruise_speed: f32) -> Self {
        Self {
            kind,
            position,
            speed: 0.0,
            cruise_speed,
            frozen: false,
            wrecked: false,
            seated_in: None,
        }
    }
}

type SpawnFilter = Box<dyn Fn(&EntityKind) -> bool>;

/// In-memory world with a straight-line mover standing in for the host's driving AI
pub struct HeadlessWorld {
    entities: BTreeMap<EntityHandle, WorldEntity>,
    player: EntityHandle,
    next_handle: u64,
    /// driver -> (vehicle, target)
    intents: HashMap<EntityHandle, (EntityHandle, Vec3)>,
    intents_issued: usize,
    ambient: Option<String>,
    fail_spawns: Option<SpawnFilter>,
    rng: StdRng,
    /// Cruise speeds handed to new vehicles are drawn from this range
    cruise_range: (f32, f32),
}

impl HeadlessWorld {
    /// Create a world seeded with 0
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create a world whose vehicle speeds come from `seed`
    pub fn with_seed(seed: u64) -> Self {
        let player = EntityHandle(0);
        let mut entities = BTreeMap::new();
        entities.insert(player, WorldEntity::new(None, Vec3::ZERO, 0.0));
        Self {
            entities,
            player,
            next_handle: 1,
            intents: HashMap::new(),
            intents_issued: 0,
            ambient: None,
            fail_spawns: None,
            rng: StdRng::seed_from_u64(seed),
            cruise_range: (15.0, 25.0),
        }
    }

    /// Vehicles created from now on cruise somewhere in `min..max`
    pub fn set_cruise_range(&mut self, min: f32, max: f32) {
        self.cruise_range = (min, max);
    }

    /// Override the speed the mover drives one vehicle at
    pub fn set_cruise_speed(&mut self, vehicle: EntityHandle, speed: f32) {
        if let Some(entity) = self.entities.get_mut(&vehicle) {
            entity.cruise_speed = speed;
        }
    }

    /// Make `create_entity` fail for every kind the filter accepts
    pub fn fail_spawns_matching(&mut self, filter: impl Fn(&EntityKind) -> bool + 'static) {
        self.fail_spawns = Some(Box::new(filter));
    }

    /// Check if the handle still refers to something
    pub fn exists(&self, handle: EntityHandle) -> bool {
        self.entities.contains_key(&handle)
    }

    /// Entities other than the player body
    pub fn entity_count(&self) -> usize {
        self.entities.len() - 1
    }

    /// Get what an entity was created as; `None` for the player body
    pub fn kind(&self, handle: EntityHandle) -> Option<&EntityKind> {
        self.entities.get(&handle).and_then(|e| e.kind.as_ref())
    }

    /// Check if an entity is held in place
    pub fn is_frozen(&self, handle: EntityHandle) -> bool {
        self.entities.get(&handle).is_some_and(|e| e.frozen)
    }

    /// Throw an occupant out of whatever it sits in
    pub fn eject(&mut self, occupant: EntityHandle) {
        if let Some(entity) = self.entities.get_mut(&occupant) {
            entity.seated_in = None;
        }
    }

    /// Mark an entity dead or wrecked
    pub fn wreck(&mut self, handle: EntityHandle) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.wrecked = true;
        }
    }

    /// Get where a driver was last told to go
    pub fn navigate_target(&self, driver: EntityHandle) -> Option<Vec3> {
        self.intents.get(&driver).map(|(_, target)| *target)
    }

    /// Get how many navigate intents were issued so far
    pub fn intents_issued(&self) -> usize {
        self.intents_issued
    }

    /// Get the last ambient condition applied
    pub fn ambient_condition(&self) -> Option<&str> {
        self.ambient.as_deref()
    }

    /// Move every navigating vehicle `delta` seconds towards its target
    pub fn advance(&mut self, delta: f32) {
        let intents: Vec<(EntityHandle, EntityHandle, Vec3)> = self
            .intents
            .iter()
            .map(|(&driver, &(vehicle, target))| (driver, vehicle, target))
            .collect();

        for (driver, vehicle, target) in intents {
            if !self.is_seated(driver, vehicle) {
                continue;
            }
            let Some(entity) = self.entities.get_mut(&vehicle) else {
                continue;
            };
            if entity.frozen || entity.wrecked {
                entity.speed = 0.0;
                continue;
            }

            let speed = entity.speed.max(entity.cruise_speed);
            let to_target = target - entity.position;
            let distance = to_target.length();
            if distance <= f32::EPSILON {
                entity.speed = 0.0;
                continue;
            }
            let step = (speed * delta).min(distance);
            entity.position += to_target / distance * step;
            entity.speed = (speed - BOOST_DECAY * delta).max(entity.cruise_speed);
            let position = entity.position;

            if let Some(body) = self.entities.get_mut(&driver) {
                body.position = position;
            }
        }
    }
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldService for HeadlessWorld {
    fn player(&self) -> EntityHandle {
        self.player
    }

    fn create_entity(
        &mut self,
        kind: &EntityKind,
        position: Vec3,
    ) -> Result<EntityHandle, WorldError> {
        if self.fail_spawns.as_ref().is_some_and(|fails| fails(kind)) {
            return Err(WorldError::Unavailable { kind: kind.clone() });
        }
        let (min, max) = self.cruise_range;
        let cruise_speed = match kind {
            EntityKind::Vehicle { .. } => self.rng.gen_range(min..=max),
            _ => 0.0,
        };
        let handle = EntityHandle(self.next_handle);
        self.next_handle += 1;
        self.entities
            .insert(handle, WorldEntity::new(Some(kind.clone()), position, cruise_speed));
        Ok(handle)
    }

    fn destroy_entity(&mut self, handle: EntityHandle) {
        if handle == self.player {
            return;
        }
        self.entities.remove(&handle);
        self.intents
            .retain(|driver, (vehicle, _)| *driver != handle && *vehicle != handle);
        for entity in self.entities.values_mut() {
            if entity.seated_in == Some(handle) {
                entity.seated_in = None;
            }
        }
    }

    fn position(&self, handle: EntityHandle) -> Option<Vec3> {
        self.entities.get(&handle).map(|e| e.position)
    }

    fn speed(&self, handle: EntityHandle) -> f32 {
        self.entities.get(&handle).map_or(0.0, |e| e.speed)
    }

    fn set_position(&mut self, handle: EntityHandle, position: Vec3) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.position = position;
        }
    }

    fn set_speed(&mut self, handle: EntityHandle, speed: f32) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.speed = speed;
        }
    }

    fn set_frozen(&mut self, handle: EntityHandle, frozen: bool) {
        if let Some(entity) = self.entities.get_mut(&handle) {
            entity.frozen = frozen;
        }
    }

    fn seat_occupant(&mut self, occupant: EntityHandle, vehicle: EntityHandle) {
        if !self.entities.contains_key(&vehicle) {
            return;
        }
        if let Some(entity) = self.entities.get_mut(&occupant) {
            entity.seated_in = Some(vehicle);
        }
    }

    fn is_seated(&self, occupant: EntityHandle, vehicle: EntityHandle) -> bool {
        self.entities.contains_key(&vehicle)
            && self
                .entities
                .get(&occupant)
                .is_some_and(|e| e.seated_in == Some(vehicle))
    }

    fn is_wrecked(&self, handle: EntityHandle) -> bool {
        self.entities.get(&handle).map_or(true, |e| e.wrecked)
    }

    fn issue_navigate_intent(&mut self, driver: EntityHandle, vehicle: EntityHandle, target: Vec3) {
        self.intents.insert(driver, (vehicle, target));
        self.intents_issued += 1;
    }

    fn set_ambient_condition(&mut self, value: &str) {
        self.ambient = Some(value.to_string());
    }
}

/// Sends notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, text: &str) {
        log::info!("{}", text);
    }

    fn show_transient_message(&mut self, text: &str, duration_ms: u32) {
        log::debug!("{} ({}ms)", text, duration_ms);
    }
}

/// Keeps everything it was told, for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    pub notifications: Vec<String>,
    pub transient: Vec<(String, u32)>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, text: &str) {
        self.notifications.push(text.to_string());
    }

    fn show_transient_message(&mut self, text: &str, duration_ms: u32) {
        self.transient.push((text.to_string(), duration_ms));
    }
}
