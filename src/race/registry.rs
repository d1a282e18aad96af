//! Registry - Owner of every entity the race puts into the world
//!
//! Anything spawned for a race is registered the moment it exists, tagged
//! with what it belongs to, so teardown can release it in bulk.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::race::agent::AgentId;
use crate::race::error::RaceError;
use crate::world::{EntityHandle, EntityKind, WorldService};

/// What a registered entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Blip and ring of the checkpoint at this index
    Checkpoint(usize),
    Agent(AgentId),
    Hazard(usize),
    Pickup(usize),
    /// Decorative props placed during setup
    Prop,
}

/// One entity the race put into the world
#[derive(Debug, Clone)]
pub struct RegisteredEntity {
    pub handle: EntityHandle,
    pub kind: EntityKind,
    pub owner: Owner,
}

/// Every race entity, in spawn order
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: Vec<RegisteredEntity>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an entity created elsewhere
    pub fn register(&mut self, owner: Owner, kind: EntityKind, handle: EntityHandle) {
        self.entries.push(RegisteredEntity { handle, kind, owner });
    }

    /// Create an entity and register it before handing it back
    pub fn spawn(
        &mut self,
        world: &mut dyn WorldService,
        owner: Owner,
        kind: EntityKind,
        position: Vec3,
    ) -> Result<EntityHandle, RaceError> {
        let handle = world.create_entity(&kind, position)?;
        log::debug!("spawned {:?} as {:?} for {:?}", kind, handle, owner);
        self.register(owner, kind, handle);
        Ok(handle)
    }

    /// Destroy and forget every entity whose owner matches. Returns how many went.
    pub fn release_where(
        &mut self,
        world: &mut dyn WorldService,
        mut matches: impl FnMut(&Owner) -> bool,
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            if matches(&entry.owner) {
                world.destroy_entity(entry.handle);
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }

    /// Release everything one owner holds
    pub fn release_owner(&mut self, world: &mut dyn WorldService, owner: Owner) -> usize {
        self.release_where(world, |o| *o == owner)
    }

    /// Release everything; used by teardown
    pub fn release_all(&mut self, world: &mut dyn WorldService) -> usize {
        let released = self.release_where(world, |_| true);
        log::debug!("released {} entities", released);
        released
    }

    /// Iterate over the entities one owner holds
    pub fn owned_by(&self, owner: Owner) -> impl Iterator<Item = &RegisteredEntity> {
        self.entries.iter().filter(move |entry| entry.owner == owner)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
