//! World - Capability interface to the host environment
//!
//! The race core never touches rendering, input or physics directly. It asks
//! a world service to materialize and move entities, and a notifier to put
//! text in front of the player.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle to an entity living in the host world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub u64);

/// Map marker style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlipStyle {
    /// Green race flag on the start checkpoint
    Start,
    /// Yellow dot on every other checkpoint
    Standard,
    /// Green dot on a pickup
    Pickup,
}

/// What the world is asked to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A vehicle of the given model, painted with a primary colour index
    Vehicle { model: String, color: u8 },
    /// An autonomous driver body
    Driver,
    /// A static or movable prop (rings, barrels, ramps)
    Prop { model: String },
    /// A map marker
    Blip { style: BlipStyle },
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world could not materialize {kind:?}")]
    Unavailable { kind: EntityKind },
}

/// Entity placement and query primitives provided by the host
pub trait WorldService {
    /// The human player's body; always present and never destroyed by the core
    fn player(&self) -> EntityHandle;

    /// Materialize an entity at `position`
    fn create_entity(
        &mut self,
        kind: &EntityKind,
        position: Vec3,
    ) -> Result<EntityHandle, WorldError>;
    fn destroy_entity(&mut self, handle: EntityHandle);

    /// `None` when the handle no longer refers to anything
    fn position(&self, handle: EntityHandle) -> Option<Vec3>;
    fn speed(&self, handle: EntityHandle) -> f32;
    fn set_position(&mut self, handle: EntityHandle, position: Vec3);
    fn set_speed(&mut self, handle: EntityHandle, speed: f32);
    fn set_frozen(&mut self, handle: EntityHandle, frozen: bool);

    fn seat_occupant(&mut self, occupant: EntityHandle, vehicle: EntityHandle);
    fn is_seated(&self, occupant: EntityHandle, vehicle: EntityHandle) -> bool;
    /// Dead body or wrecked vehicle
    fn is_wrecked(&self, handle: EntityHandle) -> bool;

    /// Hand a "drive there" task to the host's movement engine
    fn issue_navigate_intent(&mut self, driver: EntityHandle, vehicle: EntityHandle, target: Vec3);
    fn set_ambient_condition(&mut self, value: &str);
}

/// Fire-and-forget text output
pub trait Notifier {
    fn notify(&mut self, text: &str);
    fn show_transient_message(&mut self, text: &str, duration_ms: u32);
}
