//! Hazards - Moving obstacles and one-shot pickups

use glam::Vec3;

use crate::race::agent::{Agent, AgentId};
use crate::race::error::RaceError;
use crate::race::registry::{EntityRegistry, Owner};
use crate::world::{BlipStyle, EntityHandle, EntityKind, WorldService};

/// An obstacle prop that can swing back and forth across its anchor
#[derive(Debug, Clone)]
pub struct Hazard {
    prop: EntityHandle,
    /// Rest position; a moving hazard swings around it
    anchor: Vec3,
    moving: bool,
}

impl Hazard {
    /// Place the hazard prop at `anchor`, registered under `Owner::Hazard(index)`
    pub fn spawn(
        index: usize,
        model: &str,
        anchor: Vec3,
        moving: bool,
        world: &mut dyn WorldService,
        registry: &mut EntityRegistry,
    ) -> Result<Self, RaceError> {
        let prop = registry.spawn(
            world,
            Owner::Hazard(index),
            EntityKind::Prop {
                model: model.to_string(),
            },
            anchor,
        )?;
        Ok(Self {
            prop,
            anchor,
            moving,
        })
    }

    /// Where the hazard sits `elapsed` seconds into the race
    pub fn position_at(&self, elapsed: f32, amplitude: f32) -> Vec3 {
        if !self.moving {
            return self.anchor;
        }
        self.anchor + Vec3::new(elapsed.sin() * amplitude, 0.0, 0.0)
    }

    pub fn update(&self, elapsed: f32, amplitude: f32, world: &mut dyn WorldService) {
        if self.moving {
            world.set_position(self.prop, self.position_at(elapsed, amplitude));
        }
    }

    /// Get the prop handle
    pub fn prop(&self) -> EntityHandle {
        self.prop
    }
}

/// A speed boost collected by the first racer to come close.
/// Stays registered after use; it just stops doing anything.
#[derive(Debug, Clone)]
pub struct Pickup {
    position: Vec3,
    marker: EntityHandle,
    active: bool,
}

impl Pickup {
    /// Place an active pickup marked by a pickup blip
    pub fn spawn(
        index: usize,
        position: Vec3,
        world: &mut dyn WorldService,
        registry: &mut EntityRegistry,
    ) -> Result<Self, RaceError> {
        let marker = registry.spawn(
            world,
            Owner::Pickup(index),
            EntityKind::Blip {
                style: BlipStyle::Pickup,
            },
            position,
        )?;
        Ok(Self {
            position,
            marker,
            active: true,
        })
    }

    /// Hand the boost to the first agent within `radius`. Returns who got it.
    pub fn update(
        &mut self,
        agents: &[Agent],
        radius: f32,
        boost: f32,
        world: &mut dyn WorldService,
    ) -> Option<AgentId> {
        if !self.active {
            return None;
        }
        let collector = agents.iter().find(|agent| {
            world
                .position(agent.body())
                .is_some_and(|p| p.distance(self.position) < radius)
        })?;

        let speed = world.speed(collector.vehicle());
        world.set_speed(collector.vehicle(), speed + boost);
        self.active = false;
        Some(collector.id())
    }

    /// Get the trigger position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Get the blip handle
    pub fn marker(&self) -> EntityHandle {
        self.marker
    }

    /// Check if the boost hasn't been collected yet
    pub fn is_active(&self) -> bool {
        self.active
    }
}
