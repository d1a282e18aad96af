//! Track - Ordered checkpoint course
//!
//! A track is just positions; the blips and rings that make checkpoints
//! visible belong to the entity registry.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::race::error::RaceError;

/// A stock course that can be loaded by index
pub struct PresetTrack {
    pub name: &'static str,
    pub checkpoints: &'static [[f32; 3]],
}

pub const PRESET_TRACKS: &[PresetTrack] = &[
    PresetTrack {
        name: "Los Santos Loop",
        checkpoints: &[
            [-425.67, 1126.76, 325.85],
            [-350.23, 1150.45, 325.85],
            [-300.89, 1100.12, 325.85],
            [-425.67, 1126.76, 325.85],
        ],
    },
    PresetTrack {
        name: "Blaine County Sprint",
        checkpoints: &[
            [-1000.45, 2000.78, 50.23],
            [-900.12, 2100.56, 50.23],
            [-800.34, 2000.89, 50.23],
            [-1000.45, 2000.78, 50.23],
        ],
    },
];

/// One waypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub position: Vec3,
    /// Only the first checkpoint of a track is the start
    pub is_start: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    checkpoints: Vec<Checkpoint>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a track from a list of positions
    pub fn from_positions(positions: impl IntoIterator<Item = Vec3>) -> Self {
        let mut track = Self::new();
        for position in positions {
            track.add_checkpoint(position);
        }
        track
    }

    /// Build one of the stock courses
    pub fn preset(index: usize) -> Result<Self, RaceError> {
        let preset = PRESET_TRACKS.get(index).ok_or(RaceError::InvalidIndex {
            index,
            available: PRESET_TRACKS.len(),
        })?;
        Ok(Self::from_positions(preset.checkpoints.iter().map(|&p| Vec3::from_array(p))))
    }

    /// Append a checkpoint; the first one becomes the start
    pub fn add_checkpoint(&mut self, position: Vec3) -> &Checkpoint {
        let is_start = self.checkpoints.is_empty();
        self.checkpoints.push(Checkpoint { position, is_start });
        &self.checkpoints[self.checkpoints.len() - 1]
    }

    /// Replace the course with a preset; leaves the track untouched on a bad index
    pub fn load(&mut self, index: usize) -> Result<(), RaceError> {
        *self = Self::preset(index)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.checkpoints.clear();
    }

    pub fn is_valid(&self) -> bool {
        self.checkpoints.len() >= 2
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Checkpoint lookup. `IndexOutOfRange` at `index == len` means the lap is done.
    pub fn checkpoint_at(&self, index: usize) -> Result<&Checkpoint, RaceError> {
        self.checkpoints.get(index).ok_or(RaceError::IndexOutOfRange {
            index,
            len: self.checkpoints.len(),
        })
    }

    pub fn start(&self) -> Option<&Checkpoint> {
        self.checkpoints.first()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_checkpoint_is_start() {
        let mut track = Track::new();
        assert!(track.add_checkpoint(Vec3::ZERO).is_start);
        assert!(!track.add_checkpoint(Vec3::X).is_start);
        assert!(!track.add_checkpoint(Vec3::Y).is_start);
        assert_eq!(track.start().map(|c| c.position), Some(Vec3::ZERO));
    }

    #[test]
    fn validity_needs_two_checkpoints() {
        let mut track = Track::new();
        assert!(!track.is_valid());
        track.add_checkpoint(Vec3::ZERO);
        assert!(!track.is_valid());
        track.add_checkpoint(Vec3::X);
        assert!(track.is_valid());
        track.add_checkpoint(Vec3::Y);
        assert!(track.is_valid());
    }

    #[test]
    fn checkpoint_at_is_bounds_checked() {
        let track = Track::from_positions([Vec3::ZERO, Vec3::X]);
        assert_eq!(track.checkpoint_at(1).unwrap().position, Vec3::X);
        assert!(matches!(
            track.checkpoint_at(2),
            Err(RaceError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn load_replaces_checkpoints() {
        let mut track = Track::from_positions([Vec3::ZERO, Vec3::X, Vec3::Y]);
        track.load(1).unwrap();
        assert_eq!(track.len(), 4);
        assert_eq!(track.checkpoints()[0].position, Vec3::new(-1000.45, 2000.78, 50.23));
        assert!(track.checkpoints()[0].is_start);
        assert!(!track.checkpoints()[3].is_start);
    }

    #[test]
    fn load_bad_index_leaves_track_alone() {
        let mut track = Track::from_positions([Vec3::ZERO, Vec3::X]);
        let err = track.load(PRESET_TRACKS.len()).unwrap_err();
        assert!(matches!(err, RaceError::InvalidIndex { index: 2, available: 2 }));
        assert_eq!(track.len(), 2);
    }
}
