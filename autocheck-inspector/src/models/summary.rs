//! Registry-wide derived state

use serde::{Deserialize, Serialize};
use std::fmt;

use super::RoomView;

/// Registry-wide phase driving top-level presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No rooms submitted
    Idle,
    /// At least one room still analyzing
    Analyzing,
    /// Every room finished (complete or error)
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Analyzing => "analyzing",
            Phase::Results => "results",
        };
        f.write_str(name)
    }
}

/// Aggregate cleanliness across all rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSummary {
    pub score: u8,
    pub phase: Phase,
}

/// Full read-only view: rooms in insertion order plus the aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub rooms: Vec<RoomView>,
    pub global: GlobalSummary,
}
