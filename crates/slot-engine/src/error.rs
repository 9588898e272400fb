//! Error types for slot-engine operations.

use thiserror::Error;

use crate::slots::SlotConflict;
use crate::time::DayOfWeek;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed time string, date, day name, or zone identifier.
    #[error("Invalid format: {0}")]
    Format(String),

    /// End not after start, non-positive duration, or a range too short to hold one slot.
    #[error("Invalid range: {0}")]
    Range(String),

    /// A new slot overlaps slots already configured for the same day.
    #[error("{} slot(s) conflict with existing slots on {day}", .conflicts.len())]
    Conflict {
        day: DayOfWeek,
        conflicts: Vec<SlotConflict>,
    },

    /// The panelist commitments query failed; availability is unknown.
    #[error("Availability query failed: {0}")]
    AvailabilityQuery(String),

    #[error("Slot configuration store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
