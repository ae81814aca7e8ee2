//! Alert urgency levels.
//!
//! Urgency is stored as a SMALLINT in the `alerts.urgency` column.
//! Lower values are more urgent (level 1 is the most urgent).

use crate::error::CoreError;

/// Urgency ordinal type matching SMALLINT in the database.
pub type UrgencyId = i16;

/// Clinical urgency of an alert, ordered most-urgent-first.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrgencyLevel {
    Critical = 1,
    Urgent = 2,
    High = 3,
    Moderate = 4,
    Routine = 5,
}

impl UrgencyLevel {
    /// Return the database ordinal.
    pub fn id(self) -> UrgencyId {
        self as UrgencyId
    }

    /// Zero-based index into per-urgency lookup tables.
    pub fn index(self) -> usize {
        (self as i16 - 1) as usize
    }
}

impl TryFrom<i16> for UrgencyLevel {
    type Error = CoreError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Critical),
            2 => Ok(Self::Urgent),
            3 => Ok(Self::High),
            4 => Ok(Self::Moderate),
            5 => Ok(Self::Routine),
            other => Err(CoreError::Validation(format!(
                "urgency must be between 1 and 5, got {other}"
            ))),
        }
    }
}
