//! Status helper enum mapping to the `alert_statuses` lookup table.
//!
//! Variant discriminants match the seed data order (1-based) in
//! `alert_statuses`.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Alert lifecycle status.
///
/// Exactly one status holds at any time; `Resolved` is terminal.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Active = 1,
    Acknowledged = 2,
    Resolved = 3,
}

impl AlertStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Lowercase wire name used in API responses and events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    /// Map a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Active),
            2 => Some(Self::Acknowledged),
            3 => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl From<AlertStatus> for StatusId {
    fn from(value: AlertStatus) -> Self {
        value as StatusId
    }
}
