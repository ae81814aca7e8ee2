//! Well-known staff role name constants.
//!
//! These must match the `staff.role` column values and the recipient
//! role sets in the default escalation policy.

pub const ROLE_NURSE: &str = "nurse";
pub const ROLE_DOCTOR: &str = "doctor";
pub const ROLE_ADMINISTRATOR: &str = "administrator";
