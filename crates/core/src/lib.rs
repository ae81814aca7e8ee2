//! Shared domain types and pure escalation logic for codecall.
//!
//! This crate has no I/O: the escalation policy, urgency levels, role
//! constants, and the domain error enum live here so both the event
//! pipeline and the API layer can use them without pulling in sqlx or
//! axum.

pub mod error;
pub mod escalation;
pub mod roles;
pub mod types;
pub mod urgency;
