//! Entity models mapping database rows to Rust structs.

pub mod alert;
pub mod alert_event;
pub mod audit;
pub mod hospital;
pub mod staff;
pub mod status;
