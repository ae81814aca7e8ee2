//! HTTP handler functions, grouped by resource.

pub mod alerts;
pub mod staff;
