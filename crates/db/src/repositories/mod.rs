//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod alert_event_repo;
pub mod alert_repo;
pub mod audit_repo;
pub mod hospital_repo;
pub mod staff_repo;

pub use alert_event_repo::AlertEventRepo;
pub use alert_repo::AlertRepo;
pub use audit_repo::AuditRepo;
pub use hospital_repo::HospitalRepo;
pub use staff_repo::StaffRepo;
