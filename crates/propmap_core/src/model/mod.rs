//! Domain model for annotated map locations.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every record is identified by a normalized `RecordKey`.
//! - Expiry hides highlights but never removes a record.

pub mod record;
