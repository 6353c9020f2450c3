//! Record persistence layer.
//!
//! # Responsibility
//! - Own the canonical key -> record mapping.
//! - Isolate document encoding and storage I/O from orchestration code.
//!
//! # Invariants
//! - Every mutation is followed by a synchronous persist attempt.

pub mod record_store;
