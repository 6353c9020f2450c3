//! Canonical record key derivation.
//!
//! # Responsibility
//! - Map positions or address labels to stable record identities.
//!
//! # Invariants
//! - Exactly one strategy is active per deployment.

pub mod normalizer;
