//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate key derivation, record persistence and highlight sync.
//! - Keep UI/map adapters decoupled from storage details.

pub mod property_map;
pub mod sweeper;
