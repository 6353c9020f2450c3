//! Highlight overlays derived from fresh records.
//!
//! # Responsibility
//! - Define the map surface seam.
//! - Keep one overlay per fresh record, none for stale or deleted ones.

pub mod surface;
pub mod sync;
