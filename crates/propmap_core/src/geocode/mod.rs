//! Geocoding seam: address search and click resolution.

pub mod query;
pub mod resolver;
