//! Geocoding collaborator contract and location resolution.
//!
//! # Invariants
//! - A map click always resolves to a location; a geocoding miss falls back
//!   to a synthesized coordinate label.
//! - An address search resolves to at most one location.

use crate::model::record::{Position, SelectedLocation};
use log::debug;
use std::collections::HashMap;

/// Result of a forward geocoding lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    Found {
        position: Position,
        formatted_address: String,
    },
    NotFound,
}

/// Geocoding provider operations used by core.
pub trait Geocoder {
    fn geocode(&self, address: &str) -> GeocodeOutcome;
    /// Returns a formatted address, or `None` when the provider has nothing.
    fn reverse_geocode(&self, position: Position) -> Option<String>;
}

/// Label used when reverse geocoding finds nothing for a clicked point.
pub fn coordinate_label(position: Position) -> String {
    format!("緯度: {:.6}, 経度: {:.6}", position.lat, position.lng)
}

/// Resolves a clicked map position into a selectable location.
pub fn resolve_click(geocoder: &impl Geocoder, position: Position) -> SelectedLocation {
    match geocoder.reverse_geocode(position) {
        Some(address) if !address.trim().is_empty() => SelectedLocation::new(position, address),
        _ => {
            debug!("event=reverse_geocode module=geocode status=not_found fallback=coordinate_label");
            SelectedLocation::new(position, coordinate_label(position))
        }
    }
}

/// Resolves a composed search address into a selectable location.
pub fn resolve_search(geocoder: &impl Geocoder, address: &str) -> Option<SelectedLocation> {
    match geocoder.geocode(address) {
        GeocodeOutcome::Found {
            position,
            formatted_address,
        } => Some(SelectedLocation::new(position, formatted_address)),
        GeocodeOutcome::NotFound => {
            debug!("event=geocode module=geocode status=not_found");
            None
        }
    }
}

/// Table-backed geocoder for offline use and tests.
///
/// Reverse lookups match on the exact position bits.
#[derive(Debug, Default, Clone)]
pub struct StaticGeocoder {
    forward: HashMap<String, (Position, String)>,
    reverse: HashMap<(u64, u64), String>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers both directions for one place.
    pub fn with_place(
        mut self,
        query: impl Into<String>,
        position: Position,
        formatted_address: impl Into<String>,
    ) -> Self {
        let formatted_address = formatted_address.into();
        self.reverse
            .insert(position_bits(position), formatted_address.clone());
        self.forward
            .insert(query.into(), (position, formatted_address));
        self
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, address: &str) -> GeocodeOutcome {
        match self.forward.get(address) {
            Some((position, formatted_address)) => GeocodeOutcome::Found {
                position: *position,
                formatted_address: formatted_address.clone(),
            },
            None => GeocodeOutcome::NotFound,
        }
    }

    fn reverse_geocode(&self, position: Position) -> Option<String> {
        self.reverse.get(&position_bits(position)).cloned()
    }
}

fn position_bits(position: Position) -> (u64, u64) {
    (position.lat.to_bits(), position.lng.to_bits())
}
