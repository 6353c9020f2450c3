//! Map-rendering collaborator contract.
//!
//! Core never draws anything itself. It asks the surface for opaque overlay
//! handles and hands them back for removal.

use crate::model::record::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Opaque handle to one overlay owned by the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle(Uuid);

impl OverlayHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OverlayHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Circle highlight appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub stroke_color: String,
    pub stroke_opacity: f32,
    pub stroke_weight: u32,
    pub fill_color: String,
    pub fill_opacity: f32,
    /// Circle radius in meters.
    pub radius_m: f64,
    pub clickable: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke_color: "#FFD700".to_string(),
            stroke_opacity: 0.8,
            stroke_weight: 2,
            fill_color: "#FFFF00".to_string(),
            fill_opacity: 0.6,
            radius_m: 20.0,
            clickable: true,
        }
    }
}

/// Map widget operations needed by highlight sync.
pub trait MapSurface {
    fn add_overlay(&mut self, position: Position, style: &OverlayStyle) -> OverlayHandle;
    /// Removing an unknown handle is a no-op.
    fn remove_overlay(&mut self, handle: OverlayHandle);
}

impl<T: MapSurface + ?Sized> MapSurface for Box<T> {
    fn add_overlay(&mut self, position: Position, style: &OverlayStyle) -> OverlayHandle {
        (**self).add_overlay(position, style)
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        (**self).remove_overlay(handle)
    }
}

/// Headless surface that only tracks which overlays are alive.
#[derive(Debug, Default)]
pub struct InMemoryMap {
    overlays: HashSet<OverlayHandle>,
}

impl InMemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_live(&self, handle: OverlayHandle) -> bool {
        self.overlays.contains(&handle)
    }
}

impl MapSurface for InMemoryMap {
    fn add_overlay(&mut self, _position: Position, _style: &OverlayStyle) -> OverlayHandle {
        let handle = OverlayHandle::new();
        self.overlays.insert(handle);
        handle
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        self.overlays.remove(&handle);
    }
}
