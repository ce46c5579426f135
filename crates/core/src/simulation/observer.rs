//! Injected observer for simulation events
//!
//! Gameplay code (sound, damage, admin logs) hooks into fires and
//! decompression through an [`AtmosObserver`] passed to the
//! [`AtmosphereSystem`](crate::simulation::AtmosphereSystem) at construction.
//! The observer is dropped together with the system.

use crate::core_types::{AtmosDirection, EntityId, GridId, Vector2i};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Callbacks fired by the solvers. Every method defaults to doing nothing.
pub trait AtmosObserver: Send {
    /// A tile caught fire
    fn on_hotspot_ignited(&mut self, _grid: GridId, _tile: Vector2i, _source: Option<EntityId>, _spark: bool) {}

    /// A fire went out
    fn on_hotspot_extinguished(&mut self, _grid: GridId, _tile: Vector2i) {}

    /// A hotspot burned for one tick
    fn on_fire_act(&mut self, _grid: GridId, _tile: Vector2i, _temperature: f32, _volume: f32) {}

    /// Gas rushed out of a tile towards space
    fn on_decompression(
        &mut self,
        _grid: GridId,
        _tile: Vector2i,
        _direction: AtmosDirection,
        _pressure_difference: f32,
    ) {
    }
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl AtmosObserver for NullObserver {}

/// One recorded callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AtmosEvent {
    HotspotIgnited {
        grid: GridId,
        tile: Vector2i,
        source: Option<EntityId>,
        spark: bool,
    },
    HotspotExtinguished {
        grid: GridId,
        tile: Vector2i,
    },
    FireAct {
        grid: GridId,
        tile: Vector2i,
        temperature: f32,
        volume: f32,
    },
    Decompression {
        grid: GridId,
        tile: Vector2i,
        direction: AtmosDirection,
        pressure_difference: f32,
    },
}

/// Observer that appends every event to a shared log
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<AtmosEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the log, readable while the system owns the observer
    pub fn events(&self) -> Arc<Mutex<Vec<AtmosEvent>>> {
        Arc::clone(&self.events)
    }

    fn push(&self, event: AtmosEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        events.push(event);
    }
}

impl AtmosObserver for RecordingObserver {
    fn on_hotspot_ignited(&mut self, grid: GridId, tile: Vector2i, source: Option<EntityId>, spark: bool) {
        self.push(AtmosEvent::HotspotIgnited {
            grid,
            tile,
            source,
            spark,
        });
    }

    fn on_hotspot_extinguished(&mut self, grid: GridId, tile: Vector2i) {
        self.push(AtmosEvent::HotspotExtinguished { grid, tile });
    }

    fn on_fire_act(&mut self, grid: GridId, tile: Vector2i, temperature: f32, volume: f32) {
        self.push(AtmosEvent::FireAct {
            grid,
            tile,
            temperature,
            volume,
        });
    }

    fn on_decompression(
        &mut self,
        grid: GridId,
        tile: Vector2i,
        direction: AtmosDirection,
        pressure_difference: f32,
    ) {
        self.push(AtmosEvent::Decompression {
            grid,
            tile,
            direction,
            pressure_difference,
        });
    }
}
