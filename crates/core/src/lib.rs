//! Atmospherics Simulation Core Library
//!
//! A bounded-cost, tile-based gas simulation for space stations: gas mixtures,
//! pressure, temperature and fire across the tiles of one or more grids.
//!
//! ## Overview
//!
//! - [`GasMixture`]: per-species moles plus volume and temperature
//! - [`TileAtmosphere`]: one cell with eight-direction adjacency and a hotspot
//! - [`GridAtmosphere`]: the tiles of a grid, its active schedule and update queues
//! - [`AtmosphereSystem`]: ticks every grid and answers device queries through [`AtmosWorld`]
//!
//! Each tick, every grid drains its structural updates, recomputes invalidated
//! adjacency, runs Monstermos equalization, shares gas between a bounded number
//! of active tiles and processes its fires. Tiles that are not reached stay
//! scheduled for the next tick, so cost per tick is independent of grid size.

// Core types and utilities
pub mod core_types;

pub mod config;
pub mod devices;
pub mod gas;
pub mod grid;
pub mod simulation;
pub mod solver;
pub mod tile;

// Re-export core types
pub use core_types::{AtmosDirection, DeviceId, EntityId, GridId, MapId, PipeNetId, Vector2i};

pub use config::{AtmosConfig, ConfigError, EqualizationConfig, FireConfig};
pub use devices::{
    AlarmThresholds, AtmosAlarmType, AtmosDevice, AtmosMonitor, DeviceContext, HeatExchangeResult,
    HeatExchanger, HeatExchangerDevice, PipeNet,
};
pub use gas::{Gas, GasCatalog, GasMixture, MixtureComparison, ReactionResult};
pub use grid::{AtmosUpdate, GridAtmosphere, GridStatistics, GridTerrain, TerrainTile};
pub use simulation::{
    AtmosEvent, AtmosObserver, AtmosWorld, AtmosphereLayer, AtmosphereSystem, GridTickReport, Handled,
    MapAtmosphere, NullObserver, RecordingObserver, TickReport,
};
pub use tile::{AirtightEntity, Hotspot, TileAtmosphere};
