//! Atmosphere orchestrator
//!
//! `AtmosphereSystem` owns every grid atmosphere (through [`AtmosWorld`]), the
//! attached devices and the injected observer. One call to
//! [`AtmosphereSystem::tick`] advances every grid, in ascending grid id order,
//! through:
//! - structural updates (airtight, terrain, movement queues)
//! - invalidated tile processing (airtight, space state, adjacency)
//! - Monstermos equalization
//! - the budgeted diffusion pass
//! - hotspot processing
//! - pipe net reactions
//!
//! Devices update last, in device id order, through the same query API as any
//! other collaborator. Split and merge run between ticks and complete fully.

pub mod map_atmosphere;
pub mod observer;
pub mod query;

pub use map_atmosphere::MapAtmosphere;
pub use observer::{AtmosEvent, AtmosObserver, NullObserver, RecordingObserver};
pub use query::{AtmosWorld, AtmosphereLayer, Handled};

use crate::config::{AtmosConfig, ConfigError};
use crate::core_types::{DeviceId, GridId, MapId, Vector2i};
use crate::devices::{AtmosDevice, DeviceContext};
use crate::grid::adjacency::{process_invalidated, repopulate_tiles};
use crate::grid::{merge_grids, split_grid, GridAtmosphere, GridStatistics, GridTerrain};
use crate::solver::{equalize_pressure, process_active_tiles, process_hotspots, DiffusionReport, EqualizationReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use tracing::{debug, info, warn};

/// What one grid did during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GridTickReport {
    pub grid: Option<GridId>,
    /// Structural updates applied
    pub updates: usize,
    /// Invalidated coordinates processed
    pub invalidated: usize,
    pub equalization: EqualizationReport,
    pub diffusion: DiffusionReport,
    /// Hotspots still burning after the hotspot pass
    pub hotspots: usize,
    /// Pipe nets in which a reaction fired
    pub reacting_pipe_nets: usize,
}

/// What a whole tick did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    pub grids: Vec<GridTickReport>,
    pub devices_updated: usize,
}

impl TickReport {
    /// Tiles processed by diffusion across all grids
    pub fn processed_tiles(&self) -> usize {
        self.grids.iter().map(|g| g.diffusion.processed).sum()
    }

    /// Tiles still scheduled across all grids
    pub fn active_tiles(&self) -> usize {
        self.grids.iter().map(|g| g.diffusion.remaining).sum()
    }

    pub fn hotspots(&self) -> usize {
        self.grids.iter().map(|g| g.hotspots).sum()
    }
}

struct DeviceSlot {
    grid: GridId,
    device: Box<dyn AtmosDevice>,
}

/// The atmospherics engine
pub struct AtmosphereSystem {
    world: AtmosWorld,
    devices: BTreeMap<DeviceId, DeviceSlot>,
    tick: u64,
    /// Simulated seconds
    elapsed: f64,
}

impl std::fmt::Debug for AtmosphereSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtmosphereSystem")
            .field("world", &self.world)
            .field("devices", &self.devices.len())
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Default for AtmosphereSystem {
    fn default() -> Self {
        Self::new(AtmosConfig::default(), Box::new(NullObserver))
    }
}

impl Deref for AtmosphereSystem {
    type Target = AtmosWorld;

    fn deref(&self) -> &AtmosWorld {
        &self.world
    }
}

impl DerefMut for AtmosphereSystem {
    fn deref_mut(&mut self) -> &mut AtmosWorld {
        &mut self.world
    }
}

impl AtmosphereSystem {
    /// Create a system from an already validated config.
    ///
    /// The observer lives exactly as long as the system.
    pub fn new(config: AtmosConfig, observer: Box<dyn AtmosObserver>) -> Self {
        info!(
            max_active_tiles = config.max_active_tiles_per_tick,
            equalization = config.equalization.enabled,
            diagonal = config.diagonal_adjacency,
            "Atmosphere system created"
        );
        Self {
            world: AtmosWorld::new(config, observer),
            devices: BTreeMap::new(),
            tick: 0,
            elapsed: 0.0,
        }
    }

    /// Validate `config` first
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in `config`.
    pub fn try_new(config: AtmosConfig, observer: Box<dyn AtmosObserver>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config, observer))
    }

    pub fn world(&self) -> &AtmosWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut AtmosWorld {
        &mut self.world
    }

    /// Ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    // ------------------------------------------------------------------
    // Grid lifecycle
    // ------------------------------------------------------------------

    /// Create the atmosphere of a grid. Every terrain tile gets a tile atmosphere
    /// and is invalidated; adjacency is resolved on the next tick.
    ///
    /// Returns false if the grid already has one.
    pub fn add_grid(&mut self, id: GridId, map: MapId, terrain: GridTerrain) -> bool {
        if self.world.grid(id).is_some() {
            warn!(grid = %id, "Grid already has an atmosphere");
            return false;
        }
        let mut grid = GridAtmosphere::new(id, map, terrain);
        let tiles = repopulate_tiles(&mut grid, self.world.config());
        self.world.insert_grid(grid);
        info!(grid = %id, %map, tiles, "Grid atmosphere added");
        true
    }

    /// Destroy a grid atmosphere with its tiles, pipe nets and devices
    pub fn remove_grid(&mut self, id: GridId) -> Option<GridAtmosphere> {
        let grid = self.world.take_grid(id)?;
        let before = self.devices.len();
        self.devices.retain(|_, slot| slot.grid != id);
        info!(grid = %id, removed_devices = before - self.devices.len(), "Grid atmosphere removed");
        Some(grid)
    }

    /// Re-run tile population after the grid's terrain changed wholesale
    pub fn repopulate_grid(&mut self, id: GridId) -> usize {
        match self.world.grid_with_config(id) {
            Some((grid, config)) => repopulate_tiles(grid, config),
            None => 0,
        }
    }

    /// Move `moved` tiles of `old` into `new`, creating `new` on the same map if needed
    pub fn split_grid(&mut self, old: GridId, new: GridId, moved: &[Vector2i]) -> usize {
        if old == new {
            return 0;
        }
        let Some(mut source) = self.world.take_grid(old) else {
            return 0;
        };
        let mut target = self
            .world
            .take_grid(new)
            .unwrap_or_else(|| GridAtmosphere::new(new, source.map(), GridTerrain::new()));
        let map = self.world.map_atmosphere(source.map()).clone();
        let count = split_grid(&mut source, &mut target, moved, &map);
        self.world.insert_grid(source);
        self.world.insert_grid(target);
        count
    }

    /// Absorb grid `from` into `into`; devices follow their grid
    pub fn merge_grids(&mut self, into: GridId, from: GridId) -> usize {
        if into == from || self.world.grid(into).is_none() {
            return 0;
        }
        let Some(source) = self.world.take_grid(from) else {
            return 0;
        };
        let count = match self.world.grid_with_config(into) {
            Some((target, config)) => merge_grids(target, source, config),
            None => 0,
        };
        for slot in self.devices.values_mut().filter(|slot| slot.grid == from) {
            slot.grid = into;
        }
        count
    }

    pub fn statistics(&self, id: GridId) -> Option<GridStatistics> {
        self.world.grid(id).map(GridAtmosphere::statistics)
    }

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    /// Attach a device to a grid. Returns false for an unknown grid or a taken id.
    pub fn add_atmos_device(&mut self, grid: GridId, id: DeviceId, device: Box<dyn AtmosDevice>) -> bool {
        if self.devices.contains_key(&id) {
            return false;
        }
        let Some(target) = self.world.grid_mut(grid) else {
            return false;
        };
        target.add_device(id);
        self.devices.insert(id, DeviceSlot { grid, device });
        true
    }

    pub fn remove_atmos_device(&mut self, id: DeviceId) -> bool {
        let Some(slot) = self.devices.remove(&id) else {
            return false;
        };
        if let Some(grid) = self.world.grid_mut(slot.grid) {
            grid.remove_device(id);
        }
        true
    }

    /// Inspect a device by concrete type
    pub fn device<T: 'static>(&self, id: DeviceId) -> Option<&T> {
        self.devices.get(&id).and_then(|slot| slot.device.as_any().downcast_ref())
    }

    pub fn device_mut<T: 'static>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.devices
            .get_mut(&id)
            .and_then(|slot| slot.device.as_any_mut().downcast_mut())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick of `dt` seconds
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.tick += 1;
        self.elapsed += f64::from(dt);
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        for id in self.world.grid_ids() {
            if let Some(grid_report) = self.tick_grid(id) {
                report.grids.push(grid_report);
            }
        }

        for slot in self.devices.values_mut() {
            if self.world.grid(slot.grid).is_none() {
                continue;
            }
            let mut ctx = DeviceContext {
                grid: slot.grid,
                dt,
                world: &mut self.world,
            };
            slot.device.update(&mut ctx);
            report.devices_updated += 1;
        }

        debug!(
            tick = self.tick,
            grids = report.grids.len(),
            processed = report.processed_tiles(),
            active = report.active_tiles(),
            hotspots = report.hotspots(),
            devices = report.devices_updated,
            "Atmosphere tick"
        );
        report
    }

    fn tick_grid(&mut self, id: GridId) -> Option<GridTickReport> {
        let (grid, map, config, observer) = self.world.grid_context(id)?;
        let mut report = GridTickReport {
            grid: Some(id),
            ..GridTickReport::default()
        };

        report.updates = grid.process_updates(config);
        report.invalidated = process_invalidated(grid, map, config);
        report.equalization = equalize_pressure(grid, config, observer);
        report.diffusion = process_active_tiles(grid, config, observer);
        report.hotspots = process_hotspots(grid, config, observer);

        for (_, net) in grid.pipe_nets_mut() {
            if net.air.react(&config.fire, &config.gases).is_reacting() {
                report.reacting_pipe_nets += 1;
            }
        }
        Some(report)
    }
}
