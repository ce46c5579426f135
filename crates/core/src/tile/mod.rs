//! Per-tile atmosphere state
//!
//! A [`TileAtmosphere`] is one grid cell. Neighbours are stored as `Vector2i`
//! keys into the owning grid's tile map, never as references, so a tile can be
//! moved between grids without dangling links.

pub mod airtight;
pub mod hotspot;

pub use airtight::{AirtightData, AirtightEntity};
pub use hotspot::Hotspot;

use crate::config::FireConfig;
use crate::core_types::{AtmosDirection, GridId, Vector2i};
use crate::gas::constants::SPACE_HEAT_CAPACITY;
use crate::gas::{Gas, GasMixture};
use serde::{Deserialize, Serialize};

/// Atmosphere state of one grid cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileAtmosphere {
    /// Position in the owning grid
    pub grid_index: Vector2i,
    pub grid_id: GridId,
    /// `None` for solid walls
    pub air: Option<GasMixture>,
    /// Connected neighbour per [`AtmosDirection::index`] slot
    pub adjacent_tiles: [Option<Vector2i>; AtmosDirection::COUNT],
    /// Mirror of `adjacent_tiles` as a direction set
    pub adjacent_bits: AtmosDirection,
    pub airtight: AirtightData,
    /// Infinite vacuum sink
    pub space: bool,
    /// Proxy outside the grid terrain that mirrors the map background
    pub map_atmosphere: bool,
    pub hotspot: Hotspot,
    /// Largest pressure difference seen by the last gas movement (kPa)
    pub pressure_difference: f32,
    /// Direction gas last rushed out towards
    pub pressure_direction: AtmosDirection,
    /// Diffusion cycle in which this tile last shared
    pub current_cycle: u64,
    /// Heat capacity of the tile itself (J/K)
    pub heat_capacity: f32,
    /// Temperature of the tile itself, kept while it has no air (K)
    pub temperature: f32,
}

impl TileAtmosphere {
    pub fn new(grid_id: GridId, grid_index: Vector2i, air: Option<GasMixture>, temperature: f32) -> Self {
        Self {
            grid_index,
            grid_id,
            air,
            adjacent_tiles: [None; AtmosDirection::COUNT],
            adjacent_bits: AtmosDirection::INVALID,
            airtight: AirtightData::default(),
            space: false,
            map_atmosphere: false,
            hotspot: Hotspot::default(),
            pressure_difference: 0.0,
            pressure_direction: AtmosDirection::INVALID,
            current_cycle: 0,
            heat_capacity: 0.0,
            temperature,
        }
    }

    /// Proxy tile just outside a grid holding a copy of the map background
    pub fn space_proxy(grid_id: GridId, grid_index: Vector2i, background: &GasMixture, space: bool) -> Self {
        let mut tile = Self::new(grid_id, grid_index, Some(background.clone()), background.temperature());
        tile.map_atmosphere = true;
        tile.space = space;
        tile.heat_capacity = SPACE_HEAT_CAPACITY;
        tile
    }

    /// Number of connected neighbours
    #[inline]
    pub fn adjacent_count(&self) -> u32 {
        self.adjacent_bits.count()
    }

    #[inline]
    pub fn is_connected(&self, direction: AtmosDirection) -> bool {
        direction.index().is_some() && self.adjacent_bits.contains(direction)
    }

    /// Neighbour connected in `direction`, if any
    pub fn adjacent(&self, direction: AtmosDirection) -> Option<Vector2i> {
        direction.index().and_then(|slot| self.adjacent_tiles[slot])
    }

    /// Connected neighbours in compass order
    pub fn connected(&self) -> impl Iterator<Item = (AtmosDirection, Vector2i)> + '_ {
        self.adjacent_bits
            .iter_ordered()
            .filter_map(move |dir| self.adjacent(dir).map(|pos| (dir, pos)))
    }

    /// Write or clear the link in `direction`, keeping bits and slots in sync
    pub fn set_adjacent(&mut self, direction: AtmosDirection, neighbour: Option<Vector2i>) {
        let Some(slot) = direction.index() else {
            return;
        };
        self.adjacent_tiles[slot] = neighbour;
        self.adjacent_bits.set(direction, neighbour.is_some());
    }

    pub fn clear_adjacency(&mut self) {
        self.adjacent_tiles = [None; AtmosDirection::COUNT];
        self.adjacent_bits = AtmosDirection::INVALID;
    }

    /// Tile takes part in gas exchange (has air and is not a sealed wall)
    #[inline]
    pub fn has_air(&self) -> bool {
        self.air.is_some()
    }

    /// Ordinary grid tile with air: not space, not a proxy, not a wall
    #[inline]
    pub fn is_simulated(&self) -> bool {
        !self.space && !self.map_atmosphere && self.air.is_some()
    }

    /// Air pressure, zero for walls (kPa)
    pub fn pressure(&self) -> f32 {
        self.air.as_ref().map_or(0.0, GasMixture::pressure)
    }

    /// Air contains enough oxidizer and fuel to burn
    pub fn is_volatile(&self, fire: &FireConfig) -> bool {
        self.air.as_ref().is_some_and(|air| {
            air.get_moles(Gas::Oxygen) >= fire.min_oxygen_moles
                && (air.get_moles(Gas::Plasma) >= fire.min_fuel_moles
                    || air.get_moles(Gas::Tritium) >= fire.min_fuel_moles)
        })
    }

    /// Remember the air temperature so a reopened wall comes back at it
    pub fn sync_temperature(&mut self) {
        if let Some(air) = &self.air {
            self.temperature = air.temperature();
        }
    }
}
