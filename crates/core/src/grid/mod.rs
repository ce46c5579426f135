//! Grid atmosphere: the tiles of one grid plus their schedule
//!
//! A [`GridAtmosphere`] exclusively owns the [`TileAtmosphere`]s of one grid,
//! keyed by coordinate. Besides the tiles it keeps:
//! - the terrain layout and the registry of airtight entities,
//! - the structural update queues and the invalidated-coordinate queue,
//! - the active-tile schedule and the set of burning tiles,
//! - the pipe nets and device ids attached to the grid.

pub mod adjacency;
pub mod split;
pub mod terrain;
pub mod update_queue;

pub use split::{merge_grids, split_grid};
pub use terrain::{GridTerrain, TerrainTile};
pub use update_queue::{AtmosUpdate, UpdateClass, UpdateQueues};

use crate::config::AtmosConfig;
use crate::core_types::{tile_order_key, DeviceId, EntityId, GridId, MapId, PipeNetId, Vector2i};
use crate::devices::PipeNet;
use crate::tile::{AirtightData, AirtightEntity, TileAtmosphere};
use indexmap::IndexSet;
use rayon::prelude::*;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::trace;

/// Snapshot of a grid's gas state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GridStatistics {
    /// Simulated tiles (excludes walls, space and proxies)
    pub tiles: usize,
    pub active_tiles: usize,
    pub hotspots: usize,
    /// Gas in simulated tiles (mol)
    pub total_moles: f32,
    /// kPa
    pub mean_pressure: f32,
    /// kPa
    pub max_pressure: f32,
    /// K
    pub mean_temperature: f32,
    /// K
    pub max_temperature: f32,
}

/// Atmosphere of a single grid
#[derive(Debug)]
pub struct GridAtmosphere {
    id: GridId,
    map: MapId,
    tiles: FxHashMap<Vector2i, TileAtmosphere>,
    terrain: GridTerrain,
    airtight: FxHashMap<EntityId, AirtightEntity>,
    airtight_by_tile: FxHashMap<Vector2i, Vec<EntityId>>,
    /// Coordinates awaiting recompute, in submission order
    invalidated: IndexSet<Vector2i, FxBuildHasher>,
    /// Diffusion schedule, front first
    active: IndexSet<Vector2i, FxBuildHasher>,
    hotspots: FxHashSet<Vector2i>,
    pipe_nets: FxHashMap<PipeNetId, PipeNet>,
    devices: FxHashSet<DeviceId>,
    updates: UpdateQueues,
    /// Diffusion cycle counter, bumped once per share pass
    cycle: u64,
}

impl GridAtmosphere {
    /// Create a grid atmosphere. Tiles are created by [`adjacency::repopulate_tiles`].
    pub fn new(id: GridId, map: MapId, terrain: GridTerrain) -> Self {
        Self {
            id,
            map,
            tiles: FxHashMap::default(),
            terrain,
            airtight: FxHashMap::default(),
            airtight_by_tile: FxHashMap::default(),
            invalidated: IndexSet::default(),
            active: IndexSet::default(),
            hotspots: FxHashSet::default(),
            pipe_nets: FxHashMap::default(),
            devices: FxHashSet::default(),
            updates: UpdateQueues::new(),
            cycle: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> GridId {
        self.id
    }

    /// Map the grid currently sits on
    #[inline]
    pub fn map(&self) -> MapId {
        self.map
    }

    pub fn set_map(&mut self, map: MapId) {
        self.map = map;
    }

    // ------------------------------------------------------------------
    // Tiles
    // ------------------------------------------------------------------

    #[inline]
    pub fn tile(&self, position: &Vector2i) -> Option<&TileAtmosphere> {
        self.tiles.get(position)
    }

    #[inline]
    pub fn tile_mut(&mut self, position: &Vector2i) -> Option<&mut TileAtmosphere> {
        self.tiles.get_mut(position)
    }

    /// Every tile including space proxies, in arbitrary order
    pub fn tiles(&self) -> impl Iterator<Item = (&Vector2i, &TileAtmosphere)> {
        self.tiles.iter()
    }

    /// Number of tiles including space proxies
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Tile positions in row-major order
    pub fn sorted_positions(&self) -> Vec<Vector2i> {
        let mut positions: Vec<Vector2i> = self.tiles.keys().copied().collect();
        positions.sort_by_key(tile_order_key);
        positions
    }

    #[inline]
    pub fn terrain(&self) -> &GridTerrain {
        &self.terrain
    }

    /// Place, replace or remove (`None`) a terrain tile right away
    pub fn set_terrain(&mut self, position: Vector2i, terrain: Option<TerrainTile>) {
        match terrain {
            Some(tile) => {
                self.terrain.insert(position, tile);
            }
            None => {
                self.terrain.remove(&position);
            }
        }
        self.invalidate(position);
    }

    /// Gas in simulated tiles (mol)
    pub fn total_moles(&self) -> f32 {
        let mut positions = self.sorted_positions();
        positions.retain(|pos| self.tiles.get(pos).is_some_and(TileAtmosphere::is_simulated));
        positions
            .iter()
            .filter_map(|pos| self.tiles.get(pos).and_then(|tile| tile.air.as_ref()))
            .map(|air| f64::from(air.total_moles()))
            .sum::<f64>() as f32
    }

    /// Aggregate pressure and temperature figures over all simulated tiles
    pub fn statistics(&self) -> GridStatistics {
        let (tiles, moles, pressure_sum, max_pressure, temperature_sum, max_temperature) = self
            .tiles
            .par_iter()
            .filter(|(_, tile)| tile.is_simulated())
            .filter_map(|(_, tile)| tile.air.as_ref())
            .map(|air| {
                let pressure = air.pressure();
                let temperature = air.temperature();
                (1_usize, air.total_moles(), pressure, pressure, temperature, temperature)
            })
            .reduce(
                || (0, 0.0, 0.0, 0.0, 0.0, 0.0),
                |a, b| {
                    (
                        a.0 + b.0,
                        a.1 + b.1,
                        a.2 + b.2,
                        a.3.max(b.3),
                        a.4 + b.4,
                        a.5.max(b.5),
                    )
                },
            );

        let count = tiles.max(1) as f32;
        GridStatistics {
            tiles,
            active_tiles: self.active.len(),
            hotspots: self.hotspots.len(),
            total_moles: moles,
            mean_pressure: pressure_sum / count,
            max_pressure,
            mean_temperature: temperature_sum / count,
            max_temperature,
        }
    }

    // ------------------------------------------------------------------
    // Invalidation and the active schedule
    // ------------------------------------------------------------------

    /// Queue a tile for airtight and adjacency recompute
    pub fn invalidate(&mut self, position: Vector2i) {
        self.invalidated.insert(position);
    }

    #[inline]
    pub fn is_invalidated(&self, position: &Vector2i) -> bool {
        self.invalidated.contains(position)
    }

    pub fn invalidated_count(&self) -> usize {
        self.invalidated.len()
    }

    /// Take every invalidated coordinate in submission order
    pub(crate) fn take_invalidated(&mut self) -> Vec<Vector2i> {
        self.invalidated.drain(..).collect()
    }

    /// Schedule a tile for diffusion. Space, proxies and walls are never active.
    pub fn activate(&mut self, position: Vector2i) -> bool {
        let eligible = self
            .tiles
            .get(&position)
            .is_some_and(TileAtmosphere::is_simulated);
        eligible && self.active.insert(position)
    }

    pub fn deactivate(&mut self, position: &Vector2i) {
        self.active.swap_remove(position);
    }

    #[inline]
    pub fn is_active(&self, position: &Vector2i) -> bool {
        self.active.contains(position)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active tiles in schedule order
    pub fn active_tiles(&self) -> impl Iterator<Item = &Vector2i> {
        self.active.iter()
    }

    /// Pop up to `budget` tiles off the front of the schedule
    pub(crate) fn take_active(&mut self, budget: usize) -> Vec<Vector2i> {
        let take = self.active.len().min(budget);
        self.active.drain(..take).collect()
    }

    pub(crate) fn next_cycle(&mut self) -> u64 {
        self.cycle += 1;
        self.cycle
    }

    // ------------------------------------------------------------------
    // Hotspots
    // ------------------------------------------------------------------

    pub(crate) fn track_hotspot(&mut self, position: Vector2i) {
        self.hotspots.insert(position);
    }

    pub(crate) fn untrack_hotspot(&mut self, position: &Vector2i) {
        self.hotspots.remove(position);
    }

    pub fn hotspot_count(&self) -> usize {
        self.hotspots.len()
    }

    /// Burning tiles in row-major order
    pub fn hotspot_tiles(&self) -> Vec<Vector2i> {
        let mut positions: Vec<Vector2i> = self.hotspots.iter().copied().collect();
        positions.sort_by_key(tile_order_key);
        positions
    }

    // ------------------------------------------------------------------
    // Airtight registry
    // ------------------------------------------------------------------

    /// Register an airtight entity right away and invalidate its tile
    pub fn add_airtight(&mut self, entity: AirtightEntity) {
        if let Some(previous) = self.airtight.get(&entity.id).map(|e| e.tile) {
            self.unindex_airtight(entity.id, &previous);
            self.invalidate(previous);
        }
        self.airtight_by_tile.entry(entity.tile).or_default().push(entity.id);
        self.invalidate(entity.tile);
        self.airtight.insert(entity.id, entity);
    }

    pub fn remove_airtight(&mut self, id: EntityId) -> Option<AirtightEntity> {
        let entity = self.airtight.remove(&id)?;
        self.unindex_airtight(id, &entity.tile);
        self.invalidate(entity.tile);
        Some(entity)
    }

    /// Open (`false`) or close (`true`) an airtight entity. Returns false for unknown ids.
    pub fn set_airtight_enabled(&mut self, id: EntityId, enabled: bool) -> bool {
        let Some(entity) = self.airtight.get_mut(&id) else {
            return false;
        };
        if entity.enabled != enabled {
            entity.enabled = enabled;
            let tile = entity.tile;
            self.invalidate(tile);
        }
        true
    }

    pub fn move_airtight(&mut self, id: EntityId, to: Vector2i) -> bool {
        let Some(from) = self.airtight.get(&id).map(|e| e.tile) else {
            return false;
        };
        if from == to {
            return true;
        }
        self.unindex_airtight(id, &from);
        self.airtight_by_tile.entry(to).or_default().push(id);
        if let Some(entity) = self.airtight.get_mut(&id) {
            entity.tile = to;
        }
        self.invalidate(from);
        self.invalidate(to);
        true
    }

    pub fn airtight_entity(&self, id: EntityId) -> Option<&AirtightEntity> {
        self.airtight.get(&id)
    }

    /// Union of the enabled airtight entities on a tile
    pub fn airtight_at(&self, position: &Vector2i) -> AirtightData {
        self.airtight_by_tile
            .get(position)
            .map_or_else(AirtightData::default, |ids| {
                AirtightData::from_entities(ids.iter().filter_map(|id| self.airtight.get(id)))
            })
    }

    fn unindex_airtight(&mut self, id: EntityId, tile: &Vector2i) {
        if let Some(ids) = self.airtight_by_tile.get_mut(tile) {
            ids.retain(|e| *e != id);
            if ids.is_empty() {
                self.airtight_by_tile.remove(tile);
            }
        }
    }

    // ------------------------------------------------------------------
    // Structural updates
    // ------------------------------------------------------------------

    /// Queue a structural update for the next tick
    pub fn submit_update(&mut self, update: AtmosUpdate) {
        self.updates.submit(update);
    }

    pub fn updates(&self) -> &UpdateQueues {
        &self.updates
    }

    /// Drain this tick's updates and apply them. Returns how many were applied.
    pub fn process_updates(&mut self, config: &AtmosConfig) -> usize {
        let batch = self
            .updates
            .drain(config.movement_updates_per_tick, config.movement_backlog_cap);
        let count = batch.len();
        for update in batch {
            self.apply_update(update);
        }
        count
    }

    fn apply_update(&mut self, update: AtmosUpdate) {
        match update {
            AtmosUpdate::AirtightAdded(entity) => self.add_airtight(entity),
            AtmosUpdate::AirtightRemoved(id) => {
                if self.remove_airtight(id).is_none() {
                    trace!(grid = %self.id, entity = %id, "Removal of unknown airtight entity ignored");
                }
            }
            AtmosUpdate::AirtightToggled { entity, enabled } => {
                if !self.set_airtight_enabled(entity, enabled) {
                    trace!(grid = %self.id, %entity, "Toggle of unknown airtight entity ignored");
                }
            }
            AtmosUpdate::TerrainChanged { tile, terrain } => self.set_terrain(tile, terrain),
            AtmosUpdate::AirtightMoved { entity, to } => {
                if !self.move_airtight(entity, to) {
                    trace!(grid = %self.id, %entity, "Move of unknown airtight entity ignored");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Pipe nets and devices
    // ------------------------------------------------------------------

    /// Attach a pipe net. Returns false if the id is already attached.
    pub fn add_pipe_net(&mut self, id: PipeNetId, net: PipeNet) -> bool {
        if self.pipe_nets.contains_key(&id) {
            return false;
        }
        self.pipe_nets.insert(id, net);
        true
    }

    pub fn remove_pipe_net(&mut self, id: PipeNetId) -> Option<PipeNet> {
        self.pipe_nets.remove(&id)
    }

    pub fn pipe_net(&self, id: PipeNetId) -> Option<&PipeNet> {
        self.pipe_nets.get(&id)
    }

    pub fn pipe_net_mut(&mut self, id: PipeNetId) -> Option<&mut PipeNet> {
        self.pipe_nets.get_mut(&id)
    }

    pub fn pipe_net_ids(&self) -> Vec<PipeNetId> {
        let mut ids: Vec<PipeNetId> = self.pipe_nets.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn pipe_nets_mut(&mut self) -> impl Iterator<Item = (&PipeNetId, &mut PipeNet)> {
        self.pipe_nets.iter_mut()
    }

    pub fn add_device(&mut self, id: DeviceId) -> bool {
        self.devices.insert(id)
    }

    pub fn remove_device(&mut self, id: DeviceId) -> bool {
        self.devices.remove(&id)
    }

    pub fn has_device(&self, id: DeviceId) -> bool {
        self.devices.contains(&id)
    }

    /// Attached device ids in ascending order
    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::AtmosDirection;
    use crate::gas::GasMixture;

    fn grid() -> GridAtmosphere {
        GridAtmosphere::new(
            GridId(1),
            MapId(1),
            GridTerrain::rect(Vector2i::new(0, 0), Vector2i::new(2, 2), false),
        )
    }

    #[test]
    fn test_invalidate_deduplicates_and_keeps_order() {
        let mut grid = grid();
        grid.invalidate(Vector2i::new(1, 0));
        grid.invalidate(Vector2i::new(0, 0));
        grid.invalidate(Vector2i::new(1, 0));
        assert_eq!(grid.invalidated_count(), 2);
        assert_eq!(
            grid.take_invalidated(),
            vec![Vector2i::new(1, 0), Vector2i::new(0, 0)]
        );
        assert!(!grid.is_invalidated(&Vector2i::new(1, 0)));
    }

    #[test]
    fn test_activate_requires_simulated_tile() {
        let mut grid = grid();
        let pos = Vector2i::new(0, 0);
        assert!(!grid.activate(pos));

        grid.tiles.insert(
            pos,
            TileAtmosphere::new(grid.id(), pos, Some(GasMixture::default()), 293.15),
        );
        assert!(grid.activate(pos));
        assert!(!grid.activate(pos));
        assert_eq!(grid.take_active(10), vec![pos]);
        assert_eq!(grid.active_count(), 0);
    }

    #[test]
    fn test_deactivate_drops_from_schedule() {
        let mut grid = grid();
        let positions: Vec<Vector2i> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Vector2i::new(x, y)))
            .collect();
        for &pos in &positions {
            grid.tiles.insert(
                pos,
                TileAtmosphere::new(grid.id(), pos, Some(GasMixture::default()), 293.15),
            );
            grid.activate(pos);
        }

        for pos in positions.iter().skip(1).step_by(2) {
            grid.deactivate(pos);
        }
        assert_eq!(grid.active_count(), 5);
        assert!(!grid.is_active(&positions[1]));

        let kept: FxHashSet<Vector2i> = positions.iter().copied().step_by(2).collect();
        let first = grid.take_active(2);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|pos| kept.contains(pos)));
        let rest: Vec<Vector2i> = grid.active_tiles().copied().collect();
        assert_eq!(rest.len(), 3);
        assert!(rest.iter().all(|pos| kept.contains(pos) && !first.contains(pos)));

        // reactivating a drained tile puts it back at the end
        assert!(grid.activate(first[0]));
        assert_eq!(grid.active_tiles().last(), Some(&first[0]));
    }

    #[test]
    fn test_airtight_registry_tracks_tiles() {
        let mut grid = grid();
        let tile = Vector2i::new(1, 1);
        grid.add_airtight(AirtightEntity::door(EntityId(7), tile, true));
        assert!(grid.airtight_at(&tile).is_fully_blocked());

        assert!(grid.set_airtight_enabled(EntityId(7), false));
        assert!(grid.airtight_at(&tile).blocked.is_empty());

        assert!(grid.move_airtight(EntityId(7), Vector2i::new(2, 2)));
        grid.set_airtight_enabled(EntityId(7), true);
        assert_eq!(grid.airtight_at(&Vector2i::new(2, 2)).blocked, AtmosDirection::ALL);
        assert!(grid.airtight_at(&tile).blocked.is_empty());

        assert!(grid.remove_airtight(EntityId(7)).is_some());
        assert!(!grid.set_airtight_enabled(EntityId(7), true));
    }

    #[test]
    fn test_pipe_net_ids_are_unique() {
        let mut grid = grid();
        assert!(grid.add_pipe_net(PipeNetId(2), PipeNet::default()));
        assert!(!grid.add_pipe_net(PipeNetId(2), PipeNet::default()));
        assert!(grid.add_pipe_net(PipeNetId(1), PipeNet::default()));
        assert_eq!(grid.pipe_net_ids(), vec![PipeNetId(1), PipeNetId(2)]);
        assert!(grid.remove_pipe_net(PipeNetId(2)).is_some());
    }
}
