//! Tile population and adjacency resolution
//!
//! Every invalidated coordinate is brought up to date in two passes. The first
//! recomputes its airtight data, its space state and whether it holds air. The
//! second relinks it to its eight neighbours. A link exists only when neither side
//! blocks the facing direction, and it is always written on both tiles.
//!
//! Neighbours outside the grid terrain are created lazily as space proxies holding
//! the map background; proxies with no grid tile left beside them are deleted.

use crate::config::AtmosConfig;
use crate::core_types::{AtmosDirection, GridId, Vector2i};
use crate::gas::GasMixture;
use crate::grid::terrain::TerrainTile;
use crate::grid::GridAtmosphere;
use crate::simulation::map_atmosphere::MapAtmosphere;
use crate::tile::{Hotspot, TileAtmosphere};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Make the tile map match the terrain, then invalidate every tile.
///
/// Terrain tiles without atmosphere get one at the default temperature (standard
/// air when the terrain asks for it). Grid tiles whose terrain is gone are queued
/// too, and turn into proxies when processed.
pub fn repopulate_tiles(grid: &mut GridAtmosphere, config: &AtmosConfig) -> usize {
    let grid_id = grid.id();
    let mut created = 0;
    for pos in grid.terrain.sorted_positions() {
        let Some(terrain) = grid.terrain.get(&pos).copied() else {
            continue;
        };
        let needs_tile = grid.tiles.get(&pos).map_or(true, |tile| tile.map_atmosphere);
        if needs_tile {
            grid.tiles.insert(pos, new_terrain_tile(grid_id, pos, terrain, config));
            created += 1;
        }
        grid.invalidate(pos);
    }

    for pos in grid.sorted_positions() {
        let stale = grid
            .tiles
            .get(&pos)
            .is_some_and(|tile| !tile.map_atmosphere && !grid.terrain.contains(&pos));
        if stale {
            grid.invalidate(pos);
        }
    }

    debug!(grid = %grid_id, created, tiles = grid.tiles.len(), "Repopulated grid tiles");
    created
}

/// Bring every invalidated coordinate up to date. Returns how many were processed.
pub fn process_invalidated(grid: &mut GridAtmosphere, map: &MapAtmosphere, config: &AtmosConfig) -> usize {
    let coords = grid.take_invalidated();
    if coords.is_empty() {
        return 0;
    }

    for &pos in &coords {
        refresh_tile(grid, pos, map, config);
    }

    let mut touched: FxHashSet<Vector2i> = FxHashSet::default();
    let mut touched_order = Vec::new();
    for &pos in &coords {
        update_adjacent(grid, pos, map, config);
        let corners = relink_corner_diagonals(grid, pos, config);
        let around = AtmosDirection::ORDERED.iter().map(|d| pos + d.offset());
        for candidate in std::iter::once(pos).chain(around).chain(corners) {
            if touched.insert(candidate) {
                touched_order.push(candidate);
            }
        }
    }

    remove_orphaned_proxies(grid, &touched_order);
    repair_adjacency(grid, &touched_order);

    for &pos in &coords {
        grid.activate(pos);
        let neighbours: Vec<Vector2i> = grid
            .tiles
            .get(&pos)
            .map(|tile| tile.connected().map(|(_, n)| n).collect())
            .unwrap_or_default();
        for neighbour in neighbours {
            grid.activate(neighbour);
        }
    }
    coords.len()
}

/// Neighbours of `position` in compass order.
///
/// Only linked neighbours are listed unless `include_blocked` is set, in which
/// case every neighbouring coordinate is returned.
pub fn adjacent_positions(
    grid: &GridAtmosphere,
    position: &Vector2i,
    include_blocked: bool,
    config: &AtmosConfig,
) -> Vec<Vector2i> {
    let Some(tile) = grid.tiles.get(position) else {
        return Vec::new();
    };
    directions(config)
        .iter()
        .filter_map(|&dir| {
            if include_blocked {
                Some(*position + dir.offset())
            } else {
                tile.adjacent(dir)
            }
        })
        .collect()
}

fn directions(config: &AtmosConfig) -> &'static [AtmosDirection] {
    if config.diagonal_adjacency {
        &AtmosDirection::ORDERED
    } else {
        &AtmosDirection::CARDINALS
    }
}

fn new_terrain_tile(
    grid_id: GridId,
    pos: Vector2i,
    terrain: TerrainTile,
    config: &AtmosConfig,
) -> TileAtmosphere {
    let air = if terrain.space {
        GasMixture::space()
    } else if terrain.fill_air {
        let mut air = GasMixture::standard_air(config.cell_volume);
        air.set_temperature(config.default_temperature);
        air
    } else {
        GasMixture::new(config.cell_volume, config.default_temperature)
    };
    let mut tile = TileAtmosphere::new(grid_id, pos, Some(air), config.default_temperature);
    tile.space = terrain.space;
    tile
}

/// Recompute airtight data, space state and air presence of one coordinate
fn refresh_tile(grid: &mut GridAtmosphere, pos: Vector2i, map: &MapAtmosphere, config: &AtmosConfig) {
    let grid_id = grid.id();
    let airtight = grid.airtight_at(&pos);

    let Some(terrain) = grid.terrain.get(&pos).copied() else {
        // Terrain is gone: the tile becomes a window onto the map background
        let is_grid_tile = grid.tiles.get(&pos).is_some_and(|tile| !tile.map_atmosphere);
        if is_grid_tile {
            grid.tiles
                .insert(pos, TileAtmosphere::space_proxy(grid_id, pos, map.mixture(), map.space));
            grid.hotspots.remove(&pos);
            grid.deactivate(&pos);
        }
        return;
    };

    let tile = grid
        .tiles
        .entry(pos)
        .or_insert_with(|| new_terrain_tile(grid_id, pos, terrain, config));
    if tile.map_atmosphere {
        *tile = new_terrain_tile(grid_id, pos, terrain, config);
    }
    tile.airtight = airtight;

    if tile.space != terrain.space {
        tile.space = terrain.space;
        tile.air = Some(if terrain.space {
            GasMixture::space()
        } else {
            GasMixture::new(config.cell_volume, tile.temperature)
        });
    }

    if !tile.space {
        if airtight.is_solid() {
            if tile.air.is_some() {
                tile.sync_temperature();
                tile.air = None;
            }
        } else if tile.air.is_none() {
            tile.air = Some(GasMixture::new(config.cell_volume, tile.temperature));
        }
    }

    let can_burn = tile.is_simulated();
    if !can_burn && tile.hotspot.valid {
        tile.hotspot = Hotspot::default();
        grid.hotspots.remove(&pos);
    }
    if !can_burn {
        grid.deactivate(&pos);
    }
}

/// Relink one tile with each of its neighbours
fn update_adjacent(grid: &mut GridAtmosphere, pos: Vector2i, map: &MapAtmosphere, config: &AtmosConfig) {
    let Some(is_proxy) = grid.tiles.get(&pos).map(|tile| tile.map_atmosphere) else {
        return;
    };

    if !is_proxy {
        for dir in AtmosDirection::ORDERED {
            ensure_tile(grid, pos + dir.offset(), map, config);
        }
    }

    for dir in AtmosDirection::ORDERED {
        let neighbour = pos + dir.offset();
        let enabled = !dir.is_diagonal() || config.diagonal_adjacency;
        let connected = enabled && can_connect(grid, pos, neighbour, dir);
        link(grid, pos, neighbour, dir, connected);
    }
}

/// Relink every diagonal whose corner path runs through `pos`.
///
/// Those links sit between two cardinal neighbours of `pos`, so they go stale
/// when `pos` gains or loses a wall even though neither end was invalidated.
/// Returns the relinked endpoints.
fn relink_corner_diagonals(grid: &mut GridAtmosphere, pos: Vector2i, config: &AtmosConfig) -> Vec<Vector2i> {
    let mut relinked = Vec::new();
    for via in AtmosDirection::CARDINALS {
        let a = pos + via.offset();
        if !grid.tiles.contains_key(&a) {
            continue;
        }
        for dir in AtmosDirection::DIAGONALS {
            let (first, second) = dir.cardinal_components();
            if a + first.offset() != pos && a + second.offset() != pos {
                continue;
            }
            let b = a + dir.offset();
            if !grid.tiles.contains_key(&b) {
                continue;
            }
            let connected = config.diagonal_adjacency && can_connect(grid, a, b, dir);
            link(grid, a, b, dir, connected);
            relinked.push(a);
            relinked.push(b);
        }
    }
    relinked
}

/// Create the tile at `pos` if it is missing: a terrain tile, or else a space proxy
fn ensure_tile(grid: &mut GridAtmosphere, pos: Vector2i, map: &MapAtmosphere, config: &AtmosConfig) {
    if grid.tiles.contains_key(&pos) {
        return;
    }
    let grid_id = grid.id();
    if let Some(terrain) = grid.terrain.get(&pos).copied() {
        grid.tiles.insert(pos, new_terrain_tile(grid_id, pos, terrain, config));
        grid.invalidate(pos);
    } else {
        grid.tiles
            .insert(pos, TileAtmosphere::space_proxy(grid_id, pos, map.mixture(), map.space));
    }
}

/// Gas may leave `from` towards `dir` and enter `to` from the opposite side
fn passable(from: &TileAtmosphere, to: &TileAtmosphere, dir: AtmosDirection) -> bool {
    from.has_air()
        && to.has_air()
        && !from.airtight.is_blocked(dir)
        && !to.airtight.is_blocked(dir.opposite())
}

fn can_connect(grid: &GridAtmosphere, a: Vector2i, b: Vector2i, dir: AtmosDirection) -> bool {
    let (Some(tile_a), Some(tile_b)) = (grid.tiles.get(&a), grid.tiles.get(&b)) else {
        return false;
    };
    if tile_a.map_atmosphere && tile_b.map_atmosphere {
        return false;
    }
    if !passable(tile_a, tile_b, dir) {
        return false;
    }
    if !dir.is_diagonal() {
        return true;
    }

    // A diagonal also needs one open path around the corner
    let (first, second) = dir.cardinal_components();
    let corner_open = |via: AtmosDirection, then: AtmosDirection| {
        grid.tiles
            .get(&(a + via.offset()))
            .is_some_and(|corner| passable(tile_a, corner, via) && passable(corner, tile_b, then))
    };
    corner_open(first, second) || corner_open(second, first)
}

fn link(grid: &mut GridAtmosphere, a: Vector2i, b: Vector2i, dir: AtmosDirection, connected: bool) {
    if let Some(tile) = grid.tiles.get_mut(&a) {
        tile.set_adjacent(dir, connected.then_some(b));
    }
    if let Some(tile) = grid.tiles.get_mut(&b) {
        tile.set_adjacent(dir.opposite(), connected.then_some(a));
    }
}

fn remove_orphaned_proxies(grid: &mut GridAtmosphere, candidates: &[Vector2i]) {
    let mut removed = 0;
    for &pos in candidates {
        let is_proxy = grid.tiles.get(&pos).is_some_and(|tile| tile.map_atmosphere);
        if !is_proxy {
            continue;
        }
        let has_grid_neighbour = AtmosDirection::ORDERED.iter().any(|dir| {
            grid.tiles
                .get(&(pos + dir.offset()))
                .is_some_and(|tile| !tile.map_atmosphere)
        });
        if !has_grid_neighbour {
            grid.tiles.remove(&pos);
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(grid = %grid.id(), removed, "Removed orphaned space proxies");
    }
}

/// Check that every stored link is mirrored; unlink both sides of any that is not
fn repair_adjacency(grid: &mut GridAtmosphere, positions: &[Vector2i]) {
    let mut broken = Vec::new();
    for &pos in positions {
        let Some(tile) = grid.tiles.get(&pos) else {
            continue;
        };
        for (dir, neighbour) in tile.connected() {
            let mirrored = grid
                .tiles
                .get(&neighbour)
                .is_some_and(|other| other.adjacent(dir.opposite()) == Some(pos));
            if !mirrored {
                broken.push((pos, neighbour, dir));
            }
        }
    }

    debug_assert!(broken.is_empty(), "asymmetric adjacency: {broken:?}");
    for (pos, neighbour, dir) in broken {
        warn!(grid = %grid.id(), ?pos, ?neighbour, ?dir, "Asymmetric adjacency repaired");
        link(grid, pos, neighbour, dir, false);
    }
}
