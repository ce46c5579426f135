//! Grid split and merge
//!
//! Both operations run between ticks and complete fully before the next
//! diffusion pass, so no solver ever sees a half-moved tile.

use crate::config::AtmosConfig;
use crate::core_types::{tile_order_key, AtmosDirection, Vector2i};
use crate::grid::GridAtmosphere;
use crate::simulation::map_atmosphere::MapAtmosphere;
use crate::tile::TileAtmosphere;
use tracing::{info, warn};

/// Move `moved` tiles from `old` into `new`.
///
/// Each moved tile's air is deep-cloned together with its hotspot, heat
/// capacity, temperature and pressure-movement state *before* the old tile is
/// spaced, so no gas is lost or duplicated. Terrain and airtight entities move
/// along. Both sides are invalidated for the next adjacency pass.
pub fn split_grid(
    old: &mut GridAtmosphere,
    new: &mut GridAtmosphere,
    moved: &[Vector2i],
    map: &MapAtmosphere,
) -> usize {
    let mut moved_tiles = 0;
    for &pos in moved {
        let Some(terrain) = old.terrain.remove(&pos) else {
            continue;
        };
        new.terrain.insert(pos, terrain);

        let entity_ids = old.airtight_by_tile.get(&pos).cloned().unwrap_or_default();
        for id in entity_ids {
            if let Some(entity) = old.remove_airtight(id) {
                new.add_airtight(entity);
            }
        }

        let copied = old
            .tiles
            .get(&pos)
            .filter(|tile| !tile.map_atmosphere)
            .map(|source| {
                let mut tile = TileAtmosphere::new(new.id, pos, source.air.clone(), source.temperature);
                tile.space = source.space;
                tile.airtight = source.airtight;
                tile.hotspot = source.hotspot.clone();
                tile.heat_capacity = source.heat_capacity;
                tile.pressure_difference = source.pressure_difference;
                tile.pressure_direction = source.pressure_direction;
                tile
            });

        if let Some(tile) = copied {
            let burning = tile.hotspot.valid;
            new.tiles.insert(pos, tile);
            if burning {
                new.hotspots.insert(pos);
            }
            old.tiles
                .insert(pos, TileAtmosphere::space_proxy(old.id, pos, map.mixture(), map.space));
            old.hotspots.remove(&pos);
            old.deactivate(&pos);
            moved_tiles += 1;
        }

        old.invalidate(pos);
        new.invalidate(pos);
    }

    info!(
        from = %old.id,
        to = %new.id,
        moved_tiles,
        "Split grid atmosphere"
    );
    moved_tiles
}

/// Absorb every tile, terrain entry, airtight entity, pipe net, device and
/// pending update of `from` into `into`.
///
/// Where both grids own a tile at the same coordinate the two airs are merged.
/// Air that ends up on a tile walled off by the combined airtight entities is
/// moved into an open neighbour, so total gas is conserved.
pub fn merge_grids(into: &mut GridAtmosphere, from: GridAtmosphere, config: &AtmosConfig) -> usize {
    let from_id = from.id;
    let GridAtmosphere {
        mut tiles,
        terrain,
        airtight,
        pipe_nets,
        devices,
        updates,
        ..
    } = from;

    for (pos, tile) in terrain.iter() {
        into.terrain.insert(*pos, *tile);
    }

    let mut entities: Vec<_> = airtight.into_values().collect();
    entities.sort_by_key(|e| e.id);
    for entity in entities {
        into.add_airtight(entity);
    }

    let mut positions: Vec<Vector2i> = tiles.keys().copied().collect();
    positions.sort_by_key(tile_order_key);
    let mut merged_tiles = 0;
    let mut sealed = Vec::new();
    for pos in positions {
        let Some(mut tile) = tiles.remove(&pos) else {
            continue;
        };
        if tile.map_atmosphere {
            continue;
        }
        tile.grid_id = into.id;
        tile.clear_adjacency();
        let burning = tile.hotspot.valid;

        match into.tiles.get_mut(&pos) {
            Some(existing) if !existing.map_atmosphere => {
                if let Some(source) = tile.air {
                    if let Some(target) = existing.air.as_mut() {
                        target.merge(&source, &config.gases);
                    } else {
                        existing.air = Some(source);
                    }
                }
            }
            _ => {
                into.tiles.insert(pos, tile);
            }
        }
        if burning {
            into.hotspots.insert(pos);
        }
        if into.airtight_at(&pos).is_solid() {
            sealed.push(pos);
        }
        into.invalidate(pos);
        merged_tiles += 1;
    }

    for pos in sealed {
        relocate_sealed_air(into, pos, config);
    }

    for (id, net) in pipe_nets {
        match into.pipe_nets.get_mut(&id) {
            Some(existing) => existing.air.merge(&net.air, &config.gases),
            None => {
                into.pipe_nets.insert(id, net);
            }
        }
    }
    into.devices.extend(devices);
    into.updates.absorb(updates);

    info!(into = %into.id, from = %from_id, merged_tiles, "Merged grid atmospheres");
    merged_tiles
}

/// Move the air of a walled-off tile into the first open neighbour in compass order
fn relocate_sealed_air(grid: &mut GridAtmosphere, pos: Vector2i, config: &AtmosConfig) {
    let Some(tile) = grid.tiles.get_mut(&pos) else {
        return;
    };
    tile.sync_temperature();
    let Some(air) = tile.air.take() else {
        return;
    };

    let destination = AtmosDirection::ORDERED.iter().map(|dir| pos + dir.offset()).find(|n| {
        !grid.airtight_at(n).is_solid() && grid.tiles.get(n).is_some_and(|t| !t.map_atmosphere && !t.space)
    });
    match destination.and_then(|n| grid.tiles.get_mut(&n)) {
        Some(open) => match open.air.as_mut() {
            Some(target) => target.merge(&air, &config.gases),
            None => open.air = Some(air),
        },
        None => {
            warn!(grid = %grid.id, ?pos, moles = air.total_moles(), "Merged air is sealed in with no open neighbour");
            if let Some(tile) = grid.tiles.get_mut(&pos) {
                tile.air = Some(air);
            }
        }
    }
}
