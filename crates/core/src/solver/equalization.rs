//! Monstermos pressure equalization
//!
//! Diffusion only moves a fraction of the difference per tick, which is far too
//! slow for a door opening onto a vacuum. Equalization instead collects the
//! connected region around an unsettled tile and settles it in one pass:
//!
//! - A region touching space is explosively depressurized. Every tile pushes
//!   its whole content one step towards the nearest breach, farthest tiles
//!   first, and the breach tiles vent into space.
//! - Any other region is balanced to its average moles by routing each tile's
//!   surplus or deficit along the breadth-first spanning tree: upward flows in
//!   post-order, then downward flows in pre-order. Every flow moves a real
//!   parcel, so heat travels with the gas.
//!
//! Scratch state lives in a map local to one pass and is dropped afterwards.

use crate::config::AtmosConfig;
use crate::core_types::{AtmosDirection, Vector2i};
use crate::gas::constants::GAS_MIN_MOLES;
use crate::gas::GasMixture;
use crate::grid::GridAtmosphere;
use crate::simulation::observer::AtmosObserver;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// What one equalization pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EqualizationReport {
    /// Regions collected
    pub regions: usize,
    /// Tiles taken into a region, counted against `tiles_per_tick`
    pub equalized_tiles: usize,
    /// Tiles emptied by explosive depressurization
    pub depressurized_tiles: usize,
    /// Moles moved between tiles while balancing
    pub moved_moles: f32,
    /// Moles lost to space
    pub vented_moles: f32,
    /// Decompression events raised
    pub decompressions: usize,
}

/// Per-tile scratch for one pass
#[derive(Debug, Clone, Copy, Default)]
struct MonstermosInfo {
    /// Moles above (positive) or below the region average
    mole_delta: f32,
    /// Net flow from this tile's subtree towards `parent`
    transfer_amount: f32,
    /// Direction from this tile towards `parent`
    transfer_direction: AtmosDirection,
    parent: Option<Vector2i>,
    visited: bool,
}

#[derive(Debug, Default)]
struct Region {
    /// Members in breadth-first order, root first
    tiles: Vec<Vector2i>,
    /// Member tiles linked to space, with the direction of the link
    breaches: Vec<(Vector2i, AtmosDirection)>,
}

/// Run one equalization pass over the active tiles of `grid`
pub fn equalize_pressure(
    grid: &mut GridAtmosphere,
    config: &AtmosConfig,
    observer: &mut dyn AtmosObserver,
) -> EqualizationReport {
    let settings = &config.equalization;
    let mut report = EqualizationReport::default();
    if !settings.enabled || settings.tile_limit == 0 {
        return report;
    }

    let candidates: Vec<Vector2i> = grid.active_tiles().copied().collect();
    let mut infos: FxHashMap<Vector2i, MonstermosInfo> = FxHashMap::default();

    for start in candidates {
        let remaining = settings.tiles_per_tick.saturating_sub(report.equalized_tiles);
        if remaining == 0 {
            break;
        }
        if infos.get(&start).is_some_and(|info| info.visited) {
            continue;
        }
        if !needs_equalization(grid, &start, config) {
            continue;
        }

        let region = collect_region(grid, start, settings.tile_limit.min(remaining), &mut infos);
        report.regions += 1;
        report.equalized_tiles += region.tiles.len();

        if !region.breaches.is_empty() && settings.explosive_depressurization {
            explosive_depressurize(grid, &region, &mut infos, config, observer, &mut report);
        } else if region.tiles.len() > 1 {
            report.moved_moles += balance_region(grid, &region, &mut infos, config);
        }

        for position in &region.tiles {
            grid.activate(*position);
        }
    }

    if report.regions > 0 {
        debug!(
            grid = %grid.id(),
            regions = report.regions,
            tiles = report.equalized_tiles,
            vented = report.vented_moles,
            "Equalized pressure"
        );
    }
    report
}

/// A tile is worth equalizing when its mole count differs noticeably from a
/// grid neighbour, or it has gas next to space
fn needs_equalization(grid: &GridAtmosphere, position: &Vector2i, config: &AtmosConfig) -> bool {
    let Some(tile) = grid.tile(position) else {
        return false;
    };
    if !tile.is_simulated() {
        return false;
    }
    let moles = tile.air.as_ref().map_or(0.0, GasMixture::total_moles);

    tile.connected().any(|(_, neighbour_pos)| {
        grid.tile(&neighbour_pos).is_some_and(|neighbour| {
            if neighbour.space {
                moles > config.minimum_moles_delta_to_move
            } else if neighbour.is_simulated() {
                let other = neighbour.air.as_ref().map_or(0.0, GasMixture::total_moles);
                (moles - other).abs() > config.minimum_moles_delta_to_move
            } else {
                false
            }
        })
    })
}

/// Breadth-first walk of the simulated tiles connected to `start`, up to `limit` tiles
fn collect_region(
    grid: &GridAtmosphere,
    start: Vector2i,
    limit: usize,
    infos: &mut FxHashMap<Vector2i, MonstermosInfo>,
) -> Region {
    let mut region = Region::default();
    let mut queue = VecDeque::new();
    infos.insert(
        start,
        MonstermosInfo {
            visited: true,
            ..MonstermosInfo::default()
        },
    );
    queue.push_back(start);

    while let Some(position) = queue.pop_front() {
        region.tiles.push(position);
        let Some(tile) = grid.tile(&position) else {
            continue;
        };
        for (direction, neighbour_pos) in tile.connected() {
            let Some(neighbour) = grid.tile(&neighbour_pos) else {
                continue;
            };
            if neighbour.space {
                region.breaches.push((position, direction));
                continue;
            }
            if !neighbour.is_simulated() || infos.get(&neighbour_pos).is_some_and(|info| info.visited) {
                continue;
            }
            if region.tiles.len() + queue.len() >= limit {
                continue;
            }
            infos.insert(
                neighbour_pos,
                MonstermosInfo {
                    transfer_direction: direction.opposite(),
                    parent: Some(position),
                    visited: true,
                    ..MonstermosInfo::default()
                },
            );
            queue.push_back(neighbour_pos);
        }
    }
    region
}

// ----------------------------------------------------------------------
// Explosive depressurization
// ----------------------------------------------------------------------

fn explosive_depressurize(
    grid: &mut GridAtmosphere,
    region: &Region,
    infos: &mut FxHashMap<Vector2i, MonstermosInfo>,
    config: &AtmosConfig,
    observer: &mut dyn AtmosObserver,
    report: &mut EqualizationReport,
) {
    let grid_id = grid.id();
    let members: FxHashSet<Vector2i> = region.tiles.iter().copied().collect();

    // Multi-source walk from the breach tiles: every member learns the step
    // towards its nearest breach.
    let mut reached: FxHashSet<Vector2i> = FxHashSet::default();
    let mut order = Vec::with_capacity(region.tiles.len());
    let mut queue = VecDeque::new();
    for &(position, direction) in &region.breaches {
        if reached.insert(position) {
            if let Some(info) = infos.get_mut(&position) {
                info.transfer_direction = direction;
                info.parent = None;
            }
            queue.push_back(position);
        }
    }
    while let Some(position) = queue.pop_front() {
        order.push(position);
        let Some(tile) = grid.tile(&position) else {
            continue;
        };
        for (direction, neighbour_pos) in tile.connected() {
            if !members.contains(&neighbour_pos) || !reached.insert(neighbour_pos) {
                continue;
            }
            if let Some(info) = infos.get_mut(&neighbour_pos) {
                info.transfer_direction = direction.opposite();
                info.parent = Some(position);
            }
            queue.push_back(neighbour_pos);
        }
    }

    for position in order.into_iter().rev() {
        let Some(info) = infos.get(&position).copied() else {
            continue;
        };
        let Some(tile) = grid.tile_mut(&position) else {
            continue;
        };
        let Some(air) = tile.air.as_mut() else {
            continue;
        };
        let parcel = air.remove_ratio(1.0);
        let pressure = parcel.pressure();
        tile.pressure_difference = pressure;
        tile.pressure_direction = info.transfer_direction;
        report.depressurized_tiles += 1;

        if pressure > 0.0 {
            report.decompressions += 1;
            observer.on_decompression(grid_id, position, info.transfer_direction, pressure);
        }

        match info.parent {
            Some(next) => {
                if let Some(target) = grid.tile_mut(&next).and_then(|t| t.air.as_mut()) {
                    target.merge(&parcel, &config.gases);
                }
            }
            None => report.vented_moles += parcel.total_moles(),
        }
    }
}

// ----------------------------------------------------------------------
// Spanning-tree balancing
// ----------------------------------------------------------------------

/// Settle a closed region to its average moles. Returns the moles moved.
fn balance_region(
    grid: &mut GridAtmosphere,
    region: &Region,
    infos: &mut FxHashMap<Vector2i, MonstermosInfo>,
    config: &AtmosConfig,
) -> f32 {
    let total: f32 = region.tiles.iter().map(|p| moles_at(grid, p)).sum();
    let average = total / region.tiles.len() as f32;

    for position in &region.tiles {
        let delta = moles_at(grid, position) - average;
        if let Some(info) = infos.get_mut(position) {
            info.mole_delta = delta;
            info.transfer_amount = 0.0;
        }
        if let Some(tile) = grid.tile_mut(position) {
            tile.pressure_difference = 0.0;
        }
    }

    // Children come after their parent in breadth-first order, so a reverse
    // walk folds every subtree into its root.
    for position in region.tiles.iter().rev() {
        let Some(info) = infos.get_mut(position) else {
            continue;
        };
        info.transfer_amount += info.mole_delta;
        let (parent, amount) = (info.parent, info.transfer_amount);
        if let Some(parent) = parent.and_then(|p| infos.get_mut(&p)) {
            parent.transfer_amount += amount;
        }
    }

    let grid_id = grid.id();
    let mut moved = 0.0;
    for position in region.tiles.iter().rev() {
        let Some(info) = infos.get(position).copied() else {
            continue;
        };
        if let Some(parent) = info.parent {
            if info.transfer_amount > GAS_MIN_MOLES {
                moved += move_gas(grid, *position, parent, info.transfer_amount, info.transfer_direction, config);
            }
        }
    }
    for position in &region.tiles {
        let Some(info) = infos.get(position).copied() else {
            continue;
        };
        if let Some(parent) = info.parent {
            if info.transfer_amount < -GAS_MIN_MOLES {
                moved += move_gas(
                    grid,
                    parent,
                    *position,
                    -info.transfer_amount,
                    info.transfer_direction.opposite(),
                    config,
                );
            }
        }
    }

    debug!(grid = %grid_id, tiles = region.tiles.len(), average, moved, "Balanced region");
    moved
}

fn moles_at(grid: &GridAtmosphere, position: &Vector2i) -> f32 {
    grid.tile(position)
        .and_then(|tile| tile.air.as_ref())
        .map_or(0.0, GasMixture::total_moles)
}

/// Move `amount` moles from one tile to a neighbour, recording the push on the giver
fn move_gas(
    grid: &mut GridAtmosphere,
    from: Vector2i,
    to: Vector2i,
    amount: f32,
    direction: AtmosDirection,
    config: &AtmosConfig,
) -> f32 {
    let Some(giver) = grid.tile_mut(&from) else {
        return 0.0;
    };
    let Some(air) = giver.air.as_mut() else {
        return 0.0;
    };
    let parcel = air.remove(amount);
    let pressure = parcel.pressure();
    if pressure > giver.pressure_difference {
        giver.pressure_difference = pressure;
        giver.pressure_direction = direction;
    }

    let moved = parcel.total_moles();
    match grid.tile_mut(&to).and_then(|t| t.air.as_mut()) {
        Some(target) => target.merge(&parcel, &config.gases),
        None => {
            // Receiver vanished mid-pass; give the parcel back.
            if let Some(air) = grid.tile_mut(&from).and_then(|t| t.air.as_mut()) {
                air.merge(&parcel, &config.gases);
            }
            return 0.0;
        }
    }
    moved
}
