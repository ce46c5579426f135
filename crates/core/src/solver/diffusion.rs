//! Budgeted share pass over the active-tile schedule
//!
//! Each tick at most `max_active_tiles_per_tick` tiles are taken from the front
//! of a grid's active queue. Every taken tile shares gas with each connected
//! neighbour in compass order, skipping neighbours that already shared this
//! cycle. Tiles that still differ from a neighbour go to the back of the queue;
//! the rest drop out of the schedule. Untaken tiles wait for the next tick, so
//! the per-tick cost does not grow with the size of the grid.

use crate::config::AtmosConfig;
use crate::core_types::{AtmosDirection, Vector2i};
use crate::gas::constants::OPEN_HEAT_TRANSFER_COEFFICIENT;
use crate::gas::MixtureComparison;
use crate::grid::GridAtmosphere;
use crate::simulation::observer::AtmosObserver;
use crate::solver::hotspot::react_tile;
use serde::Serialize;
use tracing::trace;

/// What one share pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffusionReport {
    /// Tiles taken from the schedule
    pub processed: usize,
    /// Tiles that settled and left the schedule
    pub deactivated: usize,
    /// Tiles still scheduled after the pass
    pub remaining: usize,
    /// Decompression events raised
    pub decompressions: usize,
}

/// Run one budgeted share pass
pub fn process_active_tiles(
    grid: &mut GridAtmosphere,
    config: &AtmosConfig,
    observer: &mut dyn AtmosObserver,
) -> DiffusionReport {
    let cycle = grid.next_cycle();
    let batch = grid.take_active(config.max_active_tiles_per_tick);
    let mut report = DiffusionReport {
        processed: batch.len(),
        ..DiffusionReport::default()
    };

    for position in batch {
        let still_active = share_tile(grid, position, cycle, config, observer, &mut report);

        let volatile = grid
            .tile(&position)
            .is_some_and(|tile| !tile.hotspot.valid && tile.is_volatile(&config.fire));
        if volatile {
            react_tile(grid, position, config, observer);
        }

        if still_active {
            grid.activate(position);
        } else {
            report.deactivated += 1;
        }
    }

    report.remaining = grid.active_count();
    report
}

/// Share one tile with its neighbours. Returns whether it must stay scheduled.
fn share_tile(
    grid: &mut GridAtmosphere,
    position: Vector2i,
    cycle: u64,
    config: &AtmosConfig,
    observer: &mut dyn AtmosObserver,
    report: &mut DiffusionReport,
) -> bool {
    let grid_id = grid.id();
    let Some(tile) = grid.tile_mut(&position) else {
        return false;
    };
    if !tile.is_simulated() {
        return false;
    }
    let Some(mut air) = tile.air.take() else {
        return false;
    };
    tile.current_cycle = cycle;
    let adjacent_count = tile.adjacent_count();
    let links: Vec<(AtmosDirection, Vector2i)> = tile.connected().collect();

    let mut still_active = false;
    let mut to_excite = Vec::new();
    let mut breach: Option<(AtmosDirection, f32)> = None;

    for (direction, neighbour_pos) in links {
        let Some(neighbour) = grid.tile_mut(&neighbour_pos) else {
            continue;
        };
        let neighbour_space = neighbour.space;
        let neighbour_reservoir = neighbour.space || neighbour.map_atmosphere;
        let already_shared = !neighbour_reservoir && neighbour.current_cycle >= cycle;
        let Some(neighbour_air) = neighbour.air.as_mut() else {
            continue;
        };

        let comparison = air.compare(
            neighbour_air,
            config.minimum_moles_delta_to_move,
            config.minimum_temperature_delta_to_suspend,
        );
        if comparison == MixtureComparison::Similar {
            continue;
        }
        if already_shared {
            still_active = true;
            continue;
        }

        let pressure_before = air.pressure();
        let neighbour_moles_before = neighbour_air.total_moles();
        air.share(neighbour_air, adjacent_count, &config.gases);
        air.temperature_share(neighbour_air, OPEN_HEAT_TRANSFER_COEFFICIENT, &config.gases);

        let moved = (neighbour_air.total_moles() - neighbour_moles_before).abs();
        if !neighbour_reservoir && moved > config.minimum_moles_delta_to_move {
            to_excite.push(neighbour_pos);
        }

        if neighbour_space {
            let drop = pressure_before - air.pressure();
            if drop > breach.map_or(0.0, |(_, d)| d) {
                breach = Some((direction, drop));
            }
        }

        if air.compare(
            neighbour_air,
            config.minimum_moles_delta_to_move,
            config.minimum_temperature_delta_to_suspend,
        ) != MixtureComparison::Similar
        {
            still_active = true;
        }
    }

    if let Some(tile) = grid.tile_mut(&position) {
        tile.air = Some(air);
        if let Some((direction, drop)) = breach {
            tile.pressure_difference = drop;
            tile.pressure_direction = direction;
            if drop > config.space_decompression_threshold {
                report.decompressions += 1;
                trace!(grid = %grid_id, ?position, drop, "Decompression into space");
                observer.on_decompression(grid_id, position, direction, drop);
            }
        }
    }

    for neighbour in to_excite {
        grid.activate(neighbour);
    }
    still_active
}
