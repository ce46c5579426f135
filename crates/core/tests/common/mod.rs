//! Shared fixtures for the integration tests
#![allow(dead_code)]

use atmos_sim_core::gas::constants::{CELL_VOLUME, R_IDEAL_GAS_EQUATION, T20C};
use atmos_sim_core::{
    AirtightEntity, AtmosphereSystem, EntityId, Gas, GasMixture, GridAtmosphere, GridId, GridTerrain, MapId,
    TerrainTile, Vector2i,
};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Add a grid holding a `width` x `height` room ringed by walls.
///
/// Interior tiles start with standard air when `aired` is set. Returns the
/// interior coordinates. The walls are queued, so they land on the first tick.
pub fn walled_room(
    system: &mut AtmosphereSystem,
    grid: GridId,
    origin: Vector2i,
    width: i32,
    height: i32,
    aired: bool,
) -> Vec<Vector2i> {
    let max = origin + Vector2i::new(width + 1, height + 1);
    let mut terrain = GridTerrain::rect(origin, max, false);
    let mut interior = Vec::new();
    for y in 1..=height {
        for x in 1..=width {
            let pos = origin + Vector2i::new(x, y);
            let tile = if aired { TerrainTile::AIRED_FLOOR } else { TerrainTile::FLOOR };
            terrain.insert(pos, tile);
            interior.push(pos);
        }
    }
    assert!(system.add_grid(grid, MapId(1), terrain));

    let mut next_id = u64::from(grid.value()) * 10_000;
    for y in origin.y..=max.y {
        for x in origin.x..=max.x {
            if x == origin.x || y == origin.y || x == max.x || y == max.y {
                next_id += 1;
                system.queue_airtight_added(grid, AirtightEntity::wall(EntityId(next_id), Vector2i::new(x, y)));
            }
        }
    }
    interior
}

/// Moles of an ideal gas filling one cell at `pressure` kPa and `temperature` K
pub fn moles_for(pressure: f32, temperature: f32) -> f32 {
    pressure * CELL_VOLUME / (R_IDEAL_GAS_EQUATION * temperature)
}

/// One cell of pure oxygen at `pressure` kPa and room temperature
pub fn oxygen_at(pressure: f32) -> GasMixture {
    GasMixture::with_moles(CELL_VOLUME, T20C, &[(Gas::Oxygen, moles_for(pressure, T20C))])
}

pub fn vacuum() -> GasMixture {
    GasMixture::new(CELL_VOLUME, T20C)
}

pub fn total_moles(system: &AtmosphereSystem, grid: GridId) -> f32 {
    system.grid(grid).map_or(0.0, GridAtmosphere::total_moles)
}

pub fn pressure_at(system: &AtmosphereSystem, grid: GridId, tile: Vector2i) -> f32 {
    system
        .grid(grid)
        .and_then(|g| g.tile(&tile))
        .map_or(0.0, |t| t.pressure())
}
