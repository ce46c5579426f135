//! Hotspot (tile fire) ignition, processing and suppression

use crate::config::AtmosConfig;
use crate::core_types::{EntityId, Vector2i};
use crate::gas::constants::TCMB;
use crate::gas::{Gas, GasMixture, ReactionResult};
use crate::grid::GridAtmosphere;
use crate::simulation::observer::AtmosObserver;
use crate::tile::Hotspot;
use tracing::debug;

/// Fraction of the tile volume above which a hotspot reacts the whole tile
const BYPASS_VOLUME_RATIO: f32 = 0.95;

/// Expose a tile to a heat source, igniting it if it can burn.
///
/// Ignition needs oxygen and plasma or tritium above their minimums and an
/// exposure hotter than the ignition temperature. Exposing a burning tile with
/// `soh` ("share our heat") raises the flame to the exposure instead.
///
/// # Arguments
///
/// * `temperature` - Exposure temperature (K)
/// * `volume` - Exposed volume (L); a new hotspot covers `volume * hotspot_volume_scale`
/// * `source` - Entity responsible for the exposure, reported to the observer
/// * `soh` - Let an existing hotspot absorb the exposure
///
/// # Returns
///
/// `true` if the tile is burning afterwards
#[allow(clippy::too_many_arguments)]
pub fn hotspot_expose(
    grid: &mut GridAtmosphere,
    position: Vector2i,
    temperature: f32,
    volume: f32,
    source: Option<EntityId>,
    soh: bool,
    config: &AtmosConfig,
    observer: &mut dyn AtmosObserver,
) -> bool {
    let fire = &config.fire;
    let grid_id = grid.id();
    let Some(tile) = grid.tile_mut(&position) else {
        return false;
    };
    if !tile.is_simulated() {
        return false;
    }
    let Some(air) = tile.air.as_ref() else {
        return false;
    };

    if air.get_moles(Gas::Oxygen) < fire.min_oxygen_moles {
        return false;
    }
    let has_fuel = air.get_moles(Gas::Plasma) >= fire.min_fuel_moles
        || air.get_moles(Gas::Tritium) >= fire.min_fuel_moles;

    if tile.hotspot.valid {
        if soh && has_fuel {
            tile.hotspot.temperature = tile.hotspot.temperature.max(temperature);
            tile.hotspot.volume = tile.hotspot.volume.max(volume);
        }
        return true;
    }

    if !has_fuel || temperature <= fire.ignition_temperature {
        return false;
    }

    tile.hotspot = Hotspot::ignite(temperature, volume * fire.hotspot_volume_scale);
    grid.track_hotspot(position);
    grid.activate(position);
    debug!(grid = %grid_id, ?position, temperature, volume, "Hotspot ignited");
    observer.on_hotspot_ignited(grid_id, position, source, soh);
    true
}

/// Put out the fire on a tile. Returns false if there was none.
pub fn hotspot_extinguish(grid: &mut GridAtmosphere, position: Vector2i, observer: &mut dyn AtmosObserver) -> bool {
    let grid_id = grid.id();
    let was_burning = match grid.tile_mut(&position) {
        Some(tile) if tile.hotspot.valid => {
            tile.hotspot = Hotspot::default();
            true
        }
        _ => false,
    };
    grid.untrack_hotspot(&position);
    if was_burning {
        debug!(grid = %grid_id, ?position, "Hotspot extinguished");
        observer.on_hotspot_extinguished(grid_id, position);
    }
    was_burning
}

/// Whether the tile currently has a valid hotspot
pub fn is_hotspot_active(grid: &GridAtmosphere, position: &Vector2i) -> bool {
    grid.tile(position).is_some_and(|tile| tile.hotspot.valid)
}

/// Cool a tile by `cooling` kelvin and put out its fire (extinguisher foam)
pub fn suppress_fire(
    grid: &mut GridAtmosphere,
    position: Vector2i,
    cooling: f32,
    observer: &mut dyn AtmosObserver,
) -> bool {
    let Some(tile) = grid.tile_mut(&position) else {
        return false;
    };
    if let Some(air) = tile.air.as_mut() {
        let cooled = (air.temperature() - cooling.max(0.0)).max(TCMB);
        air.set_temperature(cooled);
    }
    grid.activate(position);
    hotspot_extinguish(grid, position, observer)
}

/// React the tile's air and ignite it if the reaction left it hot enough
pub fn react_tile(
    grid: &mut GridAtmosphere,
    position: Vector2i,
    config: &AtmosConfig,
    observer: &mut dyn AtmosObserver,
) -> ReactionResult {
    let Some(tile) = grid.tile_mut(&position) else {
        return ReactionResult::NO_REACTION;
    };
    if !tile.is_simulated() {
        return ReactionResult::NO_REACTION;
    }
    let Some(air) = tile.air.as_mut() else {
        return ReactionResult::NO_REACTION;
    };
    let result = air.react(&config.fire, &config.gases);
    let temperature = air.temperature();
    if result.is_reacting() && temperature > config.fire.minimum_temperature_to_exist {
        hotspot_expose(grid, position, temperature, config.cell_volume, None, false, config, observer);
    }
    result
}

/// Advance every burning tile by one tick. Returns how many are still burning.
pub fn process_hotspots(grid: &mut GridAtmosphere, config: &AtmosConfig, observer: &mut dyn AtmosObserver) -> usize {
    for position in grid.hotspot_tiles() {
        process_hotspot(grid, position, config, observer);
    }
    grid.hotspot_count()
}

fn process_hotspot(
    grid: &mut GridAtmosphere,
    position: Vector2i,
    config: &AtmosConfig,
    observer: &mut dyn AtmosObserver,
) {
    let fire = &config.fire;
    let grid_id = grid.id();

    if !grid.tile(&position).is_some_and(|tile| tile.hotspot.valid) {
        grid.untrack_hotspot(&position);
        return;
    }
    grid.activate(position);
    let Some(tile) = grid.tile_mut(&position) else {
        return;
    };
    if !tile.hotspot.skipped_first_process {
        tile.hotspot.skipped_first_process = true;
        return;
    }

    let starved = is_starved(tile.air.as_ref(), config);
    if tile.hotspot.temperature < fire.minimum_temperature_to_exist || tile.hotspot.volume <= 1.0 || starved {
        hotspot_extinguish(grid, position, observer);
        return;
    }

    let Some(air) = tile.air.as_mut() else {
        return;
    };
    perform_exposure(&mut tile.hotspot, air, config);
    let tile_volume = air.volume();
    let air_temperature = air.temperature();
    tile.hotspot.update_state(tile_volume);
    let (flame_temperature, flame_volume) = (tile.hotspot.temperature, tile.hotspot.volume);
    let targets: Vec<Vector2i> = if air_temperature > fire.minimum_temperature_to_spread {
        tile.connected().map(|(_, neighbour)| neighbour).collect()
    } else {
        Vec::new()
    };

    observer.on_fire_act(grid_id, position, flame_temperature, flame_volume);

    let radiated = air_temperature * fire.spread_radiosity_scale;
    for neighbour in targets {
        let already_burning = grid.tile(&neighbour).map_or(true, |t| t.hotspot.valid);
        if !already_burning {
            hotspot_expose(grid, neighbour, radiated, config.cell_volume / 4.0, None, false, config, observer);
        }
    }
}

/// Burn the part of the tile the hotspot covers and grow or shrink it
fn perform_exposure(hotspot: &mut Hotspot, air: &mut GasMixture, config: &AtmosConfig) {
    let fire = &config.fire;
    hotspot.bypassing = hotspot.skipped_first_process && hotspot.volume > air.volume() * BYPASS_VOLUME_RATIO;

    if hotspot.bypassing {
        air.react(fire, &config.gases);
        hotspot.volume = air.fire_reaction_amount() * fire.fire_growth_rate;
        hotspot.temperature = air.temperature();
    } else {
        let mut affected = air.remove_volume(hotspot.volume);
        affected.set_temperature(hotspot.temperature);
        affected.react(fire, &config.gases);
        hotspot.temperature = affected.temperature();
        hotspot.volume = affected.fire_reaction_amount() * fire.fire_growth_rate;
        air.merge(&affected, &config.gases);
    }
}

/// No air, or too little oxidizer or fuel left to keep a fire going
fn is_starved(air: Option<&GasMixture>, config: &AtmosConfig) -> bool {
    let fire = &config.fire;
    air.map_or(true, |air| {
        air.get_moles(Gas::Oxygen) < fire.min_oxygen_moles
            || (air.get_moles(Gas::Plasma) < fire.min_fuel_moles
                && air.get_moles(Gas::Tritium) < fire.min_fuel_moles)
    })
}
