use atmos_sim_core::{AtmosphereSystem, Gas, GasMixture, GridId, Vector2i};

use crate::error::{AtmosSimErrorCode, AtmosSimError};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, require_grid, with_system, with_system_mut, write_out};
use crate::instance::AtmosSimInstance;

/// Number of gas species, the length of `AtmosTileStats::moles`
pub const ATMOS_GAS_COUNT: usize = Gas::COUNT;

#[repr(C)]
/// FFI-friendly snapshot of one tile's air.
/// Keep this layout stable for C/C++/C# consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AtmosTileStats {
    /// Pressure (kPa)
    pub pressure: f32,
    /// Temperature (K)
    pub temperature: f32,
    /// Total gas (mol)
    pub total_moles: f32,
    /// Moles per species in `Gas` index order
    pub moles: [f32; ATMOS_GAS_COUNT],
    /// A fire burns on the tile
    pub hotspot: bool,
    /// The tile is open to space
    pub space: bool,
}

fn tile_stats(system: &mut AtmosphereSystem, grid: GridId, tile: Vector2i) -> Option<AtmosTileStats> {
    let hotspot = system.is_hotspot_active(grid, tile);
    let space = system.is_tile_space(Some(grid), None, tile);
    let air = system.get_tile_mixture(Some(grid), None, tile, false)?;
    Some(AtmosTileStats {
        pressure: air.pressure(),
        temperature: air.temperature(),
        total_moles: air.total_moles(),
        moles: *air.moles(),
        hotspot,
        space,
    })
}

/// Read one tile's air. Off-grid coordinates report the map background;
/// walls fail with `UnknownTile`.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `atmos_sim_new`.
/// - `out_stats` must be a valid, non-null pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_get_tile_stats(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    out_stats: *mut AtmosTileStats,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let stats = with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            tile_stats(system, id, Vector2i::new(x, y)).ok_or_else(|| AtmosSimError::unknown_tile(grid, x, y))
        })??;
        write_out(out_stats, "out_stats", stats)
    })
}

/// Read one tile's pressure (kPa). Walls read as 0.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `atmos_sim_new`.
/// - `out_pressure` must be a valid, non-null pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_get_tile_pressure(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    out_pressure: *mut f32,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let pressure = with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            Ok(system
                .get_tile_mixture(Some(id), None, Vector2i::new(x, y), false)
                .map_or(0.0, |air| air.pressure()))
        })??;
        write_out(out_pressure, "out_pressure", pressure)
    })
}

/// Read one tile's temperature (K).
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `atmos_sim_new`.
/// - `out_temperature` must be a valid, non-null pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_get_tile_temperature(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    out_temperature: *mut f32,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let temperature = with_system(instance, |system| {
            let id = require_grid(system, grid)?;
            system
                .grid(id)
                .and_then(|g| g.tile(&Vector2i::new(x, y)))
                .map(|tile| tile.air.as_ref().map_or(tile.temperature, GasMixture::temperature))
                .ok_or_else(|| AtmosSimError::unknown_tile(grid, x, y))
        })??;
        write_out(out_temperature, "out_temperature", temperature)
    })
}

/// Set the amount of one gas species on a tile and wake it up.
///
/// `gas` is the species index (0 = oxygen, 1 = nitrogen, 2 = carbon dioxide,
/// 3 = plasma, 4 = tritium, 5 = water vapor, 6 = nitrous oxide).
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_set_tile_gas(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    gas: u32,
    moles: f32,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let species = Gas::from_index(gas as usize)
            .ok_or_else(|| AtmosSimError::invalid_parameter("gas", &format!("unknown species {gas}")))?;
        if !moles.is_finite() || moles < 0.0 {
            return Err(AtmosSimError::invalid_parameter(
                "moles",
                &format!("must be finite and non-negative, got {moles}"),
            ));
        }
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            let tile = Vector2i::new(x, y);
            let mut air = system
                .grid(id)
                .and_then(|g| g.tile(&tile))
                .filter(|t| t.is_simulated())
                .and_then(|t| t.air.clone())
                .ok_or_else(|| AtmosSimError::unknown_tile(grid, x, y))?;
            air.set_moles(species, moles);
            system.set_tile_mixture(id, tile, &air);
            Ok(())
        })?
    })
}

/// Set a tile's air temperature (K) and wake it up.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_set_tile_temperature(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    temperature: f32,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(AtmosSimError::invalid_parameter(
                "temperature",
                &format!("must be finite and positive, got {temperature}"),
            ));
        }
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            let tile = Vector2i::new(x, y);
            let mut air = system
                .grid(id)
                .and_then(|g| g.tile(&tile))
                .filter(|t| t.is_simulated())
                .and_then(|t| t.air.clone())
                .ok_or_else(|| AtmosSimError::unknown_tile(grid, x, y))?;
            air.set_temperature(temperature);
            system.set_tile_mixture(id, tile, &air);
            Ok(())
        })?
    })
}
