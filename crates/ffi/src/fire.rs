use atmos_sim_core::{EntityId, Vector2i};

use crate::error::{AtmosSimErrorCode, AtmosSimError};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, require_grid, with_system, with_system_mut, write_out};
use crate::instance::AtmosSimInstance;

/// Expose a tile to a heat source (spark, welder, hot pipe).
///
/// `source` is the responsible entity id, or 0 for none. `out_burning` receives
/// whether the tile is on fire afterwards and may be null.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `atmos_sim_new`.
/// - `out_burning` must be null or a valid pointer to writable memory.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn atmos_sim_hotspot_expose(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    temperature: f32,
    volume: f32,
    source: u64,
    out_burning: *mut bool,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        if !temperature.is_finite() || !volume.is_finite() || volume <= 0.0 {
            return Err(AtmosSimError::invalid_parameter(
                "temperature/volume",
                &format!("got {temperature} K over {volume} L"),
            ));
        }
        let instance = instance_from_ptr(ptr)?;
        let source = (source != 0).then_some(EntityId(source));
        let burning = with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            Ok(system.hotspot_expose(id, Vector2i::new(x, y), temperature, volume, source, false))
        })??;
        if out_burning.is_null() {
            Ok(())
        } else {
            write_out(out_burning, "out_burning", burning)
        }
    })
}

/// Whether a tile is burning.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `atmos_sim_new`.
/// - `out_active` must be a valid, non-null pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_is_hotspot_active(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    out_active: *mut bool,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let active = with_system(instance, |system| {
            let id = require_grid(system, grid)?;
            Ok(system.is_hotspot_active(id, Vector2i::new(x, y)))
        })??;
        write_out(out_active, "out_active", active)
    })
}

/// Cool a tile by `cooling` kelvin and put out its fire (extinguisher, foam).
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_suppress_fire(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    cooling: f32,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        if !cooling.is_finite() || cooling < 0.0 {
            return Err(AtmosSimError::invalid_parameter(
                "cooling",
                &format!("must be finite and non-negative, got {cooling}"),
            ));
        }
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            system.suppress_fire(id, Vector2i::new(x, y), cooling);
            Ok(())
        })?
    })
}
