use atmos_sim_core::{AtmosConfig, AtmosphereSystem, NullObserver};
use std::ptr;
use std::sync::{Mutex, RwLock};

use crate::error::{AtmosSimErrorCode, AtmosSimError};
use crate::helpers::{clear_last_error, track_error, track_result};
use crate::simulation::AtmosTickStats;

/// Tunables exposed to engine code. Everything else keeps its default.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AtmosSimSettings {
    /// Active tiles shared per grid per tick
    pub max_active_tiles_per_tick: u32,
    /// Movement updates drained per grid per tick
    pub movement_updates_per_tick: u32,
    /// Connect tiles diagonally as well as cardinally
    pub diagonal_adjacency: bool,
    /// Run Monstermos equalization before diffusion
    pub equalization_enabled: bool,
    /// Vent regions touching space in one pass
    pub explosive_depressurization: bool,
    /// Pressure drop into space reported as a decompression (kPa)
    pub space_decompression_threshold: f32,
    /// Volume of one tile (L)
    pub cell_volume: f32,
}

impl Default for AtmosSimSettings {
    fn default() -> Self {
        let config = AtmosConfig::default();
        Self {
            max_active_tiles_per_tick: u32::try_from(config.max_active_tiles_per_tick).unwrap_or(u32::MAX),
            movement_updates_per_tick: u32::try_from(config.movement_updates_per_tick).unwrap_or(u32::MAX),
            diagonal_adjacency: config.diagonal_adjacency,
            equalization_enabled: config.equalization.enabled,
            explosive_depressurization: config.equalization.explosive_depressurization,
            space_decompression_threshold: config.space_decompression_threshold,
            cell_volume: config.cell_volume,
        }
    }
}

impl AtmosSimSettings {
    fn to_config(self) -> AtmosConfig {
        let mut config = AtmosConfig {
            max_active_tiles_per_tick: self.max_active_tiles_per_tick as usize,
            movement_updates_per_tick: self.movement_updates_per_tick as usize,
            diagonal_adjacency: self.diagonal_adjacency,
            space_decompression_threshold: self.space_decompression_threshold,
            cell_volume: self.cell_volume,
            ..AtmosConfig::default()
        };
        config.equalization.enabled = self.equalization_enabled;
        config.equalization.explosive_depressurization = self.explosive_depressurization;
        config
    }
}

/// The atmosphere simulation context handed to engine code as an opaque pointer.
///
/// # Thread Safety
/// The simulation sits behind an `RwLock`: queries take a read lock, updates and
/// commands take the write lock. Safe to call from any engine thread.
pub struct AtmosSimInstance {
    pub(crate) system: RwLock<AtmosphereSystem>,
    /// Summary of the most recent `atmos_sim_update`
    pub(crate) last_tick: Mutex<AtmosTickStats>,
}

impl AtmosSimInstance {
    /// Creates a new instance from validated settings.
    ///
    /// # Errors
    ///
    /// Returns `AtmosSimErrorCode::InvalidConfig` if the settings fail validation.
    pub(crate) fn new(settings: AtmosSimSettings) -> Result<Box<Self>, AtmosSimError> {
        let system = AtmosphereSystem::try_new(settings.to_config(), Box::new(NullObserver))
            .map_err(|e| AtmosSimError::invalid_config(&e.to_string()))?;
        Ok(Box::new(Self {
            system: RwLock::new(system),
            last_tick: Mutex::new(AtmosTickStats::default()),
        }))
    }
}

/// Settings matching the library defaults, for callers to tweak before `atmos_sim_new`.
#[no_mangle]
pub extern "C" fn atmos_sim_default_settings() -> AtmosSimSettings {
    AtmosSimSettings::default()
}

/// Create a new atmosphere simulation and return it via out-parameter.
///
/// Parameters
/// - `settings`: Optional settings; null uses the defaults.
/// - `out_instance`: Pointer to receive the created instance. Must be non-null.
///   Set to null on failure.
///
/// Returns
/// - `AtmosSimErrorCode::Ok` (0) on success
/// - `AtmosSimErrorCode::NullPointer` if `out_instance` is null
/// - `AtmosSimErrorCode::InvalidConfig` if the settings are rejected
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - `settings` must be null or point to a valid `AtmosSimSettings`.
/// - The caller owns the returned instance and MUST call `atmos_sim_destroy` exactly once.
///
/// Example (C++)
/// ```cpp
/// AtmosSimInstance* sim = nullptr;
/// AtmosSimSettings settings = atmos_sim_default_settings();
/// settings.diagonal_adjacency = false;
/// if (atmos_sim_new(&settings, &sim) != AtmosSimErrorCode::Ok) {
///     fprintf(stderr, "%s\n", atmos_sim_get_last_error());
///     return;
/// }
/// // ... use sim ...
/// atmos_sim_destroy(sim);
/// ```
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_new(
    settings: *const AtmosSimSettings,
    out_instance: *mut *mut AtmosSimInstance,
) -> AtmosSimErrorCode {
    if out_instance.is_null() {
        return track_error(&AtmosSimError::null_pointer("out_instance"));
    }

    // SAFETY: caller guarantees `settings` is null or valid
    let settings = unsafe { settings.as_ref() }.copied().unwrap_or_default();
    match track_result(AtmosSimInstance::new(settings)) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            clear_last_error();
            AtmosSimErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroys an instance previously created by `atmos_sim_new`. Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `atmos_sim_new` and not freed already.
/// - The caller must not use the pointer again afterwards.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_destroy(ptr: *mut AtmosSimInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: created by `Box::into_raw` in `atmos_sim_new` and not yet freed
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
