use crate::error::{AtmosSimErrorCode, AtmosSimError};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_system_mut, write_out};
use crate::instance::AtmosSimInstance;

/// Summary of one simulation tick
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AtmosTickStats {
    /// Tick number, starting at 1
    pub tick: u64,
    /// Grids ticked
    pub grids: u32,
    /// Tiles processed by diffusion
    pub processed_tiles: u32,
    /// Tiles still scheduled for the next tick
    pub active_tiles: u32,
    /// Tiles moved by equalization
    pub equalized_tiles: u32,
    /// Decompression events raised
    pub decompressions: u32,
    /// Tiles burning after the tick
    pub hotspots: u32,
}

fn saturate(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Advance the simulation by `dt` seconds.
///
/// Thread-safe: acquires the write lock for the update.
/// If `ptr` is null or `dt` is non-finite or non-positive this function is a no-op.
///
/// # Safety
/// `ptr` must be null or a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_update(ptr: *const AtmosSimInstance, dt: f32) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }

    // Silently ignore errors for void-returning function
    let _ = handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let report = with_system_mut(instance, |system| system.tick(dt))?;

        let stats = AtmosTickStats {
            tick: report.tick,
            grids: saturate(report.grids.len()),
            processed_tiles: saturate(report.processed_tiles()),
            active_tiles: saturate(report.active_tiles()),
            equalized_tiles: saturate(report.grids.iter().map(|g| g.equalization.equalized_tiles).sum()),
            decompressions: saturate(
                report
                    .grids
                    .iter()
                    .map(|g| g.equalization.decompressions + g.diffusion.decompressions)
                    .sum(),
            ),
            hotspots: saturate(report.hotspots()),
        };
        let mut last = instance
            .last_tick
            .lock()
            .map_err(|_| AtmosSimError::lock_poisoned("Mutex"))?;
        *last = stats;
        Ok(())
    });
}

/// Copy the summary of the most recent update into `out_stats`.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `atmos_sim_new`.
/// - `out_stats` must be a valid, non-null pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_get_tick_stats(
    ptr: *const AtmosSimInstance,
    out_stats: *mut AtmosTickStats,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let stats = *instance
            .last_tick
            .lock()
            .map_err(|_| AtmosSimError::lock_poisoned("Mutex"))?;
        write_out(out_stats, "out_stats", stats)
    })
}
