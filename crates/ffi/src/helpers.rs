use crate::error::{with_last_error_mut, AtmosSimError, AtmosSimErrorCode};
use crate::instance::AtmosSimInstance;
use atmos_sim_core::{AtmosphereSystem, GridId};
use std::ffi::CString;

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &AtmosSimError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &AtmosSimError) -> AtmosSimErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result and hand back its code.
pub(crate) fn track_result<T>(result: Result<T, AtmosSimError>) -> Result<T, AtmosSimErrorCode> {
    result.map_err(|error| track_error(&error))
}

/// Clear the thread-local error message and code.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = AtmosSimErrorCode::Ok;
    });
}

/// Run an FFI body and convert its outcome to an error code, tracking failures
/// and clearing the last error on success.
pub(crate) fn handle_ffi_result_error<F>(body: F) -> AtmosSimErrorCode
where
    F: FnOnce() -> Result<(), AtmosSimError>,
{
    match track_result(body()) {
        Ok(()) => {
            clear_last_error();
            AtmosSimErrorCode::Ok
        }
        Err(code) => code,
    }
}

/// Borrow the instance behind an FFI pointer.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const AtmosSimInstance,
) -> Result<&'a AtmosSimInstance, AtmosSimError> {
    // SAFETY: callers pass either null or a pointer obtained from `atmos_sim_new`
    // that has not been destroyed; null is rejected here.
    unsafe { ptr.as_ref() }.ok_or_else(|| AtmosSimError::null_pointer("ptr"))
}

/// Run `func` with shared access to the simulation.
pub(crate) fn with_system<F, T>(instance: &AtmosSimInstance, func: F) -> Result<T, AtmosSimError>
where
    F: FnOnce(&AtmosphereSystem) -> T,
{
    let system = instance
        .system
        .read()
        .map_err(|_| AtmosSimError::lock_poisoned("RwLock"))?;
    Ok(func(&system))
}

/// Run `func` with exclusive access to the simulation.
pub(crate) fn with_system_mut<F, T>(instance: &AtmosSimInstance, func: F) -> Result<T, AtmosSimError>
where
    F: FnOnce(&mut AtmosphereSystem) -> T,
{
    let mut system = instance
        .system
        .write()
        .map_err(|_| AtmosSimError::lock_poisoned("RwLock"))?;
    Ok(func(&mut system))
}

/// Fail with `UnknownGrid` unless the grid has an atmosphere.
pub(crate) fn require_grid(system: &AtmosphereSystem, grid: u32) -> Result<GridId, AtmosSimError> {
    let id = GridId(grid);
    if system.has_atmosphere(id) {
        Ok(id)
    } else {
        Err(AtmosSimError::unknown_grid(grid))
    }
}

/// Write `value` through an out-parameter.
pub(crate) fn write_out<T>(out: *mut T, name: &str, value: T) -> Result<(), AtmosSimError> {
    if out.is_null() {
        return Err(AtmosSimError::null_pointer(name));
    }
    // SAFETY: checked non-null above; the caller guarantees it points to writable memory.
    unsafe {
        *out = value;
    }
    Ok(())
}
