use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// A failed FFI call: the code handed back to C plus a diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AtmosSimError {
    code: AtmosSimErrorCode,
    msg: String,
}

impl AtmosSimError {
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: AtmosSimErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: AtmosSimErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    pub fn invalid_parameter(param_name: &str, message: &str) -> Self {
        Self {
            code: AtmosSimErrorCode::InvalidParameter,
            msg: format!("Parameter {param_name}: {message}"),
        }
    }

    pub fn unknown_grid(grid: u32) -> Self {
        Self {
            code: AtmosSimErrorCode::UnknownGrid,
            msg: format!("Grid {grid} has no atmosphere"),
        }
    }

    pub fn unknown_tile(grid: u32, x: i32, y: i32) -> Self {
        Self {
            code: AtmosSimErrorCode::UnknownTile,
            msg: format!("Tile ({x}, {y}) of grid {grid} holds no simulated air"),
        }
    }

    pub fn invalid_config(message: &str) -> Self {
        Self {
            code: AtmosSimErrorCode::InvalidConfig,
            msg: format!("Invalid configuration: {message}"),
        }
    }

    pub fn code(&self) -> AtmosSimErrorCode {
        self.code
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by atmosphere simulation functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosSimErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function.
    InvalidParameter = 3,

    /// The grid id has no atmosphere.
    UnknownGrid = 4,

    /// The tile is not a simulated tile of the grid (wall, space or off-grid).
    UnknownTile = 5,

    /// The configuration failed validation.
    InvalidConfig = 6,
}

thread_local! {
    /// Most recent FFI error on this thread (C string, error code).
    /// The CString is kept here so the pointer handed out stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, AtmosSimErrorCode)> = const { RefCell::new((None, AtmosSimErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, AtmosSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, AtmosSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string,
/// or null if the last call succeeded.
///
/// Errors are stored per thread. The pointer stays valid until the next FFI
/// call on this thread that sets or clears the error. **DO NOT FREE THIS POINTER**.
#[no_mangle]
pub extern "C" fn atmos_sim_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code (`Ok` if the last call succeeded).
#[no_mangle]
pub extern "C" fn atmos_sim_get_last_error_code() -> AtmosSimErrorCode {
    with_last_error(|(_cstring, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{clear_last_error, track_error};
    use std::ffi::CStr;

    #[test]
    fn test_track_error_sets_message_and_code() {
        let code = track_error(&AtmosSimError::unknown_grid(7));
        assert_eq!(code, AtmosSimErrorCode::UnknownGrid);
        assert_eq!(atmos_sim_get_last_error_code(), AtmosSimErrorCode::UnknownGrid);

        let msg = atmos_sim_get_last_error();
        assert!(!msg.is_null());
        let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
        assert_eq!(text, "Grid 7 has no atmosphere");

        clear_last_error();
        assert!(atmos_sim_get_last_error().is_null());
        assert_eq!(atmos_sim_get_last_error_code(), AtmosSimErrorCode::Ok);
    }

    #[test]
    fn test_each_constructor_maps_to_its_code() {
        let cases = [
            (AtmosSimError::null_pointer("ptr"), AtmosSimErrorCode::NullPointer),
            (AtmosSimError::lock_poisoned("RwLock"), AtmosSimErrorCode::LockPoisoned),
            (AtmosSimError::invalid_parameter("gas", "out of range"), AtmosSimErrorCode::InvalidParameter),
            (AtmosSimError::unknown_grid(3), AtmosSimErrorCode::UnknownGrid),
            (AtmosSimError::unknown_tile(3, 1, 2), AtmosSimErrorCode::UnknownTile),
            (AtmosSimError::invalid_config("dt"), AtmosSimErrorCode::InvalidConfig),
        ];
        for (error, code) in cases {
            assert_eq!(error.code(), code);
            assert!(!error.msg().is_empty());
        }
    }
}
