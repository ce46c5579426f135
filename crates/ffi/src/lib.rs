//! C ABI for the atmospherics simulation.
//!
//! Engine code creates an [`AtmosSimInstance`] with `atmos_sim_new`, describes
//! its grids and airtight entities, calls `atmos_sim_update` once per frame and
//! reads tiles back with the query functions. Every fallible function returns
//! an [`AtmosSimErrorCode`]; details of the last failure on the calling thread
//! are available from `atmos_sim_get_last_error`.

mod error;
mod fire;
mod grid;
mod helpers;
mod instance;
mod queries;
mod simulation;

pub use error::{atmos_sim_get_last_error, atmos_sim_get_last_error_code, AtmosSimErrorCode};
pub use fire::{atmos_sim_hotspot_expose, atmos_sim_is_hotspot_active, atmos_sim_suppress_fire};
pub use grid::{
    atmos_sim_add_airtight, atmos_sim_add_grid_rect, atmos_sim_move_airtight, atmos_sim_remove_airtight,
    atmos_sim_remove_grid, atmos_sim_set_airtight, atmos_sim_set_tile_kind, AtmosAirtightKind, AtmosTileKind,
};
pub use instance::{atmos_sim_default_settings, atmos_sim_destroy, atmos_sim_new, AtmosSimInstance, AtmosSimSettings};
pub use queries::{
    atmos_sim_get_tile_pressure, atmos_sim_get_tile_stats, atmos_sim_get_tile_temperature, atmos_sim_set_tile_gas,
    atmos_sim_set_tile_temperature, AtmosTileStats, ATMOS_GAS_COUNT,
};
pub use simulation::{atmos_sim_get_tick_stats, atmos_sim_update, AtmosTickStats};

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn new_instance() -> *mut AtmosSimInstance {
        let mut sim = ptr::null_mut();
        let err = unsafe { atmos_sim_new(ptr::null(), &mut sim) };
        assert_eq!(err, AtmosSimErrorCode::Ok);
        assert!(!sim.is_null());
        sim
    }

    #[test]
    fn test_new_rejects_null_out_pointer() {
        let err = unsafe { atmos_sim_new(ptr::null(), ptr::null_mut()) };
        assert_eq!(err, AtmosSimErrorCode::NullPointer);
        assert_eq!(atmos_sim_get_last_error_code(), AtmosSimErrorCode::NullPointer);
    }

    #[test]
    fn test_new_rejects_bad_settings() {
        let settings = AtmosSimSettings {
            cell_volume: 0.0,
            ..atmos_sim_default_settings()
        };
        let mut sim = ptr::null_mut();
        let err = unsafe { atmos_sim_new(&settings, &mut sim) };
        assert_eq!(err, AtmosSimErrorCode::InvalidConfig);
        assert!(sim.is_null());
    }

    #[test]
    fn test_sealed_room_round_trip() {
        let sim = new_instance();
        unsafe {
            assert_eq!(
                atmos_sim_add_grid_rect(sim, 1, 1, 0, 0, 4, 2, false),
                AtmosSimErrorCode::Ok
            );
            let mut entity = 0;
            for x in 0..=4 {
                for y in 0..=2 {
                    if x == 0 || y == 0 || x == 4 || y == 2 {
                        entity += 1;
                        atmos_sim_add_airtight(sim, 1, entity, x, y, AtmosAirtightKind::Wall);
                    }
                }
            }
            atmos_sim_update(sim, 0.5);

            assert_eq!(atmos_sim_set_tile_gas(sim, 1, 1, 1, 0, 200.0), AtmosSimErrorCode::Ok);
            for _ in 0..20 {
                atmos_sim_update(sim, 0.5);
            }

            let mut left = AtmosTileStats::default();
            let mut right = AtmosTileStats::default();
            assert_eq!(atmos_sim_get_tile_stats(sim, 1, 1, 1, &mut left), AtmosSimErrorCode::Ok);
            assert_eq!(atmos_sim_get_tile_stats(sim, 1, 3, 1, &mut right), AtmosSimErrorCode::Ok);
            assert!(right.moles[0] > 0.0);
            assert!((left.pressure - right.pressure).abs() < 1.0);

            let mut stats = AtmosTickStats::default();
            assert_eq!(atmos_sim_get_tick_stats(sim, &mut stats), AtmosSimErrorCode::Ok);
            assert_eq!(stats.tick, 21);
            assert_eq!(stats.grids, 1);

            atmos_sim_destroy(sim);
        }
    }

    #[test]
    fn test_unknown_grid_and_bad_gas_are_reported() {
        let sim = new_instance();
        unsafe {
            let mut pressure = 0.0;
            assert_eq!(
                atmos_sim_get_tile_pressure(sim, 9, 0, 0, &mut pressure),
                AtmosSimErrorCode::UnknownGrid
            );
            assert!(!atmos_sim_get_last_error().is_null());

            atmos_sim_add_grid_rect(sim, 1, 1, 0, 0, 2, 2, true);
            assert_eq!(
                atmos_sim_set_tile_gas(sim, 1, 1, 1, 99, 1.0),
                AtmosSimErrorCode::InvalidParameter
            );
            assert_eq!(
                atmos_sim_get_tile_pressure(sim, 1, 1, 1, &mut pressure),
                AtmosSimErrorCode::Ok
            );
            assert!(pressure > 90.0);
            assert!(atmos_sim_get_last_error().is_null());
            atmos_sim_destroy(sim);
        }
    }

    #[test]
    fn test_fire_through_c_api() {
        let sim = new_instance();
        unsafe {
            atmos_sim_add_grid_rect(sim, 1, 1, 0, 0, 0, 0, false);
            atmos_sim_set_tile_gas(sim, 1, 0, 0, 0, 100.0);
            atmos_sim_set_tile_gas(sim, 1, 0, 0, 3, 10.0);

            let mut burning = false;
            assert_eq!(
                atmos_sim_hotspot_expose(sim, 1, 0, 0, 700.0, 5.0, 0, &mut burning),
                AtmosSimErrorCode::Ok
            );
            assert!(burning);
            let mut active = false;
            atmos_sim_is_hotspot_active(sim, 1, 0, 0, &mut active);
            assert!(active);

            assert_eq!(atmos_sim_suppress_fire(sim, 1, 0, 0, 100.0), AtmosSimErrorCode::Ok);
            atmos_sim_is_hotspot_active(sim, 1, 0, 0, &mut active);
            assert!(!active);
            atmos_sim_destroy(sim);
        }
    }
}
