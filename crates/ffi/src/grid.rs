//! Grid layout commands: grids, terrain and airtight entities.
//!
//! Structural changes are queued and take effect on the next `atmos_sim_update`.

use atmos_sim_core::{AirtightEntity, EntityId, GridId, GridTerrain, MapId, TerrainTile, Vector2i};

use crate::error::{AtmosSimErrorCode, AtmosSimError};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, require_grid, with_system_mut};
use crate::instance::AtmosSimInstance;

/// Terrain of one tile as seen by engine code
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosTileKind {
    /// Remove the tile from the grid
    None = 0,
    /// Floor that starts empty
    Floor = 1,
    /// Floor that starts with breathable air
    AiredFloor = 2,
    /// Lattice or hull breach open to space
    Space = 3,
}

impl AtmosTileKind {
    fn terrain(self) -> Option<TerrainTile> {
        match self {
            AtmosTileKind::None => None,
            AtmosTileKind::Floor => Some(TerrainTile::FLOOR),
            AtmosTileKind::AiredFloor => Some(TerrainTile::AIRED_FLOOR),
            AtmosTileKind::Space => Some(TerrainTile::SPACE),
        }
    }
}

/// Kind of airtight entity
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosAirtightKind {
    /// Wall: seals every side and removes the tile's air
    Wall = 0,
    /// Door: seals every side while closed, keeps its air
    Door = 1,
}

/// Create a rectangular grid atmosphere covering `min..=max` on both axes.
///
/// Returns `InvalidParameter` if the rectangle is inverted or the grid already exists.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn atmos_sim_add_grid_rect(
    ptr: *const AtmosSimInstance,
    grid: u32,
    map: u32,
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    fill_air: bool,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        if max_x < min_x || max_y < min_y {
            return Err(AtmosSimError::invalid_parameter(
                "max",
                &format!("({max_x}, {max_y}) is below min ({min_x}, {min_y})"),
            ));
        }
        let instance = instance_from_ptr(ptr)?;
        let terrain = GridTerrain::rect(Vector2i::new(min_x, min_y), Vector2i::new(max_x, max_y), fill_air);
        let added = with_system_mut(instance, |system| system.add_grid(GridId(grid), MapId(map), terrain))?;
        if added {
            Ok(())
        } else {
            Err(AtmosSimError::invalid_parameter("grid", "already has an atmosphere"))
        }
    })
}

/// Destroy a grid atmosphere and everything attached to it.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_remove_grid(ptr: *const AtmosSimInstance, grid: u32) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            system
                .remove_grid(GridId(grid))
                .map(|_| ())
                .ok_or_else(|| AtmosSimError::unknown_grid(grid))
        })?
    })
}

/// Queue a terrain change for one tile.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_set_tile_kind(
    ptr: *const AtmosSimInstance,
    grid: u32,
    x: i32,
    y: i32,
    kind: AtmosTileKind,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            system.queue_terrain_changed(id, Vector2i::new(x, y), kind.terrain());
            Ok(())
        })?
    })
}

/// Queue a new airtight entity (wall or door) on a tile.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_add_airtight(
    ptr: *const AtmosSimInstance,
    grid: u32,
    entity: u64,
    x: i32,
    y: i32,
    kind: AtmosAirtightKind,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let tile = Vector2i::new(x, y);
        let airtight = match kind {
            AtmosAirtightKind::Wall => AirtightEntity::wall(EntityId(entity), tile),
            AtmosAirtightKind::Door => AirtightEntity::door(EntityId(entity), tile, true),
        };
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            system.queue_airtight_added(id, airtight);
            Ok(())
        })?
    })
}

/// Queue opening (`airtight == false`) or closing of an airtight entity.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_set_airtight(
    ptr: *const AtmosSimInstance,
    grid: u32,
    entity: u64,
    airtight: bool,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            system.queue_airtight_toggled(id, EntityId(entity), airtight);
            Ok(())
        })?
    })
}

/// Queue a move of an airtight entity to another tile.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_move_airtight(
    ptr: *const AtmosSimInstance,
    grid: u32,
    entity: u64,
    x: i32,
    y: i32,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            system.queue_airtight_moved(id, EntityId(entity), Vector2i::new(x, y));
            Ok(())
        })?
    })
}

/// Queue removal of an airtight entity.
///
/// # Safety
/// `ptr` must be a valid pointer returned by `atmos_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn atmos_sim_remove_airtight(
    ptr: *const AtmosSimInstance,
    grid: u32,
    entity: u64,
) -> AtmosSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_system_mut(instance, |system| {
            let id = require_grid(system, grid)?;
            system.queue_airtight_removed(id, EntityId(entity));
            Ok(())
        })?
    })
}
