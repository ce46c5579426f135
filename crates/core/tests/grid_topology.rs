//! Adjacency, doors, structural update queues, split and merge

mod common;

use approx::assert_relative_eq;
use atmos_sim_core::{
    AirtightEntity, AtmosConfig, AtmosDirection, AtmosphereSystem, EntityId, Gas, GridAtmosphere, GridId,
    GridTerrain, MapId, NullObserver, TerrainTile, Vector2i,
};
use common::{oxygen_at, pressure_at, total_moles, vacuum, walled_room};

const GRID: GridId = GridId(1);
const DOOR: EntityId = EntityId(1);

fn assert_adjacency_symmetric(grid: &GridAtmosphere) {
    for (pos, tile) in grid.tiles() {
        for (dir, neighbour) in tile.connected() {
            let other = grid
                .tile(&neighbour)
                .unwrap_or_else(|| panic!("{pos:?} links to missing tile {neighbour:?}"));
            assert_eq!(
                other.adjacent(dir.opposite()),
                Some(*pos),
                "{neighbour:?} does not link back to {pos:?}"
            );
        }
    }
}

/// Three tiles in a row with a closed door in the middle
fn door_corridor() -> (AtmosphereSystem, Vector2i, Vector2i, Vector2i) {
    let mut system = AtmosphereSystem::default();
    let interior = walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 1, false);
    let (left, door, right) = (interior[0], interior[1], interior[2]);
    system.queue_airtight_added(GRID, AirtightEntity::door(DOOR, door, true));
    system.set_tile_mixture(GRID, left, &oxygen_at(200.0));
    system.set_tile_mixture(GRID, right, &vacuum());
    (system, left, door, right)
}

#[test]
fn test_adjacency_is_symmetric_after_changes() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 6, 5, true);
    system.tick(0.5);
    assert_adjacency_symmetric(system.grid(GRID).expect("grid"));

    system.queue_airtight_added(GRID, AirtightEntity::wall(EntityId(500), Vector2i::new(3, 3)));
    system.queue_airtight_removed(GRID, EntityId(10_001));
    system.tick(0.5);
    assert_adjacency_symmetric(system.grid(GRID).expect("grid"));
}

#[test]
fn test_walling_both_corners_cuts_the_diagonal() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 3, false);
    system.tick(0.5);
    let (sealed, across) = (Vector2i::new(1, 1), Vector2i::new(2, 2));
    let grid = system.grid(GRID).expect("grid");
    assert!(grid.tile(&sealed).expect("tile").is_connected(AtmosDirection::NORTH_EAST));

    system.queue_airtight_added(GRID, AirtightEntity::wall(EntityId(900), Vector2i::new(2, 1)));
    system.queue_airtight_added(GRID, AirtightEntity::wall(EntityId(901), Vector2i::new(1, 2)));
    system.tick(0.5);
    let grid = system.grid(GRID).expect("grid");
    assert!(!grid.tile(&sealed).expect("tile").is_connected(AtmosDirection::NORTH_EAST));
    assert!(!grid.tile(&across).expect("tile").is_connected(AtmosDirection::SOUTH_WEST));
    assert_adjacency_symmetric(grid);

    system.set_tile_mixture(GRID, sealed, &oxygen_at(200.0));
    for _ in 0..50 {
        system.tick(0.5);
    }
    assert_eq!(pressure_at(&system, GRID, across), 0.0);
    assert_relative_eq!(pressure_at(&system, GRID, sealed), 200.0, max_relative = 1e-3);

    // opening one corner restores the link
    system.queue_airtight_removed(GRID, EntityId(900));
    system.tick(0.5);
    let grid = system.grid(GRID).expect("grid");
    assert!(grid.tile(&sealed).expect("tile").is_connected(AtmosDirection::NORTH_EAST));
}

#[test]
fn test_closed_door_separates_and_open_door_connects() {
    let (mut system, left, door, right) = door_corridor();

    for _ in 0..5 {
        system.tick(0.5);
    }
    assert_eq!(pressure_at(&system, GRID, right), 0.0);
    assert!(system.is_tile_air_blocked(GRID, door, AtmosDirection::ALL));
    let grid = system.grid(GRID).expect("grid");
    assert!(!grid.tile(&left).expect("left").is_connected(AtmosDirection::EAST));

    system.queue_airtight_toggled(GRID, DOOR, false);
    for _ in 0..20 {
        system.tick(0.5);
    }
    let grid = system.grid(GRID).expect("grid");
    assert!(grid.tile(&left).expect("left").is_connected(AtmosDirection::EAST));
    assert!(!system.is_tile_air_blocked(GRID, door, AtmosDirection::EAST));
    assert!(pressure_at(&system, GRID, right) > 10.0);
}

#[test]
fn test_movement_backlog_is_force_drained() {
    let config = AtmosConfig {
        movement_updates_per_tick: 2,
        movement_backlog_cap: 10,
        ..AtmosConfig::default()
    };
    let mut system = AtmosphereSystem::new(config, Box::new(NullObserver));
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 4, 4, true);
    system.queue_airtight_added(GRID, AirtightEntity::door(DOOR, Vector2i::new(2, 2), false));
    system.tick(0.5);

    for i in 0..5 {
        system.queue_airtight_moved(GRID, DOOR, Vector2i::new(1 + i % 3, 2));
    }
    system.tick(0.5);
    let updates = system.grid(GRID).expect("grid").updates();
    assert_eq!(updates.len(), 3, "under the cap only the budget is drained");
    assert_eq!(updates.force_drains(), 0);

    for i in 0..20 {
        system.queue_airtight_moved(GRID, DOOR, Vector2i::new(1 + i % 3, 3));
    }
    system.tick(0.5);
    let updates = system.grid(GRID).expect("grid").updates();
    assert!(updates.is_empty());
    assert_eq!(updates.force_drains(), 1);
}

#[test]
fn test_priority_updates_are_never_deferred() {
    let config = AtmosConfig {
        movement_updates_per_tick: 0,
        ..AtmosConfig::default()
    };
    let mut system = AtmosphereSystem::new(config, Box::new(NullObserver));
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 3, true);
    system.queue_airtight_moved(GRID, EntityId(10_001), Vector2i::new(9, 9));

    let report = system.tick(0.5);
    let grid = system.grid(GRID).expect("grid");
    // every wall lands, the move waits
    assert_eq!(report.grids[0].updates, 16);
    assert_eq!(grid.updates().len(), 1);
}

#[test]
fn test_split_preserves_mass() {
    let mut system = AtmosphereSystem::default();
    let interior = walled_room(&mut system, GRID, Vector2i::new(0, 0), 6, 3, true);
    system.set_tile_mixture(GRID, interior[0], &oxygen_at(300.0));
    system.tick(0.5);
    let before = total_moles(&system, GRID);

    let moved: Vec<Vector2i> = interior.iter().copied().filter(|p| p.x > 3).collect();
    let count = system.split_grid(GRID, GridId(2), &moved);
    assert_eq!(count, moved.len());

    let after = total_moles(&system, GRID) + total_moles(&system, GridId(2));
    assert_relative_eq!(after, before, max_relative = 1e-5);
    let new_grid = system.grid(GridId(2)).expect("new grid");
    assert_eq!(new_grid.map(), system.grid(GRID).expect("old grid").map());
    for pos in &moved {
        assert!(new_grid.tile(pos).is_some_and(|t| t.is_simulated()));
    }
}

#[test]
fn test_split_tiles_keep_their_fire() {
    let mut system = AtmosphereSystem::default();
    let interior = walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 1, true);
    system.tick(0.5);
    let target = interior[2];
    let mut fuel = oxygen_at(100.0);
    fuel.set_moles(Gas::Plasma, 10.0);
    system.set_tile_mixture(GRID, target, &fuel);
    assert!(system.hotspot_expose(GRID, target, 700.0, 50.0, None, false));

    system.split_grid(GRID, GridId(2), &[target]);
    assert!(!system.is_hotspot_active(GRID, target));
    assert!(system.is_hotspot_active(GridId(2), target));
}

#[test]
fn test_merge_conserves_gas() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 3, true);
    walled_room(&mut system, GridId(2), Vector2i::new(20, 0), 2, 2, true);
    system.tick(0.5);
    let before = total_moles(&system, GRID) + total_moles(&system, GridId(2));

    let merged = system.merge_grids(GRID, GridId(2));
    assert!(merged > 0);
    assert!(system.grid(GridId(2)).is_none());
    assert_relative_eq!(total_moles(&system, GRID), before, max_relative = 1e-5);

    for _ in 0..10 {
        system.tick(0.5);
    }
    assert_relative_eq!(total_moles(&system, GRID), before, max_relative = 1e-4);
    assert_adjacency_symmetric(system.grid(GRID).expect("grid"));
}

#[test]
fn test_merge_moves_air_off_walled_tiles() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 3, true);
    system.tick(0.5);

    // a lone aired tile of the second grid lands on the first grid's west wall
    let overlap = Vector2i::new(0, 2);
    let mut terrain = GridTerrain::new();
    terrain.insert(overlap, TerrainTile::AIRED_FLOOR);
    assert!(system.add_grid(GridId(2), MapId(1), terrain));
    let incoming = total_moles(&system, GridId(2));
    assert!(incoming > 0.0);
    let before = total_moles(&system, GRID) + incoming;

    system.merge_grids(GRID, GridId(2));
    assert_relative_eq!(total_moles(&system, GRID), before, max_relative = 1e-5);

    for _ in 0..10 {
        system.tick(0.5);
    }
    let grid = system.grid(GRID).expect("grid");
    assert!(grid.tile(&overlap).is_some_and(|t| t.air.is_none()));
    assert_relative_eq!(total_moles(&system, GRID), before, max_relative = 1e-4);
}
