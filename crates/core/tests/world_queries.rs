//! Device-facing queries, map fallback, decompression and attached devices

mod common;

use approx::assert_relative_eq;
use atmos_sim_core::gas::constants::{CELL_VOLUME, T20C};
use atmos_sim_core::{
    AtmosAlarmType, AtmosConfig, AtmosEvent, AtmosMonitor, AtmosphereSystem, DeviceId, EntityId, Gas, GasMixture,
    GridId, HeatExchanger, HeatExchangerDevice, MapAtmosphere, MapId, PipeNet, PipeNetId, RecordingObserver,
    Vector2i,
};
use common::{total_moles, walled_room};

const GRID: GridId = GridId(1);

#[test]
fn test_off_grid_tiles_fall_back_to_map() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 2, 2, true);
    system.tick(0.5);
    let far = Vector2i::new(100, 100);

    // the default map background is space
    assert!(system.is_tile_space(Some(GRID), None, far));
    let air = system.get_tile_mixture(Some(GRID), None, far, false).expect("background");
    assert_eq!(air.total_moles(), 0.0);

    system.set_map_atmosphere(MapId(1), MapAtmosphere::with_mixture(GasMixture::standard_air(CELL_VOLUME), false));
    assert!(!system.is_tile_space(Some(GRID), None, far));
    let air = system.get_tile_mixture(Some(GRID), None, far, true).expect("background");
    assert!(air.is_immutable());
    let moles = air.total_moles();
    air.adjust_moles(Gas::Plasma, 50.0);
    let again = system.get_tile_mixture(None, Some(MapId(1)), far, false).expect("background");
    assert_relative_eq!(again.total_moles(), moles);
}

#[test]
fn test_queries_on_grid_tiles() {
    let mut system = AtmosphereSystem::default();
    let interior = walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 3, true);
    system.tick(0.5);
    let centre = Vector2i::new(2, 2);

    assert!(system.has_atmosphere(GRID));
    assert!(!system.has_atmosphere(GridId(9)));
    assert!(!system.is_tile_space(Some(GRID), None, centre));

    let mixtures = system.get_tile_mixtures(Some(GRID), None, &interior, false);
    assert_eq!(mixtures.len(), interior.len());
    assert!(mixtures.iter().all(|m| m.as_ref().is_some_and(|air| air.pressure() > 90.0)));

    // walls hold no air
    assert!(system.get_tile_mixture(Some(GRID), None, Vector2i::new(0, 0), false).is_none());

    let adjacent = system.get_adjacent_tiles(GRID, centre, false);
    assert_eq!(adjacent.len(), 8);
    assert_eq!(system.get_adjacent_tile_mixtures(GRID, centre, false, false).len(), 8);
    let corner = Vector2i::new(1, 1);
    assert_eq!(system.get_adjacent_tiles(GRID, corner, false).len(), 3);
    assert_eq!(system.get_adjacent_tiles(GRID, corner, true).len(), 8);
}

#[test]
fn test_excite_schedules_tile() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 3, 3, true);
    for _ in 0..10 {
        system.tick(0.5);
    }
    let tile = Vector2i::new(2, 2);
    assert!(!system.grid(GRID).expect("grid").is_active(&tile));

    if let Some(air) = system.get_tile_mixture(Some(GRID), None, tile, true) {
        air.adjust_moles(Gas::CarbonDioxide, 40.0);
    }
    let grid = system.grid(GRID).expect("grid");
    assert!(grid.is_active(&tile));
    assert!(grid.is_invalidated(&tile));
}

#[test]
fn test_breach_vents_room_and_reports_decompression() {
    let observer = RecordingObserver::new();
    let log = observer.events();
    let mut system = AtmosphereSystem::new(AtmosConfig::default(), Box::new(observer));
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 4, 4, true);
    system.tick(0.5);
    let before = total_moles(&system, GRID);
    assert!(before > 0.0);

    // knock out a wall in the middle of the west side
    let breach = Vector2i::new(0, 2);
    let wall = system
        .grid(GRID)
        .and_then(|g| {
            (10_001..10_100)
                .map(EntityId)
                .find(|id| g.airtight_entity(*id).is_some_and(|e| e.tile == breach))
        })
        .expect("wall on breach tile");
    system.queue_airtight_removed(GRID, wall);

    for _ in 0..5 {
        system.tick(0.5);
    }

    assert!(total_moles(&system, GRID) < before * 0.01);
    let events = log.lock().expect("event log");
    assert!(events.iter().any(|e| matches!(e, AtmosEvent::Decompression { .. })));
}

#[test]
fn test_monitor_raises_alarm_when_room_vents() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 2, 2, true);
    let monitor = Vector2i::new(1, 1);
    assert!(system.add_atmos_device(GRID, DeviceId(1), Box::new(AtmosMonitor::new(monitor))));
    system.tick(0.5);
    assert_eq!(
        system.device::<AtmosMonitor>(DeviceId(1)).map(AtmosMonitor::state),
        Some(AtmosAlarmType::Normal)
    );

    let empty = GasMixture::new(CELL_VOLUME, T20C);
    for x in 1..=2 {
        for y in 1..=2 {
            system.set_tile_mixture(GRID, Vector2i::new(x, y), &empty);
        }
    }
    system.tick(0.5);
    let state = system.device::<AtmosMonitor>(DeviceId(1)).map(AtmosMonitor::state);
    assert_eq!(state, Some(AtmosAlarmType::Danger));
}

#[test]
fn test_heat_exchanger_moves_gas_between_pipe_nets() {
    let mut system = AtmosphereSystem::default();
    walled_room(&mut system, GRID, Vector2i::new(0, 0), 2, 2, true);
    let (inlet, outlet) = (PipeNetId(1), PipeNetId(2));
    let hot = GasMixture::with_moles(200.0, 600.0, &[(Gas::Nitrogen, 40.0)]);
    assert!(system.add_pipe_net(GRID, inlet, PipeNet::new(hot)));
    assert!(system.add_pipe_net(GRID, outlet, PipeNet::default()));
    let device = HeatExchangerDevice::new(HeatExchanger::default(), inlet, outlet, Vector2i::new(1, 1));
    assert!(system.add_atmos_device(GRID, DeviceId(7), Box::new(device)));

    system.tick(0.5);
    let moved = system
        .device::<HeatExchangerDevice>(DeviceId(7))
        .map_or(0.0, |d| d.last_result().moved_moles);
    assert!(moved > 0.0);

    for _ in 0..4 {
        system.tick(0.5);
    }
    let grid = system.grid(GRID).expect("grid");
    let inlet_moles = grid.pipe_net(inlet).map_or(0.0, |n| n.air.total_moles());
    let outlet_moles = grid.pipe_net(outlet).map_or(0.0, |n| n.air.total_moles());
    assert!(outlet_moles > 0.0);
    assert_relative_eq!(inlet_moles + outlet_moles, 40.0, max_relative = 1e-4);
}
