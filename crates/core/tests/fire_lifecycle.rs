//! Hotspot ignition, burning, extinguishing and re-ignition

mod common;

use atmos_sim_core::gas::constants::{CELL_VOLUME, T20C};
use atmos_sim_core::{
    AirtightEntity, AtmosConfig, AtmosEvent, AtmosphereSystem, EntityId, Gas, GasMixture, GridId, RecordingObserver,
    Vector2i,
};
use common::walled_room;

const GRID: GridId = GridId(1);

fn burnable(temperature: f32) -> GasMixture {
    GasMixture::with_moles(CELL_VOLUME, temperature, &[(Gas::Oxygen, 100.0), (Gas::Plasma, 10.0)])
}

/// A sealed single-tile room holding a plasma and oxygen mix
fn fuel_cell(observer: RecordingObserver) -> (AtmosphereSystem, Vector2i) {
    let mut system = AtmosphereSystem::new(AtmosConfig::default(), Box::new(observer));
    let tile = walled_room(&mut system, GRID, Vector2i::new(0, 0), 1, 1, false)[0];
    assert!(system.set_tile_mixture(GRID, tile, &burnable(T20C)));
    (system, tile)
}

/// A sealed 5x1 corridor filled with a plasma and oxygen mix, optionally split by `barrier`
fn fuel_corridor(observer: RecordingObserver, barrier: Option<AirtightEntity>) -> (AtmosphereSystem, Vec<Vector2i>) {
    let mut system = AtmosphereSystem::new(AtmosConfig::default(), Box::new(observer));
    let tiles = walled_room(&mut system, GRID, Vector2i::new(0, 0), 5, 1, false);
    if let Some(barrier) = barrier {
        system.queue_airtight_added(GRID, barrier);
    }
    system.tick(0.5);
    for &tile in &tiles {
        system.set_tile_mixture(GRID, tile, &burnable(T20C));
    }
    (system, tiles)
}

fn ignited_at(events: &[AtmosEvent], at: Vector2i) -> bool {
    events
        .iter()
        .any(|e| matches!(e, AtmosEvent::HotspotIgnited { tile, .. } if *tile == at))
}

fn count(events: &[AtmosEvent], pred: impl Fn(&AtmosEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

#[test]
fn test_hotspot_lifecycle() {
    let observer = RecordingObserver::new();
    let log = observer.events();
    let (mut system, tile) = fuel_cell(observer);

    assert!(system.hotspot_expose(GRID, tile, 600.0, 100.0, None, false));
    assert!(system.is_hotspot_active(GRID, tile));

    // vent the hot air and refill with a cold mix; the flame takes the air temperature
    assert!(system.set_tile_mixture(GRID, tile, &burnable(150.0)));
    for _ in 0..3 {
        system.tick(0.5);
    }
    assert!(!system.is_hotspot_active(GRID, tile));
    let hotspot = &system.grid(GRID).and_then(|g| g.tile(&tile)).expect("tile").hotspot;
    assert!(!hotspot.valid);
    assert_eq!(hotspot.volume, 0.0);

    assert!(system.hotspot_expose(GRID, tile, 600.0, 100.0, None, false));
    assert!(system.is_hotspot_active(GRID, tile));

    let events = log.lock().expect("event log");
    assert_eq!(count(&events, |e| matches!(e, AtmosEvent::HotspotIgnited { .. })), 2);
    assert_eq!(count(&events, |e| matches!(e, AtmosEvent::HotspotExtinguished { .. })), 1);
}

#[test]
fn test_cold_exposure_does_not_ignite() {
    let (mut system, tile) = fuel_cell(RecordingObserver::new());
    assert!(!system.hotspot_expose(GRID, tile, T20C, 100.0, None, false));
    system.tick(0.5);
    assert!(!system.is_hotspot_active(GRID, tile));
}

#[test]
fn test_fire_burns_plasma_and_reports_fire_act() {
    let observer = RecordingObserver::new();
    let log = observer.events();
    let (mut system, tile) = fuel_cell(observer);
    let plasma = |system: &AtmosphereSystem| {
        system
            .grid(GRID)
            .and_then(|g| g.tile(&tile))
            .and_then(|t| t.air.as_ref())
            .map_or(0.0, |air| air.get_moles(Gas::Plasma))
    };

    assert!(system.hotspot_expose(GRID, tile, 700.0, 5.0, None, false));
    let first = system.tick(0.5);
    assert_eq!(first.hotspots(), 1, "ignition tick only arms the hotspot");
    assert_eq!(plasma(&system), 10.0);

    system.tick(0.5);
    assert!(plasma(&system) < 10.0);
    let events = log.lock().expect("event log");
    assert!(count(&events, |e| matches!(e, AtmosEvent::FireAct { .. })) >= 1);
}

#[test]
fn test_hot_volatile_air_ignites_itself() {
    let (mut system, tile) = fuel_cell(RecordingObserver::new());
    assert!(system.set_tile_mixture(GRID, tile, &burnable(1000.0)));

    system.tick(0.5);
    assert!(system.is_hotspot_active(GRID, tile));
}

#[test]
fn test_suppression_cools_and_extinguishes() {
    let (mut system, tile) = fuel_cell(RecordingObserver::new());
    system.hotspot_expose(GRID, tile, 700.0, 5.0, None, false);
    let before = system
        .get_tile_mixture(Some(GRID), None, tile, false)
        .map_or(0.0, |air| air.temperature());

    assert!(system.suppress_fire(GRID, tile, 50.0));
    assert!(!system.is_hotspot_active(GRID, tile));
    let after = system
        .get_tile_mixture(Some(GRID), None, tile, false)
        .map_or(0.0, |air| air.temperature());
    assert!(after < before);
    assert!(!system.suppress_fire(GRID, tile, 50.0), "nothing left to put out");
}

#[test]
fn test_burning_tile_stays_active() {
    let (mut system, tiles) = fuel_corridor(RecordingObserver::new(), None);
    let origin = tiles[0];
    assert!(system.hotspot_expose(GRID, origin, 700.0, 5.0, None, false));

    system.tick(0.5);
    assert!(system.is_hotspot_active(GRID, origin));
    assert!(system.grid(GRID).expect("grid").is_active(&origin));
    for _ in 0..5 {
        system.tick(0.5);
        if system.is_hotspot_active(GRID, origin) {
            assert!(system.grid(GRID).expect("grid").is_active(&origin));
        }
    }
}

#[test]
fn test_fire_spreads_along_corridor() {
    let observer = RecordingObserver::new();
    let log = observer.events();
    let (mut system, tiles) = fuel_corridor(observer, None);
    assert!(system.hotspot_expose(GRID, tiles[0], 1000.0, 50.0, None, false));

    for _ in 0..40 {
        system.tick(0.5);
    }
    let events = log.lock().expect("event log");
    assert!(ignited_at(&events, tiles[1]));
    assert!(count(&events, |e| matches!(e, AtmosEvent::HotspotIgnited { .. })) >= 2);
}

fn assert_barrier_stops_fire(barrier: AirtightEntity) {
    let observer = RecordingObserver::new();
    let log = observer.events();
    let blocked = barrier.tile;
    let (mut system, tiles) = fuel_corridor(observer, Some(barrier));
    assert!(system.hotspot_expose(GRID, tiles[0], 1000.0, 50.0, None, false));

    for _ in 0..40 {
        system.tick(0.5);
    }
    let far_side: Vec<Vector2i> = tiles.iter().copied().filter(|t| t.x > blocked.x).collect();
    let events = log.lock().expect("event log");
    for tile in far_side {
        assert!(!ignited_at(&events, tile), "fire crossed to {tile:?}");
        assert!(!system.is_hotspot_active(GRID, tile));
        let plasma = system
            .get_tile_mixture(Some(GRID), None, tile, false)
            .map_or(0.0, |air| air.get_moles(Gas::Plasma));
        assert!((plasma - 10.0).abs() < 1e-3);
    }
}

#[test]
fn test_wall_stops_fire_spread() {
    assert_barrier_stops_fire(AirtightEntity::wall(EntityId(900), Vector2i::new(3, 1)));
}

#[test]
fn test_closed_door_stops_fire_spread() {
    assert_barrier_stops_fire(AirtightEntity::door(EntityId(900), Vector2i::new(3, 1), true));
}
