//! Air alarm style monitor
//!
//! Reads the air on its tile once per tick, without exciting it, and classifies
//! pressure and temperature against configurable thresholds.

use crate::core_types::Vector2i;
use crate::devices::{AtmosDevice, DeviceContext};
use crate::gas::constants::{ONE_ATMOSPHERE, T0C};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::debug;

/// Alarm severity, ordered from harmless to dangerous
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AtmosAlarmType {
    #[default]
    Normal,
    Warning,
    Danger,
}

/// Bounds for one monitored quantity.
///
/// Values outside `lower_bound..=upper_bound` are dangerous; values outside
/// the warning band but inside the bounds raise a warning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmThresholds {
    pub lower_bound: f32,
    pub upper_bound: f32,
    pub lower_warning: f32,
    pub upper_warning: f32,
}

impl AlarmThresholds {
    /// Breathable station pressure (kPa)
    pub fn station_pressure() -> Self {
        Self {
            lower_bound: 20.0,
            upper_bound: 550.0,
            lower_warning: ONE_ATMOSPHERE * 0.5,
            upper_warning: ONE_ATMOSPHERE * 3.8,
        }
    }

    /// Comfortable station temperature (K)
    pub fn station_temperature() -> Self {
        Self {
            lower_bound: T0C - 80.0,
            upper_bound: T0C + 100.0,
            lower_warning: T0C,
            upper_warning: T0C + 45.0,
        }
    }

    pub fn classify(&self, value: f32) -> AtmosAlarmType {
        if !value.is_finite() || value < self.lower_bound || value > self.upper_bound {
            AtmosAlarmType::Danger
        } else if value < self.lower_warning || value > self.upper_warning {
            AtmosAlarmType::Warning
        } else {
            AtmosAlarmType::Normal
        }
    }
}

/// Monitor watching a single tile of the grid it is attached to
#[derive(Debug, Clone)]
pub struct AtmosMonitor {
    pub tile: Vector2i,
    pub pressure_thresholds: AlarmThresholds,
    pub temperature_thresholds: AlarmThresholds,
    state: AtmosAlarmType,
    pressure: f32,
    temperature: f32,
}

impl AtmosMonitor {
    pub fn new(tile: Vector2i) -> Self {
        Self {
            tile,
            pressure_thresholds: AlarmThresholds::station_pressure(),
            temperature_thresholds: AlarmThresholds::station_temperature(),
            state: AtmosAlarmType::Normal,
            pressure: 0.0,
            temperature: 0.0,
        }
    }

    /// Worst classification seen by the last update
    pub fn state(&self) -> AtmosAlarmType {
        self.state
    }

    /// Last pressure read (kPa)
    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    /// Last temperature read (K)
    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

impl AtmosDevice for AtmosMonitor {
    fn update(&mut self, ctx: &mut DeviceContext<'_>) {
        let map = ctx.world.grid(ctx.grid).map(crate::grid::GridAtmosphere::map);
        let (pressure, temperature) = ctx
            .world
            .get_tile_mixture(Some(ctx.grid), map, self.tile, false)
            .map_or((0.0, 0.0), |air| (air.pressure(), air.temperature()));
        self.pressure = pressure;
        self.temperature = temperature;

        let state = self
            .pressure_thresholds
            .classify(pressure)
            .max(self.temperature_thresholds.classify(temperature));
        if state != self.state {
            debug!(grid = %ctx.grid, tile = ?self.tile, ?state, pressure, temperature, "Monitor state changed");
        }
        self.state = state;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
