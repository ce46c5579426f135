//! Atmos devices and pipe nets
//!
//! Devices are the only gameplay code that runs inside the tick. They are
//! owned by the [`AtmosphereSystem`](crate::simulation::AtmosphereSystem),
//! attached to a grid by id, and updated after the gas passes through the
//! same query API any other collaborator uses.

pub mod heat_exchanger;
pub mod monitor;

pub use heat_exchanger::{HeatExchangeResult, HeatExchanger, HeatExchangerDevice};
pub use monitor::{AlarmThresholds, AtmosAlarmType, AtmosMonitor};

use crate::config::AtmosConfig;
use crate::core_types::GridId;
use crate::gas::constants::T20C;
use crate::gas::GasMixture;
use crate::simulation::query::AtmosWorld;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Default volume of one pipe net (L)
pub const DEFAULT_PIPE_VOLUME: f32 = 200.0;

/// Gas held by a connected run of pipes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeNet {
    pub air: GasMixture,
}

impl PipeNet {
    pub fn new(air: GasMixture) -> Self {
        Self { air }
    }

    #[inline]
    pub fn pressure(&self) -> f32 {
        self.air.pressure()
    }
}

impl Default for PipeNet {
    fn default() -> Self {
        Self::new(GasMixture::new(DEFAULT_PIPE_VOLUME, T20C))
    }
}

/// What a device sees during its update
pub struct DeviceContext<'a> {
    /// Grid the device is attached to
    pub grid: GridId,
    /// Seconds since the previous tick
    pub dt: f32,
    pub world: &'a mut AtmosWorld,
}

impl DeviceContext<'_> {
    pub fn config(&self) -> &AtmosConfig {
        self.world.config()
    }
}

/// A device updated once per tick after the gas passes
pub trait AtmosDevice: Send {
    fn update(&mut self, ctx: &mut DeviceContext<'_>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::Gas;

    #[test]
    fn test_default_pipe_net_is_empty() {
        let net = PipeNet::default();
        assert_eq!(net.air.total_moles(), 0.0);
        assert_eq!(net.air.volume(), DEFAULT_PIPE_VOLUME);
    }

    #[test]
    fn test_pipe_net_pressure_follows_air() {
        let mut net = PipeNet::default();
        net.air.set_moles(Gas::Nitrogen, 10.0);
        assert!(net.pressure() > 0.0);
    }
}
