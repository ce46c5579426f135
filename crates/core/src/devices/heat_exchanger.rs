//! Closed-form heat exchanger
//!
//! A heat exchanger moves gas from an inlet pipe to an outlet pipe while the
//! parcel in transit trades heat with the surrounding tile. Flow, convection
//! and radiation are each solved analytically over the whole tick instead of
//! being stepped, so the result stays stable for any `dt`:
//!
//! 1. Flow. The pressure gap decays as `dP' = dP·e^(-k·dt)` with
//!    `k = G·R·T·(1/V_in + 1/V_out)`; the moles that closed the gap leave the
//!    inlet as one parcel.
//! 2. Convection. The gap between parcel and environment decays as
//!    `ΔT' = ΔT·e^(-K·(1/C_p + 1/C_env)·dt)`.
//! 3. Radiation towards the environment (or the cosmic background) follows the
//!    quartic solution `ΔT' = ΔT / cbrt(1 + 3·a·|ΔT|³·dt)`.
//! 4. The parcel joins the outlet.

use crate::core_types::{PipeNetId, Vector2i};
use crate::devices::{AtmosDevice, DeviceContext};
use crate::gas::constants::{MINIMUM_HEAT_CAPACITY, R_IDEAL_GAS_EQUATION, TCMB};
use crate::gas::{GasCatalog, GasMixture};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::trace;

/// Stefan-Boltzmann constant (W/(m²·K⁴))
pub const STEFAN_BOLTZMANN: f32 = 5.670_374e-8;

/// Exchanger coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatExchanger {
    /// Flow conductance G (mol/(s·kPa))
    pub conductance: f32,
    /// Convective coefficient K (W/K)
    pub convection_coefficient: f32,
    /// Emissivity times σ times area (W/K⁴)
    pub radiation_coefficient: f32,
}

impl Default for HeatExchanger {
    fn default() -> Self {
        Self {
            conductance: 0.01,
            convection_coefficient: 15.0,
            radiation_coefficient: 0.9 * STEFAN_BOLTZMANN * 2.0,
        }
    }
}

/// What one exchange did
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HeatExchangeResult {
    /// Moles moved from inlet to outlet
    pub moved_moles: f32,
    /// Heat given by the parcel to the environment through convection (J)
    pub convected_heat: f32,
    /// Heat radiated by the parcel (J)
    pub radiated_heat: f32,
}

impl HeatExchanger {
    /// Run one exchange over `dt` seconds.
    ///
    /// `environment` is the tile air around the exchanger. An immutable
    /// environment acts as an infinite reservoir; with no environment the
    /// parcel only radiates towards the cosmic background.
    pub fn process(
        &self,
        inlet: &mut GasMixture,
        outlet: &mut GasMixture,
        mut environment: Option<&mut GasMixture>,
        dt: f32,
        catalog: &GasCatalog,
    ) -> HeatExchangeResult {
        let mut result = HeatExchangeResult::default();
        if dt.is_nan() || dt <= 0.0 || inlet.is_immutable() {
            return result;
        }

        let mut parcel = self.flow(inlet, outlet, dt);
        result.moved_moles = parcel.total_moles();
        if result.moved_moles <= 0.0 {
            return result;
        }

        let parcel_capacity = parcel.heat_capacity(catalog);
        if parcel_capacity > MINIMUM_HEAT_CAPACITY {
            result.convected_heat =
                self.convect(&mut parcel, parcel_capacity, environment.as_deref_mut(), dt, catalog);
            let parcel_capacity = parcel.heat_capacity(catalog);
            result.radiated_heat = self.radiate(&mut parcel, parcel_capacity, environment, dt, catalog);
        }

        outlet.merge(&parcel, catalog);
        result
    }

    /// Remove the parcel that flows from inlet to outlet during `dt`
    fn flow(&self, inlet: &mut GasMixture, outlet: &GasMixture, dt: f32) -> GasMixture {
        let delta_pressure = inlet.pressure() - outlet.pressure();
        if delta_pressure <= 0.0 || self.conductance <= 0.0 {
            return GasMixture::new(inlet.volume(), inlet.temperature());
        }
        let inverse_volumes = 1.0 / inlet.volume() + 1.0 / outlet.volume();
        let rt = R_IDEAL_GAS_EQUATION * inlet.temperature();
        let k = self.conductance * rt * inverse_volumes;
        let remaining = delta_pressure * (-k * dt).exp();
        let moles = ((delta_pressure - remaining) / (rt * inverse_volumes)).min(inlet.total_moles());
        inlet.remove(moles)
    }

    /// Exchange heat between parcel and environment. Returns the heat the parcel lost.
    fn convect(
        &self,
        parcel: &mut GasMixture,
        parcel_capacity: f32,
        environment: Option<&mut GasMixture>,
        dt: f32,
        catalog: &GasCatalog,
    ) -> f32 {
        let Some(environment) = environment else {
            return 0.0;
        };
        if self.convection_coefficient <= 0.0 || environment.total_moles() <= 0.0 {
            return 0.0;
        }
        let Some(inverse_environment) = inverse_capacity(environment, catalog) else {
            return 0.0;
        };

        let t_div_q = 1.0 / parcel_capacity + inverse_environment;
        let gap = parcel.temperature() - environment.temperature();
        let new_gap = gap * (-self.convection_coefficient * t_div_q * dt).exp();
        let heat = (gap - new_gap) / t_div_q;
        apply_heat(parcel, environment, parcel_capacity, heat, catalog);
        heat
    }

    /// Radiate towards the environment temperature. Returns the heat the parcel lost.
    fn radiate(
        &self,
        parcel: &mut GasMixture,
        parcel_capacity: f32,
        environment: Option<&mut GasMixture>,
        dt: f32,
        catalog: &GasCatalog,
    ) -> f32 {
        if self.radiation_coefficient <= 0.0 || parcel_capacity <= MINIMUM_HEAT_CAPACITY {
            return 0.0;
        }
        let target = environment.as_ref().map_or(TCMB, |env| env.temperature());
        let inverse_environment = environment
            .as_ref()
            .and_then(|env| inverse_capacity(env, catalog))
            .unwrap_or(0.0);

        let t_div_q = f64::from(1.0 / parcel_capacity + inverse_environment);
        let gap = f64::from(parcel.temperature() - target);
        let a = f64::from(self.radiation_coefficient) * t_div_q;
        let new_gap = gap / (1.0 + 3.0 * a * gap.abs().powi(3) * f64::from(dt)).cbrt();
        let heat = ((gap - new_gap) / t_div_q) as f32;

        match environment {
            Some(env) => apply_heat(parcel, env, parcel_capacity, heat, catalog),
            None => parcel.set_temperature(parcel.temperature() - heat / parcel_capacity),
        }
        heat
    }
}

/// `1/C` of the environment: zero for an immutable reservoir, `None` when it
/// holds too little gas to take heat
fn inverse_capacity(environment: &GasMixture, catalog: &GasCatalog) -> Option<f32> {
    if environment.is_immutable() {
        return Some(0.0);
    }
    let capacity = environment.heat_capacity(catalog);
    (capacity > MINIMUM_HEAT_CAPACITY).then(|| 1.0 / capacity)
}

fn apply_heat(parcel: &mut GasMixture, environment: &mut GasMixture, parcel_capacity: f32, heat: f32, catalog: &GasCatalog) {
    parcel.set_temperature(parcel.temperature() - heat / parcel_capacity);
    if !environment.is_immutable() {
        let capacity = environment.heat_capacity(catalog);
        if capacity > MINIMUM_HEAT_CAPACITY {
            environment.set_temperature(environment.temperature() + heat / capacity);
        }
    }
}

// ----------------------------------------------------------------------
// Device wrapper
// ----------------------------------------------------------------------

/// Heat exchanger between two pipe nets of one grid, sitting on `tile`
#[derive(Debug, Clone)]
pub struct HeatExchangerDevice {
    pub exchanger: HeatExchanger,
    pub inlet: PipeNetId,
    pub outlet: PipeNetId,
    pub tile: Vector2i,
    last: HeatExchangeResult,
}

impl HeatExchangerDevice {
    pub fn new(exchanger: HeatExchanger, inlet: PipeNetId, outlet: PipeNetId, tile: Vector2i) -> Self {
        Self {
            exchanger,
            inlet,
            outlet,
            tile,
            last: HeatExchangeResult::default(),
        }
    }

    /// Result of the most recent update
    pub fn last_result(&self) -> HeatExchangeResult {
        self.last
    }
}

impl AtmosDevice for HeatExchangerDevice {
    fn update(&mut self, ctx: &mut DeviceContext<'_>) {
        self.last = HeatExchangeResult::default();
        if self.inlet == self.outlet {
            return;
        }
        let dt = ctx.dt;
        let Some((grid, config)) = ctx.world.grid_with_config(ctx.grid) else {
            return;
        };
        let (Some(inlet), Some(outlet)) = (grid.pipe_net(self.inlet), grid.pipe_net(self.outlet)) else {
            return;
        };
        let mut inlet_air = inlet.air.clone();
        let mut outlet_air = outlet.air.clone();

        let environment = grid
            .tile_mut(&self.tile)
            .filter(|tile| tile.is_simulated())
            .and_then(|tile| tile.air.as_mut());
        self.last = self
            .exchanger
            .process(&mut inlet_air, &mut outlet_air, environment, dt, &config.gases);

        if let Some(net) = grid.pipe_net_mut(self.inlet) {
            net.air = inlet_air;
        }
        if let Some(net) = grid.pipe_net_mut(self.outlet) {
            net.air = outlet_air;
        }
        if self.last.convected_heat.abs() > 0.0 || self.last.radiated_heat.abs() > 0.0 {
            grid.activate(self.tile);
        }
        trace!(grid = %ctx.grid, moved = self.last.moved_moles, "Heat exchanger update");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
