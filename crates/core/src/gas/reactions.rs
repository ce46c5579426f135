//! Gas reaction engine
//!
//! Reactions are checked in priority order against a single mixture. Each one
//! burns reactants, adds products and releases energy into the mixture's
//! temperature. Thresholds and energies come from [`FireConfig`].

use crate::config::FireConfig;
use crate::gas::constants::MINIMUM_HEAT_CAPACITY;
use crate::gas::mixture::GasMixture;
use crate::gas::species::{Gas, GasCatalog};
use bitflags::bitflags;
use tracing::trace;

bitflags! {
    /// Flag set describing what happened during a [`react`] call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ReactionResult: u8 {
        /// At least one reaction changed the mixture
        const REACTING = 1;
        /// Skip the remaining reactions for this call
        const STOP_REACTIONS = 2;
    }
}

impl ReactionResult {
    pub const NO_REACTION: Self = Self::empty();

    #[inline]
    pub const fn is_reacting(self) -> bool {
        self.contains(Self::REACTING)
    }
}

/// Reactions known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GasReaction {
    PlasmaFire,
    TritiumFire,
}

impl GasReaction {
    /// Reactions in the order they are attempted
    pub const PRIORITY: [GasReaction; 2] = [GasReaction::PlasmaFire, GasReaction::TritiumFire];

    /// Lowest mixture temperature at which this reaction runs (K)
    pub fn minimum_temperature(self, fire: &FireConfig) -> f32 {
        match self {
            GasReaction::PlasmaFire | GasReaction::TritiumFire => fire.ignition_temperature,
        }
    }

    /// Gases that must each be present above `minimum_reactant_moles`
    pub const fn reactants(self) -> &'static [Gas] {
        match self {
            GasReaction::PlasmaFire => &[Gas::Plasma, Gas::Oxygen],
            GasReaction::TritiumFire => &[Gas::Tritium, Gas::Oxygen],
        }
    }

    /// Whether the mixture meets temperature and reactant requirements
    pub fn can_react(self, mixture: &GasMixture, fire: &FireConfig) -> bool {
        mixture.temperature() >= self.minimum_temperature(fire)
            && self
                .reactants()
                .iter()
                .all(|&gas| mixture.get_moles(gas) >= fire.minimum_reactant_moles)
    }

    fn apply(self, mixture: &mut GasMixture, fire: &FireConfig, catalog: &GasCatalog) -> ReactionResult {
        match self {
            GasReaction::PlasmaFire => plasma_fire(mixture, fire, catalog),
            GasReaction::TritiumFire => tritium_fire(mixture, fire, catalog),
        }
    }
}

/// Run every applicable reaction on `mixture`.
///
/// Immutable mixtures never react. The amount of fuel burned is available
/// afterwards through [`GasMixture::fire_reaction_amount`].
pub fn react(mixture: &mut GasMixture, fire: &FireConfig, catalog: &GasCatalog) -> ReactionResult {
    if mixture.is_immutable() {
        return ReactionResult::NO_REACTION;
    }
    mixture.reset_reaction_results();

    let mut result = ReactionResult::NO_REACTION;
    for reaction in GasReaction::PRIORITY {
        if !reaction.can_react(mixture, fire) {
            continue;
        }
        result |= reaction.apply(mixture, fire, catalog);
        if result.contains(ReactionResult::STOP_REACTIONS) {
            break;
        }
    }
    result
}

fn plasma_fire(mixture: &mut GasMixture, fire: &FireConfig, catalog: &GasCatalog) -> ReactionResult {
    let old_heat_capacity = mixture.heat_capacity(catalog);
    let temperature = mixture.temperature();

    // Hotter fires burn more plasma per tick
    let temperature_scale = if temperature > fire.plasma_upper_temperature {
        1.0
    } else {
        (temperature - fire.ignition_temperature)
            / (fire.plasma_upper_temperature - fire.ignition_temperature)
    };
    if temperature_scale <= 0.0 {
        return ReactionResult::NO_REACTION;
    }

    let oxygen = mixture.get_moles(Gas::Oxygen);
    let plasma = mixture.get_moles(Gas::Plasma);
    let oxygen_burn_rate = fire.oxygen_burn_rate_base - temperature_scale;

    let supersaturation = ((oxygen / plasma - fire.supersaturation_threshold)
        / (fire.supersaturation_ends - fire.supersaturation_threshold))
        .clamp(0.0, 1.0);

    let mut plasma_burn_rate = if oxygen > plasma * fire.plasma_oxygen_fullburn {
        plasma * temperature_scale / fire.plasma_burn_rate_delta
    } else {
        temperature_scale * (oxygen / fire.plasma_oxygen_fullburn) / fire.plasma_burn_rate_delta
    };
    if plasma_burn_rate <= MINIMUM_HEAT_CAPACITY {
        return ReactionResult::NO_REACTION;
    }
    plasma_burn_rate = plasma_burn_rate.min(plasma).min(oxygen / oxygen_burn_rate);

    mixture.adjust_moles(Gas::Plasma, -plasma_burn_rate);
    mixture.adjust_moles(Gas::Oxygen, -plasma_burn_rate * oxygen_burn_rate);
    mixture.adjust_moles(Gas::Tritium, plasma_burn_rate * supersaturation);
    mixture.adjust_moles(Gas::CarbonDioxide, plasma_burn_rate * (1.0 - supersaturation));
    mixture.add_fire_reaction_amount(plasma_burn_rate * (1.0 + oxygen_burn_rate));

    release_energy(
        mixture,
        catalog,
        old_heat_capacity,
        fire.fire_plasma_energy_released * plasma_burn_rate,
    );
    trace!(burned = plasma_burn_rate, temperature = mixture.temperature(), "plasma fire");
    ReactionResult::REACTING
}

fn tritium_fire(mixture: &mut GasMixture, fire: &FireConfig, catalog: &GasCatalog) -> ReactionResult {
    let old_heat_capacity = mixture.heat_capacity(catalog);
    let oxygen = mixture.get_moles(Gas::Oxygen);
    let tritium = mixture.get_moles(Gas::Tritium);

    let burned = tritium.min(oxygen * 2.0) / fire.tritium_burn_rate_delta;
    if burned <= 0.0 {
        return ReactionResult::NO_REACTION;
    }

    mixture.adjust_moles(Gas::Tritium, -burned);
    mixture.adjust_moles(Gas::Oxygen, -burned * 0.5);
    mixture.adjust_moles(Gas::WaterVapor, burned);
    mixture.add_fire_reaction_amount(burned);

    release_energy(
        mixture,
        catalog,
        old_heat_capacity,
        fire.fire_hydrogen_energy_released * burned,
    );
    trace!(burned, temperature = mixture.temperature(), "tritium fire");
    ReactionResult::REACTING
}

fn release_energy(mixture: &mut GasMixture, catalog: &GasCatalog, old_heat_capacity: f32, energy: f32) {
    if energy <= 0.0 {
        return;
    }
    let new_heat_capacity = mixture.heat_capacity(catalog);
    if new_heat_capacity > MINIMUM_HEAT_CAPACITY {
        let temperature = mixture.temperature();
        mixture.set_temperature((temperature * old_heat_capacity + energy) / new_heat_capacity);
    }
}
