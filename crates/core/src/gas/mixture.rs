//! Gas mixture value type
//!
//! A [`GasMixture`] is a bag of per-species mole counts plus a volume and a
//! temperature. Pressure and heat capacity are always derived on demand so they
//! can never drift out of sync with the mole counts.
//!
//! Mixtures flagged immutable (map background, space) are never changed in place:
//! every mutator silently does nothing, and operations that take gas *out* of an
//! immutable mixture hand back a copy of its contribution instead.

use crate::config::FireConfig;
use crate::gas::constants::{
    CELL_VOLUME, GAS_MIN_MOLES, MINIMUM_HEAT_CAPACITY, MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER,
    MOLES_CELLSTANDARD, N2STANDARD, O2STANDARD, R_IDEAL_GAS_EQUATION, T20C, TCMB,
};
use crate::gas::reactions::{self, ReactionResult};
use crate::gas::species::{Gas, GasCatalog};
use serde::{Deserialize, Serialize};

/// Smallest volume a mixture may have (L)
const MINIMUM_VOLUME: f32 = 0.001;

/// Outcome of [`GasMixture::compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixtureComparison {
    /// Both composition and temperature are within tolerance
    Similar,
    /// At least one species differs by more than the mole threshold
    MolesDiffer(Gas),
    /// Composition matches but temperatures differ
    TemperatureDiffers,
}

/// Gas contents of a tile, pipe or transferred parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasMixture {
    moles: [f32; Gas::COUNT],
    /// Volume (L)
    volume: f32,
    /// Temperature (K)
    temperature: f32,
    immutable: bool,
    /// Fuel burned by fire reactions during the last `react` call (mol)
    #[serde(skip)]
    fire_reaction_amount: f32,
}

impl Default for GasMixture {
    fn default() -> Self {
        Self::new(CELL_VOLUME, T20C)
    }
}

impl GasMixture {
    /// Create an empty mixture
    pub fn new(volume: f32, temperature: f32) -> Self {
        debug_assert!(volume > 0.0, "GasMixture::new: volume must be positive");
        Self {
            moles: [0.0; Gas::COUNT],
            volume: sanitize_volume(volume),
            temperature: sanitize_temperature(temperature),
            immutable: false,
            fire_reaction_amount: 0.0,
        }
    }

    /// Immutable vacuum at the cosmic background temperature
    pub fn space() -> Self {
        let mut mix = Self::new(CELL_VOLUME, TCMB);
        mix.immutable = true;
        mix
    }

    /// Breathable air (21% O2, 79% N2) at one atmosphere and 20 °C, scaled to `volume`
    pub fn standard_air(volume: f32) -> Self {
        let mut mix = Self::new(volume, T20C);
        let scale = mix.volume / CELL_VOLUME;
        mix.moles[Gas::Oxygen.index()] = MOLES_CELLSTANDARD * O2STANDARD * scale;
        mix.moles[Gas::Nitrogen.index()] = MOLES_CELLSTANDARD * N2STANDARD * scale;
        mix
    }

    /// Build a mixture from explicit per-species amounts
    pub fn with_moles(volume: f32, temperature: f32, amounts: &[(Gas, f32)]) -> Self {
        let mut mix = Self::new(volume, temperature);
        for &(gas, amount) in amounts {
            mix.adjust_moles(gas, amount);
        }
        mix
    }

    /// Make this mixture read-only from now on
    pub fn mark_immutable(&mut self) {
        self.immutable = true;
    }

    #[inline]
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Volume (L)
    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        if self.immutable {
            return;
        }
        self.volume = sanitize_volume(volume);
    }

    /// Temperature (K)
    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Set temperature, clamped to the cosmic background floor
    pub fn set_temperature(&mut self, temperature: f32) {
        if self.immutable {
            return;
        }
        self.temperature = sanitize_temperature(temperature);
    }

    /// Per-species amounts, indexed by [`Gas::index`]
    #[inline]
    pub fn moles(&self) -> &[f32; Gas::COUNT] {
        &self.moles
    }

    #[inline]
    pub fn get_moles(&self, gas: Gas) -> f32 {
        self.moles[gas.index()]
    }

    /// Overwrite one species; negative or non-finite amounts become zero
    pub fn set_moles(&mut self, gas: Gas, amount: f32) {
        if self.immutable {
            return;
        }
        self.moles[gas.index()] = sanitize_moles(amount);
    }

    /// Add (or with a negative delta, remove) moles of one species, clamping at zero
    pub fn adjust_moles(&mut self, gas: Gas, delta: f32) {
        if self.immutable {
            return;
        }
        let idx = gas.index();
        self.moles[idx] = sanitize_moles(self.moles[idx] + delta);
    }

    /// Sum of every species (mol)
    #[inline]
    pub fn total_moles(&self) -> f32 {
        self.moles.iter().sum()
    }

    /// Pressure from the ideal gas law (kPa)
    pub fn pressure(&self) -> f32 {
        if self.volume <= 0.0 {
            return 0.0;
        }
        self.total_moles() * R_IDEAL_GAS_EQUATION * self.temperature / self.volume
    }

    /// Heat capacity `Σ moles·c` (J/K); zero for an empty mixture
    #[inline]
    pub fn heat_capacity(&self, catalog: &GasCatalog) -> f32 {
        catalog.heat_capacity_of(&self.moles)
    }

    /// Thermal energy `C·T` (J)
    #[inline]
    pub fn thermal_energy(&self, catalog: &GasCatalog) -> f32 {
        self.heat_capacity(catalog) * self.temperature
    }

    /// Fuel burned by fire reactions during the last [`GasMixture::react`] (mol)
    #[inline]
    pub fn fire_reaction_amount(&self) -> f32 {
        self.fire_reaction_amount
    }

    pub(crate) fn add_fire_reaction_amount(&mut self, amount: f32) {
        self.fire_reaction_amount += amount;
    }

    /// Merge `other` into this mixture.
    ///
    /// Moles are summed and the temperature becomes the heat-capacity weighted
    /// average, so both moles and thermal energy are conserved. `other` is never
    /// modified; merging into an immutable mixture does nothing.
    pub fn merge(&mut self, other: &GasMixture, catalog: &GasCatalog) {
        if self.immutable {
            return;
        }
        let own_capacity = self.heat_capacity(catalog);
        let other_capacity = other.heat_capacity(catalog);
        let combined = own_capacity + other_capacity;
        if combined > MINIMUM_HEAT_CAPACITY {
            self.temperature = sanitize_temperature(
                (self.temperature * own_capacity + other.temperature * other_capacity) / combined,
            );
        }
        for (own, theirs) in self.moles.iter_mut().zip(other.moles.iter()) {
            *own = sanitize_moles(*own + theirs);
        }
    }

    /// Remove `amount` moles spread proportionally across all species.
    ///
    /// Returns the removed parcel at this mixture's temperature, so the heat it
    /// carries is debited along with it.
    pub fn remove(&mut self, amount: f32) -> GasMixture {
        let total = self.total_moles();
        if total <= 0.0 || amount <= 0.0 {
            return GasMixture::new(self.volume, self.temperature);
        }
        self.remove_ratio(amount / total)
    }

    /// Remove a fraction (0..=1) of every species. See [`GasMixture::remove`].
    pub fn remove_ratio(&mut self, ratio: f32) -> GasMixture {
        let mut removed = GasMixture::new(self.volume, self.temperature);
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if ratio <= 0.0 {
            return removed;
        }
        for (idx, amount) in self.moles.iter_mut().enumerate() {
            let taken = if ratio >= 1.0 { *amount } else { *amount * ratio };
            removed.moles[idx] = taken;
            if !self.immutable {
                *amount = sanitize_moles(*amount - taken);
            }
        }
        removed
    }

    /// Remove the gas occupying `volume` litres of this mixture
    pub fn remove_volume(&mut self, volume: f32) -> GasMixture {
        let ratio = volume / self.volume;
        let mut removed = self.remove_ratio(ratio);
        removed.volume = sanitize_volume(volume.min(self.volume));
        removed
    }

    /// Scale every species by `factor`
    pub fn multiply(&mut self, factor: f32) {
        if self.immutable {
            return;
        }
        for amount in &mut self.moles {
            *amount = sanitize_moles(*amount * factor);
        }
    }

    /// Remove all gas
    pub fn clear(&mut self) {
        if self.immutable {
            return;
        }
        self.moles = [0.0; Gas::COUNT];
    }

    /// Copy the full state of `other` into this mixture, keeping this mixture's flag
    pub fn copy_from(&mut self, other: &GasMixture) {
        if self.immutable {
            return;
        }
        self.moles = other.moles;
        self.temperature = other.temperature;
    }

    /// Pairwise diffusion step between two neighbouring mixtures.
    ///
    /// Each species moves `(self - sharer) / (adjacent_count + 1)`, carrying its
    /// heat with it. Only mutable sides change; with two mutable sides both moles
    /// and thermal energy are conserved. An immutable `sharer` behaves as an
    /// infinite reservoir: gas sent to it is discarded and gas taken from it is
    /// copied. Returns the pressure difference `self - sharer` after the step.
    pub fn share(&mut self, sharer: &mut GasMixture, adjacent_count: u32, catalog: &GasCatalog) -> f32 {
        if self.immutable && sharer.immutable {
            return self.pressure() - sharer.pressure();
        }
        let ratio = 1.0 / (adjacent_count.max(1) as f32 + 1.0);
        let own_temperature = self.temperature;
        let sharer_temperature = sharer.temperature;
        let old_capacity = self.heat_capacity(catalog);
        let old_sharer_capacity = sharer.heat_capacity(catalog);

        let mut capacity_to_sharer = 0.0;
        let mut capacity_to_self = 0.0;
        let mut deltas = [0.0; Gas::COUNT];
        for gas in Gas::ALL {
            let idx = gas.index();
            let delta = (self.moles[idx] - sharer.moles[idx]) * ratio;
            if delta.abs() < GAS_MIN_MOLES {
                continue;
            }
            let gas_capacity = delta * catalog.specific_heat(gas);
            if delta > 0.0 {
                capacity_to_sharer += gas_capacity;
            } else {
                capacity_to_self -= gas_capacity;
            }
            deltas[idx] = delta;
        }

        if !self.immutable {
            for (amount, delta) in self.moles.iter_mut().zip(deltas.iter()) {
                *amount = sanitize_moles(*amount - delta);
            }
            let new_capacity = old_capacity + capacity_to_self - capacity_to_sharer;
            if new_capacity > MINIMUM_HEAT_CAPACITY {
                self.temperature = sanitize_temperature(
                    (old_capacity * own_temperature - capacity_to_sharer * own_temperature
                        + capacity_to_self * sharer_temperature)
                        / new_capacity,
                );
            }
        }
        if !sharer.immutable {
            for (amount, delta) in sharer.moles.iter_mut().zip(deltas.iter()) {
                *amount = sanitize_moles(*amount + delta);
            }
            let new_capacity = old_sharer_capacity + capacity_to_sharer - capacity_to_self;
            if new_capacity > MINIMUM_HEAT_CAPACITY {
                sharer.temperature = sanitize_temperature(
                    (old_sharer_capacity * sharer_temperature - capacity_to_self * sharer_temperature
                        + capacity_to_sharer * own_temperature)
                        / new_capacity,
                );
            }
        }

        self.pressure() - sharer.pressure()
    }

    /// Conduct heat towards `sharer` without moving any gas.
    ///
    /// The temperature gap shrinks by `conduction_coefficient` (0..=1). Energy is
    /// conserved between two mutable mixtures. Returns the sharer's new temperature.
    pub fn temperature_share(&mut self, sharer: &mut GasMixture, conduction_coefficient: f32, catalog: &GasCatalog) -> f32 {
        let delta = self.temperature - sharer.temperature;
        if delta.abs() < MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER {
            return sharer.temperature;
        }
        let own_capacity = self.heat_capacity(catalog);
        let sharer_capacity = sharer.heat_capacity(catalog);
        if own_capacity <= MINIMUM_HEAT_CAPACITY || sharer_capacity <= MINIMUM_HEAT_CAPACITY {
            return sharer.temperature;
        }
        let coefficient = conduction_coefficient.clamp(0.0, 1.0);
        let heat = coefficient * delta * (own_capacity * sharer_capacity / (own_capacity + sharer_capacity));
        if !self.immutable {
            self.temperature = sanitize_temperature(self.temperature - heat / own_capacity);
        }
        if !sharer.immutable {
            sharer.temperature = sanitize_temperature(sharer.temperature + heat / sharer_capacity);
        }
        sharer.temperature
    }

    /// Compare against a neighbour to decide whether gas still needs to move
    pub fn compare(&self, other: &GasMixture, min_moles_delta: f32, min_temperature_delta: f32) -> MixtureComparison {
        for gas in Gas::ALL {
            let delta = (self.get_moles(gas) - other.get_moles(gas)).abs();
            if delta > min_moles_delta {
                return MixtureComparison::MolesDiffer(gas);
            }
        }
        if self.total_moles() > min_moles_delta
            && (self.temperature - other.temperature).abs() > min_temperature_delta
        {
            return MixtureComparison::TemperatureDiffers;
        }
        MixtureComparison::Similar
    }

    /// Run the reaction catalogue over this mixture
    pub fn react(&mut self, fire: &FireConfig, catalog: &GasCatalog) -> ReactionResult {
        reactions::react(self, fire, catalog)
    }

    pub(crate) fn reset_reaction_results(&mut self) {
        self.fire_reaction_amount = 0.0;
    }
}

#[inline]
fn sanitize_moles(amount: f32) -> f32 {
    debug_assert!(!amount.is_nan(), "gas amount became NaN");
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

#[inline]
fn sanitize_temperature(temperature: f32) -> f32 {
    if temperature.is_finite() {
        temperature.max(TCMB)
    } else {
        TCMB
    }
}

#[inline]
fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.max(MINIMUM_VOLUME)
    } else {
        CELL_VOLUME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::constants::ONE_ATMOSPHERE;
    use approx::assert_relative_eq;

    fn catalog() -> GasCatalog {
        GasCatalog::default()
    }

    #[test]
    fn test_standard_air_is_one_atmosphere() {
        let air = GasMixture::standard_air(CELL_VOLUME);
        assert_relative_eq!(air.pressure(), ONE_ATMOSPHERE, max_relative = 1e-4);
        assert_relative_eq!(air.total_moles(), MOLES_CELLSTANDARD, max_relative = 1e-5);
    }

    #[test]
    fn test_adjust_moles_clamps_at_zero() {
        let mut mix = GasMixture::new(CELL_VOLUME, T20C);
        mix.adjust_moles(Gas::Oxygen, 5.0);
        mix.adjust_moles(Gas::Oxygen, -12.0);
        assert_eq!(mix.get_moles(Gas::Oxygen), 0.0);
        mix.set_moles(Gas::Plasma, f32::NAN.max(-1.0));
        assert_eq!(mix.get_moles(Gas::Plasma), 0.0);
    }

    #[test]
    fn test_merge_conserves_moles_and_energy() {
        let gases = catalog();
        let mut hot = GasMixture::with_moles(CELL_VOLUME, 500.0, &[(Gas::Oxygen, 40.0)]);
        let cold = GasMixture::with_moles(CELL_VOLUME, 250.0, &[(Gas::Nitrogen, 60.0)]);
        let energy = hot.thermal_energy(&gases) + cold.thermal_energy(&gases);

        hot.merge(&cold, &gases);

        assert_relative_eq!(hot.total_moles(), 100.0, max_relative = 1e-6);
        assert_relative_eq!(hot.thermal_energy(&gases), energy, max_relative = 1e-5);
        // 40 mol * 20 J/K at 500 K, 60 mol * 30 J/K at 250 K
        assert_relative_eq!(hot.temperature(), (800.0 * 500.0 + 1800.0 * 250.0) / 2600.0, max_relative = 1e-5);
    }

    #[test]
    fn test_merge_from_immutable_copies_contribution() {
        let gases = catalog();
        let mut background = GasMixture::standard_air(CELL_VOLUME);
        background.mark_immutable();
        let before = background.clone();

        let mut target = GasMixture::new(CELL_VOLUME, T20C);
        target.merge(&background, &gases);
        background.merge(&target, &gases);

        assert_eq!(background, before);
        assert_relative_eq!(target.total_moles(), before.total_moles(), max_relative = 1e-6);
    }

    #[test]
    fn test_remove_is_proportional() {
        let mut mix = GasMixture::with_moles(CELL_VOLUME, T20C, &[(Gas::Oxygen, 30.0), (Gas::Nitrogen, 70.0)]);
        let removed = mix.remove(10.0);

        assert_relative_eq!(removed.get_moles(Gas::Oxygen), 3.0, max_relative = 1e-5);
        assert_relative_eq!(removed.get_moles(Gas::Nitrogen), 7.0, max_relative = 1e-5);
        assert_relative_eq!(mix.total_moles(), 90.0, max_relative = 1e-5);
        assert_eq!(removed.temperature(), mix.temperature());
    }

    #[test]
    fn test_remove_more_than_available_empties_source() {
        let mut mix = GasMixture::with_moles(CELL_VOLUME, T20C, &[(Gas::Plasma, 2.0)]);
        let removed = mix.remove(50.0);
        assert_eq!(mix.total_moles(), 0.0);
        assert_eq!(removed.get_moles(Gas::Plasma), 2.0);
    }

    #[test]
    fn test_remove_from_immutable_leaves_source_untouched() {
        let mut background = GasMixture::standard_air(CELL_VOLUME);
        background.mark_immutable();
        let removed = background.remove_ratio(0.5);
        assert_relative_eq!(removed.total_moles(), MOLES_CELLSTANDARD * 0.5, max_relative = 1e-5);
        assert_relative_eq!(background.total_moles(), MOLES_CELLSTANDARD, max_relative = 1e-5);
    }

    #[test]
    fn test_pressure_increases_with_moles() {
        let mut mix = GasMixture::new(CELL_VOLUME, T20C);
        let mut last = mix.pressure();
        for gas in Gas::ALL {
            mix.adjust_moles(gas, 1.5);
            assert!(mix.pressure() > last);
            last = mix.pressure();
        }
    }

    #[test]
    fn test_share_equalizes_pair_and_conserves() {
        let gases = catalog();
        let mut a = GasMixture::with_moles(CELL_VOLUME, 350.0, &[(Gas::Oxygen, 100.0)]);
        let mut b = GasMixture::with_moles(CELL_VOLUME, 250.0, &[(Gas::Oxygen, 20.0)]);
        let energy = a.thermal_energy(&gases) + b.thermal_energy(&gases);

        a.share(&mut b, 1, &gases);

        assert_relative_eq!(a.total_moles() + b.total_moles(), 120.0, max_relative = 1e-6);
        assert_relative_eq!(a.total_moles(), b.total_moles(), max_relative = 1e-5);
        assert_relative_eq!(a.thermal_energy(&gases) + b.thermal_energy(&gases), energy, max_relative = 1e-5);
    }

    #[test]
    fn test_share_with_space_discards_gas() {
        let gases = catalog();
        let mut room = GasMixture::standard_air(CELL_VOLUME);
        let mut space = GasMixture::space();
        let pressure_before = room.pressure();

        room.share(&mut space, 4, &gases);

        assert!(room.pressure() < pressure_before);
        assert_eq!(space.total_moles(), 0.0);
    }

    #[test]
    fn test_compare_detects_differences() {
        let a = GasMixture::standard_air(CELL_VOLUME);
        let mut b = a.clone();
        assert_eq!(a.compare(&b, 0.1, 4.0), MixtureComparison::Similar);
        b.set_temperature(T20C + 50.0);
        assert_eq!(a.compare(&b, 0.1, 4.0), MixtureComparison::TemperatureDiffers);
        b.adjust_moles(Gas::Nitrogen, 5.0);
        assert_eq!(a.compare(&b, 0.1, 4.0), MixtureComparison::MolesDiffer(Gas::Nitrogen));
    }

    #[test]
    fn test_temperature_share_conserves_energy() {
        let gases = catalog();
        let mut hot = GasMixture::with_moles(CELL_VOLUME, 400.0, &[(Gas::Nitrogen, 50.0)]);
        let mut cold = GasMixture::with_moles(CELL_VOLUME, 300.0, &[(Gas::Nitrogen, 50.0)]);
        let energy = hot.thermal_energy(&gases) + cold.thermal_energy(&gases);

        hot.temperature_share(&mut cold, 0.4, &gases);

        assert_relative_eq!(hot.temperature() - cold.temperature(), 60.0, max_relative = 1e-4);
        assert_relative_eq!(hot.thermal_energy(&gases) + cold.thermal_energy(&gases), energy, max_relative = 1e-5);
        assert_eq!(hot.total_moles(), 50.0);
    }

    #[test]
    fn test_temperature_never_drops_below_background() {
        let mut mix = GasMixture::new(CELL_VOLUME, T20C);
        mix.set_temperature(-40.0);
        assert_eq!(mix.temperature(), TCMB);
    }
}
