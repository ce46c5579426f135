//! Gas species and their thermal properties.
//!
//! Specific heats are balance data, so they live in a serde-configurable
//! [`GasCatalog`] instead of being hardcoded into the mixture math.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gas species tracked per mixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(usize)]
pub enum Gas {
    Oxygen = 0,
    Nitrogen = 1,
    CarbonDioxide = 2,
    Plasma = 3,
    Tritium = 4,
    WaterVapor = 5,
    NitrousOxide = 6,
}

impl Gas {
    /// Number of species (length of every per-species array)
    pub const COUNT: usize = 7;

    /// Every species in index order
    pub const ALL: [Gas; Gas::COUNT] = [
        Gas::Oxygen,
        Gas::Nitrogen,
        Gas::CarbonDioxide,
        Gas::Plasma,
        Gas::Tritium,
        Gas::WaterVapor,
        Gas::NitrousOxide,
    ];

    /// Array index of this species
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Species stored at `index`, `None` when out of range
    pub fn from_index(index: usize) -> Option<Gas> {
        Gas::ALL.get(index).copied()
    }

    /// Human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            Gas::Oxygen => "oxygen",
            Gas::Nitrogen => "nitrogen",
            Gas::CarbonDioxide => "carbon dioxide",
            Gas::Plasma => "plasma",
            Gas::Tritium => "tritium",
            Gas::WaterVapor => "water vapor",
            Gas::NitrousOxide => "nitrous oxide",
        }
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-species thermal data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasCatalog {
    /// Molar specific heat per species (J/(mol·K)), indexed by [`Gas::index`]
    pub specific_heats: [f32; Gas::COUNT],
    /// Global multiplier applied to every heat capacity
    pub heat_scale: f32,
}

impl Default for GasCatalog {
    fn default() -> Self {
        Self {
            specific_heats: [
                20.0,  // oxygen
                30.0,  // nitrogen
                30.0,  // carbon dioxide
                200.0, // plasma
                10.0,  // tritium
                40.0,  // water vapor
                40.0,  // nitrous oxide
            ],
            heat_scale: 1.0,
        }
    }
}

impl GasCatalog {
    /// Specific heat of one species, already scaled
    #[inline]
    pub fn specific_heat(&self, gas: Gas) -> f32 {
        self.specific_heats[gas.index()] * self.heat_scale
    }

    /// Heat capacity of a per-species mole array (J/K)
    #[inline]
    pub fn heat_capacity_of(&self, moles: &[f32; Gas::COUNT]) -> f32 {
        moles
            .iter()
            .zip(self.specific_heats.iter())
            .map(|(m, c)| m * c)
            .sum::<f32>()
            * self.heat_scale
    }
}
