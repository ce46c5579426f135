//! Simulation configuration
//!
//! Every balance number the solvers use (scheduling budgets, thresholds, fire
//! chemistry, specific heats) lives here instead of being hardcoded. All structs
//! deserialize with `#[serde(default)]`, so a JSON override only needs the fields
//! it changes.

use crate::gas::constants::{
    CELL_VOLUME, MINIMUM_MOLES_DELTA_TO_MOVE, MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND, T0C, T20C,
};
use crate::gas::species::GasCatalog;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned by [`AtmosConfig::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero, negative or NaN
    NotPositive { field: &'static str, value: f32 },
    /// A budget that must be at least one was zero
    ZeroBudget { field: &'static str },
    /// Two related thresholds are in the wrong order
    Ordering {
        lower: &'static str,
        upper: &'static str,
    },
    /// A ratio was outside `0..=1`
    OutOfRange { field: &'static str, value: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            Self::ZeroBudget { field } => write!(f, "{field} must be at least 1"),
            Self::Ordering { lower, upper } => {
                write!(f, "{lower} must not exceed {upper}")
            }
            Self::OutOfRange { field, value } => {
                write!(f, "{field} must be within 0..=1, got {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Monstermos equalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizationConfig {
    /// Run equalization before the diffusion pass
    pub enabled: bool,
    /// Largest connected region one equalization pass may collect
    pub tile_limit: usize,
    /// Tiles that may be equalized per tick, across all regions
    pub tiles_per_tick: usize,
    /// Vent whole regions that touch space in one pass
    pub explosive_depressurization: bool,
}

impl Default for EqualizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tile_limit: 200,
            tiles_per_tick: 2000,
            explosive_depressurization: true,
        }
    }
}

/// Fire chemistry and hotspot tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    /// Hotspots below this temperature go out (K)
    pub minimum_temperature_to_exist: f32,
    /// Tiles hotter than this spread fire to their neighbours (K)
    pub minimum_temperature_to_spread: f32,
    /// Exposure temperature needed to ignite a tile (K)
    pub ignition_temperature: f32,
    /// Plasma burns at full rate above this temperature (K)
    pub plasma_upper_temperature: f32,
    /// Fraction of the tile temperature radiated to neighbours when spreading
    pub spread_radiosity_scale: f32,
    /// Volume growth of a hotspot per process, scaled by burned fuel (L/mol)
    pub fire_growth_rate: f32,
    /// Base oxygen consumption factor of the plasma fire
    pub oxygen_burn_rate_base: f32,
    /// Divisor applied to plasma consumed per reaction
    pub plasma_burn_rate_delta: f32,
    /// Oxygen to plasma ratio at which plasma burns at its full rate
    pub plasma_oxygen_fullburn: f32,
    /// Energy released per mole of plasma burned (J)
    pub fire_plasma_energy_released: f32,
    /// Energy released per mole of tritium burned (J)
    pub fire_hydrogen_energy_released: f32,
    /// Divisor applied to tritium consumed per reaction
    pub tritium_burn_rate_delta: f32,
    /// Oxygen to plasma ratio where tritium production starts
    pub supersaturation_threshold: f32,
    /// Oxygen to plasma ratio where the product is entirely tritium
    pub supersaturation_ends: f32,
    /// Oxygen needed for a hotspot to ignite or survive (mol)
    pub min_oxygen_moles: f32,
    /// Plasma or tritium needed for a hotspot to ignite or survive (mol)
    pub min_fuel_moles: f32,
    /// Reactions with less of a reactant than this do nothing (mol)
    pub minimum_reactant_moles: f32,
    /// Multiplier turning an exposed volume into a new hotspot volume
    pub hotspot_volume_scale: f32,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            minimum_temperature_to_exist: T0C + 100.0,
            minimum_temperature_to_spread: T0C + 150.0,
            ignition_temperature: T0C + 100.0,
            plasma_upper_temperature: T0C + 1370.0,
            spread_radiosity_scale: 0.85,
            fire_growth_rate: 40000.0,
            oxygen_burn_rate_base: 1.4,
            plasma_burn_rate_delta: 9.0,
            plasma_oxygen_fullburn: 10.0,
            fire_plasma_energy_released: 3_000_000.0,
            fire_hydrogen_energy_released: 280_000.0,
            tritium_burn_rate_delta: 10.0,
            supersaturation_threshold: 96.0,
            supersaturation_ends: 144.0,
            min_oxygen_moles: 0.5,
            min_fuel_moles: 0.5,
            minimum_reactant_moles: 0.01,
            hotspot_volume_scale: 25.0,
        }
    }
}

/// Top-level configuration for an [`AtmosphereSystem`](crate::simulation::AtmosphereSystem)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosConfig {
    /// Active tiles shared per grid per tick
    pub max_active_tiles_per_tick: usize,
    /// Movement updates drained per grid per tick
    pub movement_updates_per_tick: usize,
    /// Movement backlog size that forces a full drain
    pub movement_backlog_cap: usize,
    /// Mole difference below which two tiles count as settled (mol)
    pub minimum_moles_delta_to_move: f32,
    /// Temperature difference below which two tiles count as settled (K)
    pub minimum_temperature_delta_to_suspend: f32,
    /// Pressure drop into space that counts as a decompression event (kPa)
    pub space_decompression_threshold: f32,
    /// Temperature of freshly created tiles (K)
    pub default_temperature: f32,
    /// Volume of one tile (L)
    pub cell_volume: f32,
    /// Connect tiles diagonally as well as cardinally
    pub diagonal_adjacency: bool,
    pub equalization: EqualizationConfig,
    pub fire: FireConfig,
    pub gases: GasCatalog,
}

impl Default for AtmosConfig {
    fn default() -> Self {
        Self {
            max_active_tiles_per_tick: 2000,
            movement_updates_per_tick: 64,
            movement_backlog_cap: 4096,
            minimum_moles_delta_to_move: MINIMUM_MOLES_DELTA_TO_MOVE,
            minimum_temperature_delta_to_suspend: MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND,
            space_decompression_threshold: 30.0,
            default_temperature: T20C,
            cell_volume: CELL_VOLUME,
            diagonal_adjacency: true,
            equalization: EqualizationConfig::default(),
            fire: FireConfig::default(),
            gases: GasCatalog::default(),
        }
    }
}

impl AtmosConfig {
    /// Check that every budget and threshold is usable
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("cell_volume", self.cell_volume)?;
        positive("default_temperature", self.default_temperature)?;
        positive("minimum_moles_delta_to_move", self.minimum_moles_delta_to_move)?;
        positive(
            "minimum_temperature_delta_to_suspend",
            self.minimum_temperature_delta_to_suspend,
        )?;
        positive("space_decompression_threshold", self.space_decompression_threshold)?;
        nonzero("max_active_tiles_per_tick", self.max_active_tiles_per_tick)?;
        nonzero("movement_updates_per_tick", self.movement_updates_per_tick)?;
        if self.movement_backlog_cap < self.movement_updates_per_tick {
            return Err(ConfigError::Ordering {
                lower: "movement_updates_per_tick",
                upper: "movement_backlog_cap",
            });
        }

        nonzero("equalization.tile_limit", self.equalization.tile_limit)?;
        nonzero("equalization.tiles_per_tick", self.equalization.tiles_per_tick)?;

        let fire = &self.fire;
        positive("fire.minimum_temperature_to_exist", fire.minimum_temperature_to_exist)?;
        positive("fire.ignition_temperature", fire.ignition_temperature)?;
        positive("fire.plasma_burn_rate_delta", fire.plasma_burn_rate_delta)?;
        positive("fire.tritium_burn_rate_delta", fire.tritium_burn_rate_delta)?;
        positive("fire.plasma_oxygen_fullburn", fire.plasma_oxygen_fullburn)?;
        positive("fire.hotspot_volume_scale", fire.hotspot_volume_scale)?;
        if fire.ignition_temperature >= fire.plasma_upper_temperature {
            return Err(ConfigError::Ordering {
                lower: "fire.ignition_temperature",
                upper: "fire.plasma_upper_temperature",
            });
        }
        if fire.supersaturation_threshold >= fire.supersaturation_ends {
            return Err(ConfigError::Ordering {
                lower: "fire.supersaturation_threshold",
                upper: "fire.supersaturation_ends",
            });
        }
        if !(0.0..=1.0).contains(&fire.spread_radiosity_scale) {
            return Err(ConfigError::OutOfRange {
                field: "fire.spread_radiosity_scale",
                value: fire.spread_radiosity_scale,
            });
        }

        positive("gases.heat_scale", self.gases.heat_scale)?;
        for &heat in &self.gases.specific_heats {
            positive("gases.specific_heats", heat)?;
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn nonzero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroBudget { field })
    } else {
        Ok(())
    }
}
