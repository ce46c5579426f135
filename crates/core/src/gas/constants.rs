//! Physical constants shared by every atmospherics module.
//!
//! Volumes are litres, pressures kPa, temperatures kelvin, amounts moles.

/// Ideal gas constant (kPa·L/(K·mol))
pub const R_IDEAL_GAS_EQUATION: f32 = 8.314;
/// One standard atmosphere (kPa)
pub const ONE_ATMOSPHERE: f32 = 101.325;
/// Cosmic microwave background temperature, the floor for any mixture (K)
pub const TCMB: f32 = 2.7;
/// 0 °C (K)
pub const T0C: f32 = 273.15;
/// 20 °C (K)
pub const T20C: f32 = 293.15;

/// Amounts below this are treated as zero
pub const GAS_MIN_MOLES: f32 = 0.000_000_05;
/// Heat capacities below this are treated as empty (J/K)
pub const MINIMUM_HEAT_CAPACITY: f32 = 0.0003;
/// Heat capacity attributed to space tiles, keeps vacuum "cold" (J/K)
pub const SPACE_HEAT_CAPACITY: f32 = 7000.0;

/// Litres in one tile
pub const CELL_VOLUME: f32 = 2500.0;
/// Moles in one tile of air at one atmosphere and 20 °C
pub const MOLES_CELLSTANDARD: f32 = ONE_ATMOSPHERE * CELL_VOLUME / (T20C * R_IDEAL_GAS_EQUATION);
/// Oxygen fraction of standard air
pub const O2STANDARD: f32 = 0.21;
/// Nitrogen fraction of standard air
pub const N2STANDARD: f32 = 0.79;

/// Fraction of a standard cell that must differ before gas is moved
pub const MINIMUM_AIR_RATIO_TO_MOVE: f32 = 0.001;
/// Default mole delta below which two tiles count as settled
pub const MINIMUM_MOLES_DELTA_TO_MOVE: f32 = MOLES_CELLSTANDARD * MINIMUM_AIR_RATIO_TO_MOVE;
/// Temperature difference below which two tiles count as settled (K)
pub const MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND: f32 = 4.0;
/// Temperature difference below which heat is not conducted at all (K)
pub const MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER: f32 = 0.5;
/// Fraction of a temperature gap conducted between open neighbours per share
pub const OPEN_HEAT_TRANSFER_COEFFICIENT: f32 = 0.4;
