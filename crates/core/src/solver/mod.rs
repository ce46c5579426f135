//! Gas movement and fire solvers
//!
//! Each tick a grid runs, in order:
//! 1. [`equalization::equalize_pressure`] (Monstermos, with explosive depressurization)
//! 2. [`diffusion::process_active_tiles`] (budgeted share pass)
//! 3. [`hotspot::process_hotspots`]
//!
//! All solvers work on one [`GridAtmosphere`](crate::grid::GridAtmosphere) at a
//! time and report events through an [`AtmosObserver`](crate::simulation::observer::AtmosObserver).

pub mod diffusion;
pub mod equalization;
pub mod hotspot;

pub use diffusion::{process_active_tiles, DiffusionReport};
pub use equalization::{equalize_pressure, EqualizationReport};
pub use hotspot::{
    hotspot_expose, hotspot_extinguish, is_hotspot_active, process_hotspots, react_tile, suppress_fire,
};
