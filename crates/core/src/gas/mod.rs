//! Gas mixtures, species data and reactions

pub mod constants;
pub mod mixture;
pub mod reactions;
pub mod species;

pub use mixture::{GasMixture, MixtureComparison};
pub use reactions::{react, GasReaction, ReactionResult};
pub use species::{Gas, GasCatalog};
