//! Per-map background atmosphere

use crate::gas::GasMixture;
use serde::{Deserialize, Serialize};

/// Background gas of a map, used for every tile no grid owns.
///
/// The mixture is always immutable, so handing it to device code cannot change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapAtmosphere {
    mixture: GasMixture,
    /// Off-grid tiles on this map behave as an infinite vacuum sink
    pub space: bool,
}

impl Default for MapAtmosphere {
    fn default() -> Self {
        Self::space()
    }
}

impl MapAtmosphere {
    /// Vacuum at the cosmic background temperature
    pub fn space() -> Self {
        Self {
            mixture: GasMixture::space(),
            space: true,
        }
    }

    /// A breathable or otherwise non-space background (planet surface)
    pub fn with_mixture(mut mixture: GasMixture, space: bool) -> Self {
        mixture.mark_immutable();
        Self { mixture, space }
    }

    #[inline]
    pub fn mixture(&self) -> &GasMixture {
        &self.mixture
    }

    /// Mutable handle for the query API; every mutation through it is ignored
    #[inline]
    pub(crate) fn mixture_mut(&mut self) -> &mut GasMixture {
        &mut self.mixture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::constants::CELL_VOLUME;
    use crate::gas::Gas;

    #[test]
    fn test_background_is_always_immutable() {
        let mut map = MapAtmosphere::with_mixture(GasMixture::standard_air(CELL_VOLUME), false);
        let before = map.mixture().clone();
        map.mixture_mut().adjust_moles(Gas::Plasma, 10.0);
        map.mixture_mut().clear();
        assert_eq!(map.mixture(), &before);
        assert!(!map.space);
    }

    #[test]
    fn test_default_is_space() {
        let map = MapAtmosphere::default();
        assert!(map.space);
        assert_eq!(map.mixture().total_moles(), 0.0);
    }
}
