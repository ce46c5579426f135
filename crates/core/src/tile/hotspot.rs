//! Tile-local fire state

use serde::{Deserialize, Serialize};

/// Fire burning on a single tile.
///
/// An invalid hotspot (the `Default`) means "no fire"; extinguishing always
/// replaces the whole value with the default so no stale field survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Whether this hotspot is burning
    pub valid: bool,
    /// Flame temperature (K)
    pub temperature: f32,
    /// Volume of tile air affected by the fire (L)
    pub volume: f32,
    /// Visual intensity bucket, 1 (small) to 3 (large)
    pub state: u8,
    /// Ignition tick has passed; set on the first process call
    pub skipped_first_process: bool,
    /// Fire covers nearly the whole tile, so all of its air reacts
    pub bypassing: bool,
}

impl Hotspot {
    /// A freshly ignited hotspot
    pub fn ignite(temperature: f32, volume: f32) -> Self {
        Self {
            valid: true,
            temperature,
            volume,
            state: 1,
            skipped_first_process: false,
            bypassing: false,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.valid
    }

    /// Refresh the visual bucket from the current volume relative to the tile
    pub fn update_state(&mut self, tile_volume: f32) {
        self.state = if self.bypassing {
            3
        } else if self.volume > tile_volume * 0.4 {
            2
        } else {
            1
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_invalid() {
        let hotspot = Hotspot::default();
        assert!(!hotspot.is_active());
        assert_eq!(hotspot.volume, 0.0);
    }

    #[test]
    fn test_state_tracks_volume() {
        let mut hotspot = Hotspot::ignite(600.0, 100.0);
        hotspot.update_state(2500.0);
        assert_eq!(hotspot.state, 1);
        hotspot.volume = 1500.0;
        hotspot.update_state(2500.0);
        assert_eq!(hotspot.state, 2);
        hotspot.bypassing = true;
        hotspot.update_state(2500.0);
        assert_eq!(hotspot.state, 3);
    }
}
