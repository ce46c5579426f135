//! Compass direction set used for adjacency and airtight masks.
//!
//! Each of the eight compass directions owns one bit, so a single `AtmosDirection`
//! value can hold either one direction or an arbitrary set of them (a blocked mask,
//! the connected-neighbour mask of a tile, ...). North is `+y`, east is `+x`.

use crate::core_types::vec2::Vector2i;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of compass directions packed into one byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AtmosDirection: u8 {
        const NORTH = 1 << 0;
        const SOUTH = 1 << 1;
        const EAST = 1 << 2;
        const WEST = 1 << 3;
        const NORTH_EAST = 1 << 4;
        const NORTH_WEST = 1 << 5;
        const SOUTH_EAST = 1 << 6;
        const SOUTH_WEST = 1 << 7;
    }
}

impl AtmosDirection {
    /// Empty set
    pub const INVALID: Self = Self::empty();
    /// All eight directions
    pub const ALL: Self = Self::all();
    /// The four cardinal directions
    pub const ALL_CARDINALS: Self = Self::from_bits_retain(0x0F);

    /// Number of distinct directions (adjacency array length)
    pub const COUNT: usize = 8;

    /// Fixed processing order: cardinals clockwise from north, then diagonals clockwise.
    ///
    /// Every solver walks neighbours in this order so that two runs over the same
    /// state move gas identically.
    pub const ORDERED: [Self; 8] = [
        Self::NORTH,
        Self::EAST,
        Self::SOUTH,
        Self::WEST,
        Self::NORTH_EAST,
        Self::SOUTH_EAST,
        Self::SOUTH_WEST,
        Self::NORTH_WEST,
    ];

    /// Cardinal directions only, in processing order
    pub const CARDINALS: [Self; 4] = [Self::NORTH, Self::EAST, Self::SOUTH, Self::WEST];

    /// Diagonal directions only, in processing order
    pub const DIAGONALS: [Self; 4] = [Self::NORTH_EAST, Self::SOUTH_EAST, Self::SOUTH_WEST, Self::NORTH_WEST];

    /// Number of directions in the set
    #[inline]
    pub const fn count(self) -> u32 {
        self.bits().count_ones()
    }

    /// Slot of a single direction in an 8-wide adjacency array.
    ///
    /// Returns `None` for the empty set or for a set holding more than one direction.
    #[inline]
    pub const fn index(self) -> Option<usize> {
        if self.bits().count_ones() == 1 {
            Some(self.bits().trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Single direction stored at adjacency slot `index`
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self::from_bits_retain(1 << (index & 7))
    }

    /// Diagonal directions are NE/NW/SE/SW
    #[inline]
    pub const fn is_diagonal(self) -> bool {
        self.bits() & 0xF0 != 0
    }

    /// Opposite direction(s); maps every contained direction to its opposite
    pub fn opposite(self) -> Self {
        const OPPOSITE_SLOT: [usize; 8] = [1, 0, 3, 2, 7, 6, 5, 4];
        self.iter_ordered().fold(Self::INVALID, |out, dir| {
            dir.index()
                .map_or(out, |slot| out | Self::from_index(OPPOSITE_SLOT[slot]))
        })
    }

    /// The two cardinal directions a diagonal is made of; cardinals return themselves twice
    pub fn cardinal_components(self) -> (Self, Self) {
        match self.index() {
            Some(4) => (Self::NORTH, Self::EAST),
            Some(5) => (Self::NORTH, Self::WEST),
            Some(6) => (Self::SOUTH, Self::EAST),
            Some(7) => (Self::SOUTH, Self::WEST),
            _ => (self, self),
        }
    }

    /// Tile offset for a single direction (`+y` is north)
    pub fn offset(self) -> Vector2i {
        const OFFSETS: [(i32, i32); 8] = [(0, 1), (0, -1), (1, 0), (-1, 0), (1, 1), (-1, 1), (1, -1), (-1, -1)];
        self.index()
            .map_or(Vector2i::new(0, 0), |slot| Vector2i::new(OFFSETS[slot].0, OFFSETS[slot].1))
    }

    /// Iterate the contained single directions in [`AtmosDirection::ORDERED`] order
    pub fn iter_ordered(self) -> impl Iterator<Item = Self> {
        Self::ORDERED
            .into_iter()
            .filter(move |dir| self.contains(*dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for dir in AtmosDirection::ORDERED {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.offset() + dir.opposite().offset(), Vector2i::new(0, 0));
        }
    }

    #[test]
    fn test_index_round_trip_covers_all_slots() {
        let mut seen = [false; AtmosDirection::COUNT];
        for dir in AtmosDirection::ORDERED {
            let idx = dir.index().unwrap();
            assert_eq!(AtmosDirection::from_index(idx), dir);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!((AtmosDirection::NORTH | AtmosDirection::EAST).index(), None);
    }

    #[test]
    fn test_iter_follows_processing_order() {
        let set = AtmosDirection::WEST | AtmosDirection::NORTH | AtmosDirection::SOUTH_WEST;
        let dirs: Vec<_> = set.iter_ordered().collect();
        assert_eq!(
            dirs,
            vec![
                AtmosDirection::NORTH,
                AtmosDirection::WEST,
                AtmosDirection::SOUTH_WEST
            ]
        );
    }

    #[test]
    fn test_set_operations() {
        let mut set = AtmosDirection::INVALID;
        set.insert(AtmosDirection::EAST);
        set.set(AtmosDirection::NORTH, true);
        assert_eq!(set.count(), 2);
        set.remove(AtmosDirection::EAST);
        assert!(set.contains(AtmosDirection::NORTH));
        assert!(!set.intersects(AtmosDirection::EAST));
        assert_eq!(
            AtmosDirection::NORTH_EAST.cardinal_components(),
            (AtmosDirection::NORTH, AtmosDirection::EAST)
        );
    }
}
