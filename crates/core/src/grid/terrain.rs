//! Tile layout of a grid
//!
//! [`GridTerrain`] records which coordinates belong to a grid and whether each one
//! is a floor or open space. It is the source of truth the atmosphere tiles are
//! repopulated from.

use crate::core_types::{tile_order_key, Vector2i};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One terrain cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainTile {
    /// Open to space (lattice, hull breach)
    pub space: bool,
    /// Seed the tile with breathable air when its atmosphere is created
    pub fill_air: bool,
}

impl TerrainTile {
    pub const FLOOR: Self = Self {
        space: false,
        fill_air: false,
    };
    pub const AIRED_FLOOR: Self = Self {
        space: false,
        fill_air: true,
    };
    pub const SPACE: Self = Self {
        space: true,
        fill_air: false,
    };
}

/// Sparse set of terrain tiles keyed by grid coordinate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridTerrain {
    tiles: FxHashMap<Vector2i, TerrainTile>,
}

impl GridTerrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangle of floor tiles covering `min..=max`
    pub fn rect(min: Vector2i, max: Vector2i, fill_air: bool) -> Self {
        let mut terrain = Self::new();
        let tile = TerrainTile {
            space: false,
            fill_air,
        };
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                terrain.tiles.insert(Vector2i::new(x, y), tile);
            }
        }
        terrain
    }

    pub fn insert(&mut self, position: Vector2i, tile: TerrainTile) -> Option<TerrainTile> {
        self.tiles.insert(position, tile)
    }

    pub fn remove(&mut self, position: &Vector2i) -> Option<TerrainTile> {
        self.tiles.remove(position)
    }

    #[inline]
    pub fn get(&self, position: &Vector2i) -> Option<&TerrainTile> {
        self.tiles.get(position)
    }

    #[inline]
    pub fn contains(&self, position: &Vector2i) -> bool {
        self.tiles.contains_key(position)
    }

    /// Mark an existing tile to be seeded with standard air. Returns false for unknown tiles.
    pub fn fill_air(&mut self, position: &Vector2i) -> bool {
        match self.tiles.get_mut(position) {
            Some(tile) => {
                tile.fill_air = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vector2i, &TerrainTile)> {
        self.tiles.iter()
    }

    /// Every coordinate in row-major order, for deterministic walks
    pub fn sorted_positions(&self) -> Vec<Vector2i> {
        let mut positions: Vec<Vector2i> = self.tiles.keys().copied().collect();
        positions.sort_by_key(tile_order_key);
        positions
    }

    /// Inclusive bounding box, `None` when empty
    pub fn bounds(&self) -> Option<(Vector2i, Vector2i)> {
        let mut iter = self.tiles.keys();
        let first = *iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| {
            (
                Vector2i::new(min.x.min(p.x), min.y.min(p.y)),
                Vector2i::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }
}
