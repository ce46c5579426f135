//! Integer vector type for tile coordinates.

use nalgebra::Vector2;

/// 2D integer vector addressing a tile within a grid.
///
/// This is a simple alias for `nalgebra::Vector2<i32>`, used as the key of every
/// per-grid tile map and as the adjacency reference between neighbouring tiles.
pub type Vector2i = Vector2<i32>;

/// Stable ordering key for a tile coordinate (row-major: y, then x).
///
/// `nalgebra` vectors are not `Ord`; this gives solvers a deterministic order
/// when they need to walk a hash map.
#[inline]
pub fn tile_order_key(tile: &Vector2i) -> (i32, i32) {
    (tile.y, tile.x)
}
