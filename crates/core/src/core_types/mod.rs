//! Core types and utilities

pub mod direction;
pub mod ids;
pub mod vec2;

pub use direction::AtmosDirection;
pub use ids::{DeviceId, EntityId, GridId, MapId, PipeNetId};
pub use vec2::{tile_order_key, Vector2i};
