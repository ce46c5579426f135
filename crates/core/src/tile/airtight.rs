//! Blocked-direction data derived from airtight entities

use crate::core_types::{AtmosDirection, EntityId, Vector2i};
use serde::{Deserialize, Serialize};

/// An entity that blocks gas flow out of the tile it stands on (wall, door, window)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirtightEntity {
    pub id: EntityId,
    pub tile: Vector2i,
    /// Directions this entity seals off
    pub blocked: AtmosDirection,
    /// Disabled entities (an open door) block nothing
    pub enabled: bool,
    /// Remove the tile's air entirely while it is sealed on every side
    pub no_air_when_fully_blocked: bool,
}

impl AirtightEntity {
    /// A full-tile wall
    pub fn wall(id: EntityId, tile: Vector2i) -> Self {
        Self {
            id,
            tile,
            blocked: AtmosDirection::ALL,
            enabled: true,
            no_air_when_fully_blocked: true,
        }
    }

    /// A door that blocks every side while closed but keeps its tile's air
    pub fn door(id: EntityId, tile: Vector2i, closed: bool) -> Self {
        Self {
            id,
            tile,
            blocked: AtmosDirection::ALL,
            enabled: closed,
            no_air_when_fully_blocked: false,
        }
    }
}

/// Union of every enabled airtight entity on one tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirtightData {
    pub blocked: AtmosDirection,
    pub no_air_when_fully_blocked: bool,
}

impl AirtightData {
    /// Fold a set of entities into one tile's data
    pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a AirtightEntity>) -> Self {
        let mut data = Self::default();
        for entity in entities.into_iter().filter(|e| e.enabled) {
            data.blocked |= entity.blocked;
            data.no_air_when_fully_blocked |= entity.no_air_when_fully_blocked;
        }
        data
    }

    /// Whether gas may not leave this tile towards `direction`.
    ///
    /// A diagonal counts as blocked when it or either cardinal it is made of is blocked.
    pub fn is_blocked(&self, direction: AtmosDirection) -> bool {
        if direction.is_diagonal() {
            let (a, b) = direction.cardinal_components();
            self.blocked.intersects(direction | a | b)
        } else {
            self.blocked.intersects(direction)
        }
    }

    /// Every cardinal side is sealed
    pub fn is_fully_blocked(&self) -> bool {
        self.blocked.contains(AtmosDirection::ALL_CARDINALS)
    }

    /// Sealed on every side by something that removes the air (a wall)
    pub fn is_solid(&self) -> bool {
        self.is_fully_blocked() && self.no_air_when_fully_blocked
    }
}
