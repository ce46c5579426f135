//! Prioritized structural update queues
//!
//! Changes that affect tile topology are not applied the moment they happen.
//! They are submitted here and drained at the start of the next grid tick, in
//! class priority order:
//!
//! 1. collision/occupancy (airtight entity added or removed)
//! 2. access-reader (door opened or closed)
//! 3. tile terrain
//! 4. movement (airtight entity relocated)
//!
//! Classes 1-3 are always drained completely. Movement is drained up to a
//! per-tick budget unless its backlog grows past a hard cap, in which case the
//! whole backlog is drained at once.

use crate::core_types::{EntityId, Vector2i};
use crate::grid::terrain::TerrainTile;
use crate::tile::AirtightEntity;
use std::collections::VecDeque;
use tracing::warn;

/// A pending structural change
#[derive(Debug, Clone, PartialEq)]
pub enum AtmosUpdate {
    /// A new airtight entity appeared on a tile
    AirtightAdded(AirtightEntity),
    /// An airtight entity was destroyed
    AirtightRemoved(EntityId),
    /// An airtight entity started or stopped blocking (door opened or closed)
    AirtightToggled { entity: EntityId, enabled: bool },
    /// A terrain tile was placed, replaced or removed (`None`)
    TerrainChanged {
        tile: Vector2i,
        terrain: Option<TerrainTile>,
    },
    /// An airtight entity moved to another tile
    AirtightMoved { entity: EntityId, to: Vector2i },
}

/// Priority class of an [`AtmosUpdate`], highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateClass {
    Collision = 0,
    Access = 1,
    Terrain = 2,
    Movement = 3,
}

impl UpdateClass {
    pub const COUNT: usize = 4;
    pub const ALL: [UpdateClass; UpdateClass::COUNT] = [
        UpdateClass::Collision,
        UpdateClass::Access,
        UpdateClass::Terrain,
        UpdateClass::Movement,
    ];
}

impl AtmosUpdate {
    pub fn class(&self) -> UpdateClass {
        match self {
            AtmosUpdate::AirtightAdded(_) | AtmosUpdate::AirtightRemoved(_) => UpdateClass::Collision,
            AtmosUpdate::AirtightToggled { .. } => UpdateClass::Access,
            AtmosUpdate::TerrainChanged { .. } => UpdateClass::Terrain,
            AtmosUpdate::AirtightMoved { .. } => UpdateClass::Movement,
        }
    }
}

/// Per-class FIFO queues for one grid
#[derive(Debug, Default)]
pub struct UpdateQueues {
    queues: [VecDeque<AtmosUpdate>; UpdateClass::COUNT],
    /// Updates handed out by the last drain
    drained_last_tick: usize,
    /// Number of times the movement backlog exceeded its cap
    force_drains: u64,
}

impl UpdateQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an update for the next tick
    pub fn submit(&mut self, update: AtmosUpdate) {
        self.queues[update.class() as usize].push_back(update);
    }

    /// Updates waiting in one class
    pub fn pending(&self, class: UpdateClass) -> usize {
        self.queues[class as usize].len()
    }

    /// Updates waiting in all classes
    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    pub fn drained_last_tick(&self) -> usize {
        self.drained_last_tick
    }

    pub fn force_drains(&self) -> u64 {
        self.force_drains
    }

    /// Take this tick's updates in priority order.
    ///
    /// # Arguments
    ///
    /// * `movement_budget` - Movement updates taken when the backlog is under the cap
    /// * `movement_backlog_cap` - Backlog size above which movement is drained completely
    pub fn drain(&mut self, movement_budget: usize, movement_backlog_cap: usize) -> Vec<AtmosUpdate> {
        let mut out = Vec::with_capacity(self.len().min(movement_budget.saturating_add(64)));
        for class in [UpdateClass::Collision, UpdateClass::Access, UpdateClass::Terrain] {
            out.extend(self.queues[class as usize].drain(..));
        }

        let movement = &mut self.queues[UpdateClass::Movement as usize];
        if movement.len() > movement_backlog_cap {
            warn!(
                backlog = movement.len(),
                cap = movement_backlog_cap,
                "Movement update backlog over cap, draining all"
            );
            self.force_drains += 1;
            out.extend(movement.drain(..));
        } else {
            let take = movement.len().min(movement_budget);
            out.extend(movement.drain(..take));
        }

        self.drained_last_tick = out.len();
        out
    }

    /// Append every update pending in `other`, keeping class order (grid merge)
    pub fn absorb(&mut self, mut other: UpdateQueues) {
        for (own, theirs) in self.queues.iter_mut().zip(other.queues.iter_mut()) {
            own.extend(theirs.drain(..));
        }
    }

    /// Drop every pending update (grid removal)
    pub fn clear(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
        self.drained_last_tick = 0;
    }
}
