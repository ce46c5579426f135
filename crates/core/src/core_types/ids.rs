//! Identifier newtypes for grids, maps, entities, pipe networks and devices.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Raw id value
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a grid (a station, shuttle or debris chunk)
    GridId(u32),
    "grid#"
);
id_type!(
    /// Identifier of a map containing any number of grids
    MapId(u32),
    "map#"
);
id_type!(
    /// Identifier of an external entity (airtight structure, spark source, ...)
    EntityId(u64),
    "ent#"
);
id_type!(
    /// Identifier of a pipe network registered with a grid
    PipeNetId(u32),
    "pipenet#"
);
id_type!(
    /// Identifier of an atmospherics device registered with a grid
    DeviceId(u32),
    "device#"
);
