#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Conquest engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative grid, and the pure expansion systems. Adapters submit
//! [`Command`] values describing local intent, remote peers are represented by
//! [`Notification`] values queued until the next tick boundary, and the
//! simulation answers with [`Event`] reports that the economy and presentation
//! layers consume. Every type here is plain data so that two clients fed the
//! same command stream reach byte-identical state.

mod color;

use serde::{Deserialize, Serialize};

pub use color::{
    blend, ColorParseError, EntityPalette, PackedColor, RgbColor, BORDER_ALPHA, INNER_ALPHA,
};

/// Opaque identifier naming an entity that can own territory.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Row-major index of a cell inside the grid (`y * width + x`).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellIndex(u32);

impl CellIndex {
    /// Creates a new cell index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index usable for slice access.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Column and row of a cell inside the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Ownership tag stored for every cell.
///
/// Transitions are one-way: `Unclaimed` may become `Owned`, `Owned` never
/// changes owner except through a snapshot restore, and `Water` is permanent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    /// Impassable ocean.
    Water,
    /// Land that nobody owns yet.
    Unclaimed,
    /// Land owned by the identified entity.
    Owned(EntityId),
}

impl Ownership {
    /// Owner of the cell, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<EntityId> {
        match self {
            Self::Owned(entity) => Some(*entity),
            Self::Water | Self::Unclaimed => None,
        }
    }

    /// Whether the cell can still be claimed.
    #[must_use]
    pub const fn is_unclaimed(&self) -> bool {
        matches!(self, Self::Unclaimed)
    }

    /// Whether the cell is owned by the provided entity.
    #[must_use]
    pub fn is_owned_by(&self, entity: EntityId) -> bool {
        *self == Self::Owned(entity)
    }
}

/// Phase of a local session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// The local player is still choosing where to start. Previews are allowed.
    SpawnSelection,
    /// The spawn is committed and territory expands every tick.
    Playing,
}

/// How a requested spawn cell was turned into an actual seed location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnResolution {
    /// The requested cell was valid as-is.
    Exact,
    /// The nearest valid cell found by the ring search was used instead.
    Relocated,
    /// No valid cell was found within the search radius and the grid center was used.
    Fallback,
}

/// Messages received from the authoritative session peer.
///
/// Notifications are queued and applied only at tick boundaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// A remote entity was assigned a spawn location.
    SpawnAssigned {
        /// Entity that spawned.
        entity: EntityId,
        /// Requested spawn cell.
        cell: CellIndex,
        /// Optional color hint for the entity.
        color: Option<RgbColor>,
    },
    /// A remote entity was granted additional pixels to expand by.
    TerritoryGranted {
        /// Entity receiving the grant.
        entity: EntityId,
        /// Number of pixels granted.
        amount: u32,
        /// Optional color hint for the entity.
        color: Option<RgbColor>,
    },
    /// A remote entity left the session.
    EntityRemoved {
        /// Entity that left.
        entity: EntityId,
    },
}

/// Commands that drive a local session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Requests a tentative spawn for the local entity at the provided cell.
    PreviewSpawn {
        /// Cell the player pointed at.
        cell: CellIndex,
    },
    /// Commits the active preview and starts gameplay.
    CommitSpawn,
    /// Moves a fraction of the available troops into the expansion pool.
    DispatchAttack {
        /// Troops currently held by the local player.
        troops: u64,
        /// Percentage of `troops` to dispatch, clamped to `1..=100`.
        ratio_percent: u8,
    },
    /// Queues a notification for the next tick boundary.
    Deliver {
        /// Notification received from the session peer.
        notification: Notification,
    },
    /// Advances the simulation by a single tick.
    Tick {
        /// Replaces the local banked resource before expansion runs, when provided.
        banked_resource: Option<f64>,
    },
}

/// Reports broadcast after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A tick completed.
    TickAdvanced {
        /// Number of ticks processed so far.
        tick: u64,
    },
    /// The session moved to a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: SessionPhase,
    },
    /// A tentative local spawn was seeded.
    SpawnPreviewed {
        /// Local entity.
        entity: EntityId,
        /// Cell the player requested.
        requested: CellIndex,
        /// Cell that was actually seeded.
        cell: CellIndex,
        /// How the seed location was resolved.
        resolution: SpawnResolution,
    },
    /// A preview request was ignored because the cell is not unclaimed land
    /// or the session is no longer selecting a spawn.
    PreviewRejected {
        /// Cell the player requested.
        cell: CellIndex,
    },
    /// The local spawn was committed.
    SpawnCommitted {
        /// Local entity.
        entity: EntityId,
        /// Seed cell.
        cell: CellIndex,
    },
    /// Troops were moved into the expansion pool.
    AttackDispatched {
        /// Local entity.
        entity: EntityId,
        /// Troops moved into the pool.
        amount: u64,
    },
    /// The number of cells owned by an entity changed.
    TerritoryChanged {
        /// Entity whose territory changed.
        entity: EntityId,
        /// Total number of owned cells.
        claimed: u32,
    },
    /// Summary of a local expansion pass that spent resources.
    ExpansionReported {
        /// Local entity.
        entity: EntityId,
        /// Cells claimed during the tick.
        pixels_claimed: u32,
        /// Resource spent during the tick.
        cost_spent: f64,
    },
    /// The banked resource dropped to zero.
    ResourceExhausted {
        /// Local entity.
        entity: EntityId,
    },
    /// A remote entity was seeded into the grid.
    MirrorSeeded {
        /// Remote entity.
        entity: EntityId,
        /// Seed cell.
        cell: CellIndex,
        /// How the seed location was resolved.
        resolution: SpawnResolution,
    },
    /// A remote entity stopped expanding.
    MirrorRemoved {
        /// Remote entity.
        entity: EntityId,
    },
    /// A remote entity could not spend its pending pixels and dropped them.
    MirrorStalled {
        /// Remote entity.
        entity: EntityId,
        /// Pending pixels that were discarded.
        dropped: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn notification_round_trips_through_bincode() {
        assert_round_trip(&Notification::SpawnAssigned {
            entity: EntityId::new(7),
            cell: CellIndex::new(1_200),
            color: Some(RgbColor::new(0xef, 0x44, 0x44)),
        });
    }

    #[test]
    fn command_stream_round_trips_through_bincode() {
        let commands = vec![
            Command::PreviewSpawn {
                cell: CellIndex::new(42),
            },
            Command::CommitSpawn,
            Command::DispatchAttack {
                troops: 1_000,
                ratio_percent: 20,
            },
            Command::Tick {
                banked_resource: Some(12.5),
            },
        ];
        assert_round_trip(&commands);
    }

    #[test]
    fn ownership_reports_owner_only_for_owned_cells() {
        let entity = EntityId::new(3);
        assert_eq!(Ownership::Owned(entity).owner(), Some(entity));
        assert_eq!(Ownership::Unclaimed.owner(), None);
        assert_eq!(Ownership::Water.owner(), None);
        assert!(Ownership::Owned(entity).is_owned_by(entity));
        assert!(!Ownership::Owned(entity).is_owned_by(EntityId::new(4)));
    }

    #[test]
    fn cell_index_converts_to_slice_index() {
        assert_eq!(CellIndex::new(1_920).as_usize(), 1_920);
    }
}
