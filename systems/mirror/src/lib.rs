#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local mirrors of remote entities.
//!
//! The session peer only announces spawns, pixel grants and departures. Each
//! client replays those announcements through the same expansion engine it
//! uses for the local player, so every client derives the same territory
//! without the peer ever sending cell lists. Grants are treated as a pixel
//! budget: the mirror drains its pending counter a few cells per tick and
//! never claims more than the local grid allows.

use std::collections::{BTreeMap, BTreeSet};

use conquest_core::{
    CellIndex, EntityId, EntityPalette, Event, Notification, RgbColor, SpawnResolution,
};
use conquest_system_expansion::{expand, ExpansionBudget, ExpansionConfig, Territory};
use conquest_system_spawning::{find_valid_spawn, seed, SpawnConfig};
use conquest_world::World;
use serde::Deserialize;

/// Largest number of cells a mirror claims per tick.
pub const DEFAULT_PER_TICK_CAP: u32 = 20;

/// Configuration parameters for mirrored entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Largest number of cells a mirror claims per tick.
    pub per_tick_cap: u32,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            per_tick_cap: DEFAULT_PER_TICK_CAP,
        }
    }
}

/// Locally simulated copy of a remote entity.
#[derive(Clone, Debug)]
pub struct MirrorEntity {
    entity: EntityId,
    requested: CellIndex,
    seeded_at: CellIndex,
    resolution: SpawnResolution,
    color: RgbColor,
    pending: u32,
    territory: Territory,
}

impl MirrorEntity {
    /// Remote entity mirrored by this record.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Spawn cell announced by the peer.
    #[must_use]
    pub const fn requested(&self) -> CellIndex {
        self.requested
    }

    /// Cell the mirror was seeded at.
    #[must_use]
    pub const fn seeded_at(&self) -> CellIndex {
        self.seeded_at
    }

    /// How the seed cell was chosen.
    #[must_use]
    pub const fn resolution(&self) -> SpawnResolution {
        self.resolution
    }

    /// Color the mirror is painted with.
    #[must_use]
    pub const fn color(&self) -> RgbColor {
        self.color
    }

    /// Granted pixels not yet claimed.
    #[must_use]
    pub const fn pending(&self) -> u32 {
        self.pending
    }

    /// Locally simulated territory.
    #[must_use]
    pub const fn territory(&self) -> &Territory {
        &self.territory
    }
}

/// Every remote entity known to the local client, keyed by id.
#[derive(Debug)]
pub struct MirrorRoster {
    local: EntityId,
    config: MirrorConfig,
    mirrors: BTreeMap<EntityId, MirrorEntity>,
    retired: BTreeSet<EntityId>,
}

impl MirrorRoster {
    /// Creates an empty roster for a session whose local entity is `local`.
    #[must_use]
    pub fn new(local: EntityId, config: MirrorConfig) -> Self {
        Self {
            local,
            config,
            mirrors: BTreeMap::new(),
            retired: BTreeSet::new(),
        }
    }

    /// Mirror tracking `entity`, if any.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&MirrorEntity> {
        self.mirrors.get(&entity)
    }

    /// Mirrors in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &MirrorEntity> {
        self.mirrors.values()
    }

    /// Number of tracked mirrors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    /// Whether no mirror is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// Applies a notification received from the session peer.
    pub fn apply(
        &mut self,
        world: &mut World,
        notification: &Notification,
        spawn: &SpawnConfig,
        out: &mut Vec<Event>,
    ) {
        match *notification {
            Notification::SpawnAssigned {
                entity,
                cell,
                color,
            } => self.spawn_assigned(world, entity, cell, color, spawn, out),
            Notification::TerritoryGranted {
                entity,
                amount,
                color,
            } => self.territory_granted(world, entity, amount, color),
            Notification::EntityRemoved { entity } => {
                if self.mirrors.remove(&entity).is_some() {
                    let _ = self.retired.insert(entity);
                    out.push(Event::MirrorRemoved { entity });
                }
            }
        }
    }

    fn spawn_assigned(
        &mut self,
        world: &mut World,
        entity: EntityId,
        cell: CellIndex,
        color: Option<RgbColor>,
        spawn: &SpawnConfig,
        out: &mut Vec<Event>,
    ) {
        if entity == self.local {
            return;
        }
        if self.retired.contains(&entity) {
            tracing::warn!(entity = entity.get(), "ignoring spawn of a removed entity");
            return;
        }
        if let Some(mirror) = self.mirrors.get_mut(&entity) {
            if let Some(color) = color {
                mirror.color = color;
                world.register_palette(entity, EntityPalette::from_rgb(color));
            }
            return;
        }

        let color = color.unwrap_or(RgbColor::DEFAULT_REMOTE);
        world.register_palette(entity, EntityPalette::from_rgb(color));
        let site = find_valid_spawn(world, cell, spawn.search_radius);
        let territory = seed(world, entity, site.cell, spawn.seed_radius);
        out.push(Event::MirrorSeeded {
            entity,
            cell: site.cell,
            resolution: site.resolution,
        });
        out.push(Event::TerritoryChanged {
            entity,
            claimed: territory.claimed(),
        });

        let _ = self.mirrors.insert(
            entity,
            MirrorEntity {
                entity,
                requested: cell,
                seeded_at: site.cell,
                resolution: site.resolution,
                color,
                pending: 0,
                territory,
            },
        );
    }

    fn territory_granted(
        &mut self,
        world: &mut World,
        entity: EntityId,
        amount: u32,
        color: Option<RgbColor>,
    ) {
        if entity == self.local {
            return;
        }
        let Some(mirror) = self.mirrors.get_mut(&entity) else {
            tracing::warn!(
                entity = entity.get(),
                amount,
                "territory granted to an unknown entity"
            );
            return;
        };

        mirror.pending = mirror.pending.saturating_add(amount);
        if let Some(color) = color {
            mirror.color = color;
            world.register_palette(entity, EntityPalette::from_rgb(color));
        }
    }

    /// Seeds every mirror again at its announced spawn, in ascending id order.
    ///
    /// Used after the grid was restored to a snapshot that predates the seeds.
    pub fn reseed(&mut self, world: &mut World, spawn: &SpawnConfig, out: &mut Vec<Event>) {
        for mirror in self.mirrors.values_mut() {
            world.register_palette(mirror.entity, EntityPalette::from_rgb(mirror.color));
            let site = find_valid_spawn(world, mirror.requested, spawn.search_radius);
            mirror.territory = seed(world, mirror.entity, site.cell, spawn.seed_radius);
            mirror.seeded_at = site.cell;
            mirror.resolution = site.resolution;
            out.push(Event::MirrorSeeded {
                entity: mirror.entity,
                cell: site.cell,
                resolution: site.resolution,
            });
        }
    }

    /// Drains pending grants of every mirror in ascending id order.
    pub fn advance(&mut self, world: &mut World, expansion: &ExpansionConfig, out: &mut Vec<Event>) {
        for mirror in self.mirrors.values_mut() {
            if mirror.pending == 0 {
                continue;
            }

            let budget =
                ExpansionBudget::for_pixels(expansion, mirror.pending, self.config.per_tick_cap);
            let outcome = expand(world, &mut mirror.territory, budget);
            mirror.pending = mirror.pending.saturating_sub(outcome.claimed);

            if outcome.claimed > 0 {
                out.push(Event::TerritoryChanged {
                    entity: mirror.entity,
                    claimed: mirror.territory.claimed(),
                });
            }

            if mirror.pending > 0 && outcome.claimed == 0 {
                let _ = mirror.territory.prune_stale(world);
            }
            if mirror.pending > 0 && mirror.territory.frontier().is_empty() {
                tracing::debug!(
                    entity = mirror.entity.get(),
                    dropped = mirror.pending,
                    "mirror has no frontier left, dropping pending grant"
                );
                out.push(Event::MirrorStalled {
                    entity: mirror.entity,
                    dropped: mirror.pending,
                });
                mirror.pending = 0;
            }
        }
    }
}
