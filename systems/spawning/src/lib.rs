#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn placement, territory seeding and the tentative spawn preview.

use conquest_core::{CellCoord, CellIndex, EntityId, SpawnResolution};
use conquest_system_expansion::Territory;
use conquest_world::{query, GridSnapshot, SnapshotMismatch, World};
use serde::Deserialize;
use thiserror::Error;

/// Radius of the disk claimed when an entity is seeded (roughly 300 cells).
pub const DEFAULT_SEED_RADIUS: f64 = 9.77;

/// Number of rings searched around an invalid spawn request.
pub const DEFAULT_SEARCH_RADIUS: u32 = 100;

/// Configuration parameters for spawn placement.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Radius of the seeded disk.
    pub seed_radius: f64,
    /// Largest ring searched for a valid spawn cell.
    pub search_radius: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            seed_radius: DEFAULT_SEED_RADIUS,
            search_radius: DEFAULT_SEARCH_RADIUS,
        }
    }
}

/// Location chosen for a spawn request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpawnSite {
    /// Cell that gets seeded.
    pub cell: CellIndex,
    /// How the cell was chosen.
    pub resolution: SpawnResolution,
}

/// Finds the cell to seed for a spawn requested at `candidate`.
///
/// A candidate that is unclaimed land is used as-is. Otherwise square rings
/// of growing radius around it are scanned row by row and the first unclaimed
/// land cell wins. When nothing is found within `search_radius` rings the grid
/// center is returned and the failure is logged.
#[must_use]
pub fn find_valid_spawn(world: &World, candidate: CellIndex, search_radius: u32) -> SpawnSite {
    if query::is_unclaimed_land(world, candidate) {
        return SpawnSite {
            cell: candidate,
            resolution: SpawnResolution::Exact,
        };
    }

    let origin = world
        .coord(candidate)
        .or_else(|| world.coord(world.center()))
        .unwrap_or(CellCoord::new(0, 0));

    for radius in 1..=i64::from(search_radius) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                let Some(cell) = offset_cell(world, origin, dx, dy) else {
                    continue;
                };
                if query::is_unclaimed_land(world, cell) {
                    return SpawnSite {
                        cell,
                        resolution: SpawnResolution::Relocated,
                    };
                }
            }
        }
    }

    tracing::error!(
        candidate = candidate.get(),
        search_radius,
        "no unclaimed land near spawn request, falling back to grid center"
    );
    SpawnSite {
        cell: world.center(),
        resolution: SpawnResolution::Fallback,
    }
}

/// Claims every unclaimed land cell within `radius` of `cell` for `entity`.
///
/// Cells are visited row by row. Once the disk is claimed, its cells that
/// border unclaimed land are queued as the initial frontier in the same order.
pub fn seed(world: &mut World, entity: EntityId, cell: CellIndex, radius: f64) -> Territory {
    let Some(origin) = world.coord(cell) else {
        return Territory::new(entity);
    };

    let reach = radius.max(0.0).ceil() as i64;
    let radius_squared = radius * radius;
    let mut claimed_cells = Vec::new();

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if ((dx * dx + dy * dy) as f64) > radius_squared {
                continue;
            }
            let Some(target) = offset_cell(world, origin, dx, dy) else {
                continue;
            };
            if world.claim(target, entity).is_some() {
                claimed_cells.push(target);
            }
        }
    }

    let claimed = u32::try_from(claimed_cells.len()).unwrap_or(u32::MAX);
    let frontier: Vec<CellIndex> = claimed_cells
        .into_iter()
        .filter(|target| world.is_frontier(*target))
        .collect();

    tracing::debug!(
        entity = entity.get(),
        cell = cell.get(),
        claimed,
        frontier = frontier.len(),
        "seeded territory"
    );

    Territory::seeded(entity, claimed, frontier)
}

fn offset_cell(world: &World, origin: CellCoord, dx: i64, dy: i64) -> Option<CellIndex> {
    let column = u32::try_from(i64::from(origin.column()) + dx).ok()?;
    let row = u32::try_from(i64::from(origin.row()) + dy).ok()?;
    world.cell_at(column, row)
}

/// Errors raised by the spawn preview.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreviewError {
    /// The spawn was already committed.
    #[error("spawn is already committed")]
    Committed,
    /// The clean snapshot does not belong to this grid.
    #[error(transparent)]
    Snapshot(#[from] SnapshotMismatch),
}

/// Spawn seeded by a preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewedSpawn {
    /// Cell the player requested.
    pub requested: CellIndex,
    /// Cell that was seeded.
    pub site: SpawnSite,
}

/// Tentative spawn selection backed by a clean snapshot of the grid.
///
/// Every preview first restores the snapshot, so at most one tentative seed
/// exists at any time. Committing drops the snapshot and freezes the spawn.
#[derive(Debug)]
pub struct SpawnPreview {
    clean: Option<GridSnapshot>,
    active: Option<PreviewedSpawn>,
}

impl SpawnPreview {
    /// Captures the clean grid that every preview starts from.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        Self {
            clean: Some(world.snapshot()),
            active: None,
        }
    }

    /// Restores the clean grid and seeds `entity` near `requested`.
    pub fn preview(
        &mut self,
        world: &mut World,
        entity: EntityId,
        requested: CellIndex,
        config: &SpawnConfig,
    ) -> Result<(PreviewedSpawn, Territory), PreviewError> {
        let clean = self.clean.as_ref().ok_or(PreviewError::Committed)?;
        world.restore(clean)?;

        let site = find_valid_spawn(world, requested, config.search_radius);
        let territory = seed(world, entity, site.cell, config.seed_radius);
        let previewed = PreviewedSpawn { requested, site };
        self.active = Some(previewed);
        Ok((previewed, territory))
    }

    /// Restores the clean grid and forgets the active preview.
    pub fn discard(&mut self, world: &mut World) -> Result<(), PreviewError> {
        let clean = self.clean.as_ref().ok_or(PreviewError::Committed)?;
        world.restore(clean)?;
        self.active = None;
        Ok(())
    }

    /// Freezes the active preview. Returns `None` when nothing was previewed.
    pub fn commit(&mut self) -> Option<PreviewedSpawn> {
        let active = self.active?;
        self.clean = None;
        Some(active)
    }

    /// Preview that is currently seeded, if any.
    #[must_use]
    pub const fn active(&self) -> Option<PreviewedSpawn> {
        self.active
    }

    /// Whether the spawn has been committed.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.clean.is_none()
    }
}
