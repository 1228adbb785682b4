#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid and ownership store for Conquest.
//!
//! The [`World`] owns three parallel per-cell arrays: the ownership tag, the
//! frontier flag and the render buffer, plus the immutable terrain colors the
//! render buffer is repainted from. Every mutation goes through [`World::claim`],
//! [`World::reclassify_interior`] or [`World::restore`], which keeps the
//! frontier flag and render colors consistent with ownership after every single
//! claim.

mod raster;

use std::collections::BTreeMap;

use conquest_core::{blend, CellCoord, CellIndex, EntityId, EntityPalette, Ownership, PackedColor};
use thiserror::Error;

pub use raster::{
    classify, MapGenerationError, TerrainClass, TerrainRaster, DEFAULT_LAND_ALPHA_THRESHOLD,
};

/// Authoritative grid state shared by every entity in a session.
#[derive(Debug)]
pub struct World {
    width: u32,
    height: u32,
    ownership: Vec<Ownership>,
    frontier: Vec<bool>,
    render: Vec<PackedColor>,
    original: Vec<PackedColor>,
    palettes: BTreeMap<EntityId, EntityPalette>,
    claimable: u32,
    revision: u64,
}

impl World {
    /// Builds the grid from an ocean raster and a land raster of equal size.
    ///
    /// Cells whose land alpha is below `land_alpha_threshold` become water and
    /// take the ocean pixel as their terrain color; all other cells become
    /// unclaimed land colored by the land pixel.
    pub fn from_rasters(
        ocean: &TerrainRaster,
        land: &TerrainRaster,
        land_alpha_threshold: u8,
    ) -> Result<Self, MapGenerationError> {
        let ocean_size = (ocean.width(), ocean.height());
        let land_size = (land.width(), land.height());
        if ocean_size != land_size {
            return Err(MapGenerationError::DimensionMismatch {
                ocean: ocean_size,
                land: land_size,
            });
        }

        let (width, height) = land_size;
        let cells = raster::cell_count(width, height)?;
        let mut ownership = Vec::with_capacity(cells);
        let mut original = Vec::with_capacity(cells);
        let mut claimable: u32 = 0;

        for index in 0..cells {
            let land_pixel = land.pixel(index).unwrap_or(PackedColor::TRANSPARENT);
            match classify(land_pixel.alpha(), land_alpha_threshold) {
                TerrainClass::Water => {
                    ownership.push(Ownership::Water);
                    original.push(ocean.pixel(index).unwrap_or(PackedColor::TRANSPARENT));
                }
                TerrainClass::Land => {
                    ownership.push(Ownership::Unclaimed);
                    original.push(land_pixel);
                    claimable = claimable.saturating_add(1);
                }
            }
        }

        tracing::info!(width, height, claimable, "generated grid from terrain rasters");

        Ok(Self {
            width,
            height,
            ownership,
            frontier: vec![false; cells],
            render: original.clone(),
            original,
            palettes: BTreeMap::new(),
            claimable,
            revision: 0,
        })
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ownership.len()
    }

    /// Whether the grid has no cells. Always `false` for generated grids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ownership.is_empty()
    }

    /// Number of land cells, fixed at generation time.
    #[must_use]
    pub const fn claimable_cells(&self) -> u32 {
        self.claimable
    }

    /// Monotonic counter bumped by every mutation of the render buffer.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the index addresses a cell of this grid.
    #[must_use]
    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.as_usize() < self.ownership.len()
    }

    /// Index of the cell at the provided column and row.
    #[must_use]
    pub fn cell_at(&self, column: u32, row: u32) -> Option<CellIndex> {
        if column >= self.width || row >= self.height {
            return None;
        }
        Some(CellIndex::new(row * self.width + column))
    }

    /// Column and row of the provided cell.
    #[must_use]
    pub fn coord(&self, cell: CellIndex) -> Option<CellCoord> {
        if !self.contains(cell) {
            return None;
        }
        Some(CellCoord::new(
            cell.get() % self.width,
            cell.get() / self.width,
        ))
    }

    /// Cell in the middle of the grid.
    #[must_use]
    pub const fn center(&self) -> CellIndex {
        CellIndex::new((self.height / 2) * self.width + self.width / 2)
    }

    /// Ownership tag of the cell. Cells outside the grid read as water.
    #[must_use]
    pub fn ownership(&self, cell: CellIndex) -> Ownership {
        self.ownership
            .get(cell.as_usize())
            .copied()
            .unwrap_or(Ownership::Water)
    }

    /// Whether the cell is owned and borders unclaimed land.
    #[must_use]
    pub fn is_frontier(&self, cell: CellIndex) -> bool {
        self.frontier.get(cell.as_usize()).copied().unwrap_or(false)
    }

    /// In-grid 4-neighbors in the fixed order east, west, south, north.
    ///
    /// Horizontal neighbors never wrap onto the adjacent row.
    pub fn neighbors(&self, cell: CellIndex) -> impl Iterator<Item = CellIndex> {
        self.neighbor_slots(cell).into_iter().flatten()
    }

    fn neighbor_slots(&self, cell: CellIndex) -> [Option<CellIndex>; 4] {
        if !self.contains(cell) {
            return [None; 4];
        }

        let index = cell.get();
        let column = index % self.width;
        let row = index / self.width;
        [
            (column + 1 < self.width).then(|| CellIndex::new(index + 1)),
            (column > 0).then(|| CellIndex::new(index - 1)),
            (row + 1 < self.height).then(|| CellIndex::new(index + self.width)),
            (row > 0).then(|| CellIndex::new(index - self.width)),
        ]
    }

    /// Whether any in-grid neighbor of the cell is unclaimed land.
    #[must_use]
    pub fn has_unclaimed_neighbor(&self, cell: CellIndex) -> bool {
        self.neighbors(cell)
            .any(|neighbor| self.ownership(neighbor).is_unclaimed())
    }

    /// Registers the palette used to paint territory owned by `entity`.
    ///
    /// Cells that are already painted keep their colors until they are repainted.
    pub fn register_palette(&mut self, entity: EntityId, palette: EntityPalette) {
        let _ = self.palettes.insert(entity, palette);
    }

    /// Palette registered for `entity`, or the default remote palette.
    #[must_use]
    pub fn palette(&self, entity: EntityId) -> EntityPalette {
        self.palettes
            .get(&entity)
            .copied()
            .unwrap_or(EntityPalette::DEFAULT_REMOTE)
    }

    /// Claims an unclaimed land cell for `entity`.
    ///
    /// Returns `None` without touching any state when the cell is water, already
    /// owned or outside the grid. Otherwise the frontier flag of the claimed cell
    /// and of every owned neighbor is recomputed, and owned cells that no longer
    /// border unclaimed land are repainted as interior.
    pub fn claim(&mut self, cell: CellIndex, entity: EntityId) -> Option<ClaimEffect> {
        if !self.ownership(cell).is_unclaimed() {
            return None;
        }

        let index = cell.as_usize();
        self.ownership[index] = Ownership::Owned(entity);
        self.frontier[index] = true;
        self.render[index] = self.palette(entity).border();
        self.revision = self.revision.wrapping_add(1);

        let frontier = if self.has_unclaimed_neighbor(cell) {
            true
        } else {
            let _ = self.reclassify_interior(cell);
            false
        };

        let mut settled = [None; 4];
        for (slot, neighbor) in settled.iter_mut().zip(self.neighbor_slots(cell)) {
            let Some(neighbor) = neighbor else {
                continue;
            };
            if self.is_frontier(neighbor) && !self.has_unclaimed_neighbor(neighbor) {
                let _ = self.reclassify_interior(neighbor);
                *slot = Some(neighbor);
            }
        }

        Some(ClaimEffect { frontier, settled })
    }

    /// Clears the frontier flag of an owned cell and paints it with the owner's
    /// inner color blended over the terrain.
    ///
    /// Returns `false` when the cell is not owned.
    pub fn reclassify_interior(&mut self, cell: CellIndex) -> bool {
        let Some(owner) = self.ownership(cell).owner() else {
            return false;
        };

        let index = cell.as_usize();
        self.frontier[index] = false;
        self.render[index] = blend(self.original[index], self.palette(owner).inner());
        self.revision = self.revision.wrapping_add(1);
        true
    }

    /// Captures ownership, frontier flags and render colors.
    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            ownership: self.ownership.clone(),
            frontier: self.frontier.clone(),
            render: self.render.clone(),
        }
    }

    /// Restores a snapshot previously captured from this grid.
    pub fn restore(&mut self, snapshot: &GridSnapshot) -> Result<(), SnapshotMismatch> {
        if snapshot.width != self.width || snapshot.height != self.height {
            tracing::warn!(
                grid_width = self.width,
                grid_height = self.height,
                snapshot_width = snapshot.width,
                snapshot_height = snapshot.height,
                "refusing to restore snapshot from a different grid"
            );
            return Err(SnapshotMismatch {
                grid: (self.width, self.height),
                snapshot: (snapshot.width, snapshot.height),
            });
        }

        self.ownership.clone_from(&snapshot.ownership);
        self.frontier.clone_from(&snapshot.frontier);
        self.render.clone_from(&snapshot.render);
        self.revision = self.revision.wrapping_add(1);
        Ok(())
    }
}

/// Side effects of a successful claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimEffect {
    frontier: bool,
    settled: [Option<CellIndex>; 4],
}

impl ClaimEffect {
    /// Whether the claimed cell borders unclaimed land.
    #[must_use]
    pub const fn is_frontier(&self) -> bool {
        self.frontier
    }

    /// Neighboring owned cells, of any owner, that became interior because of the claim.
    pub fn settled(&self) -> impl Iterator<Item = CellIndex> + '_ {
        self.settled.iter().flatten().copied()
    }
}

/// Copy of the mutable per-cell arrays of a [`World`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridSnapshot {
    width: u32,
    height: u32,
    ownership: Vec<Ownership>,
    frontier: Vec<bool>,
    render: Vec<PackedColor>,
}

/// Raised when a snapshot is restored onto a grid of different dimensions.
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "snapshot of {}x{} cannot be restored onto a {}x{} grid",
    .snapshot.0, .snapshot.1, .grid.0, .grid.1
)]
pub struct SnapshotMismatch {
    /// Dimensions of the grid.
    pub grid: (u32, u32),
    /// Dimensions recorded in the snapshot.
    pub snapshot: (u32, u32),
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use conquest_core::{CellIndex, EntityId, Ownership, PackedColor};

    use super::World;

    /// Render buffer in row-major order, ready to upload to a surface.
    #[must_use]
    pub fn render_buffer(world: &World) -> &[PackedColor] {
        &world.render
    }

    /// Terrain color of the cell before any territory was painted.
    #[must_use]
    pub fn terrain_color(world: &World, cell: CellIndex) -> Option<PackedColor> {
        world.original.get(cell.as_usize()).copied()
    }

    /// Whether the cell is land that nobody owns yet.
    #[must_use]
    pub fn is_unclaimed_land(world: &World, cell: CellIndex) -> bool {
        world.ownership(cell).is_unclaimed()
    }

    /// Number of cells owned by `entity`.
    #[must_use]
    pub fn owned_count(world: &World, entity: EntityId) -> u32 {
        let owned = world
            .ownership
            .iter()
            .filter(|ownership| ownership.is_owned_by(entity))
            .count();
        u32::try_from(owned).unwrap_or(u32::MAX)
    }

    /// Cells owned by `entity` in ascending index order.
    #[must_use]
    pub fn owned_cells(world: &World, entity: EntityId) -> Vec<CellIndex> {
        cells_matching(world, |index| world.ownership[index].is_owned_by(entity))
    }

    /// Frontier cells owned by `entity` in ascending index order.
    #[must_use]
    pub fn frontier_cells(world: &World, entity: EntityId) -> Vec<CellIndex> {
        cells_matching(world, |index| {
            world.frontier[index] && world.ownership[index].is_owned_by(entity)
        })
    }

    /// Every ownership tag in row-major order.
    #[must_use]
    pub fn ownership_view(world: &World) -> &[Ownership] {
        &world.ownership
    }

    fn cells_matching(world: &World, predicate: impl Fn(usize) -> bool) -> Vec<CellIndex> {
        (0..world.ownership.len())
            .filter(|index| predicate(*index))
            .filter_map(|index| u32::try_from(index).ok().map(CellIndex::new))
            .collect()
    }
}
