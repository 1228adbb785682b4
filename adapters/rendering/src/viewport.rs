use conquest_core::{CellCoord, CellIndex};
use glam::Vec2;

/// Placement of the grid on screen.
///
/// Cells are square. The grid is scaled uniformly to fit the screen and
/// centred along the axis with spare room.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    origin: Vec2,
    cell_size: f32,
    columns: u32,
    rows: u32,
}

impl Viewport {
    /// Creates a viewport with an explicit origin and cell size.
    #[must_use]
    pub const fn new(origin: Vec2, cell_size: f32, columns: u32, rows: u32) -> Self {
        Self {
            origin,
            cell_size,
            columns,
            rows,
        }
    }

    /// Fits a `columns` × `rows` grid inside a screen of the given size.
    #[must_use]
    pub fn fit(screen: Vec2, columns: u32, rows: u32) -> Self {
        if columns == 0 || rows == 0 {
            return Self::new(Vec2::ZERO, 0.0, columns, rows);
        }

        let grid = Vec2::new(columns as f32, rows as f32);
        let cell_size = (screen.x / grid.x).min(screen.y / grid.y).max(0.0);
        let origin = ((screen - grid * cell_size) * 0.5).max(Vec2::ZERO);
        Self::new(origin, cell_size, columns, rows)
    }

    /// Screen position of the grid's top-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Side length of one cell in screen units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Size of the whole grid in screen units.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.columns as f32, self.rows as f32) * self.cell_size
    }

    /// Translates a screen position into the cell underneath it.
    ///
    /// Positions outside the displayed grid yield `None`.
    #[must_use]
    pub fn cell_at(&self, screen: Vec2) -> Option<CellIndex> {
        if self.cell_size <= 0.0 {
            return None;
        }

        let local = (screen - self.origin) / self.cell_size;
        if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }

        let column = local.x.floor() as u32;
        let row = local.y.floor() as u32;
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let index = u64::from(row) * u64::from(self.columns) + u64::from(column);
        u32::try_from(index).ok().map(CellIndex::new)
    }

    /// Screen position of the top-left corner of `coord`.
    #[must_use]
    pub fn cell_origin(&self, coord: CellCoord) -> Vec2 {
        self.origin + Vec2::new(coord.column() as f32, coord.row() as f32) * self.cell_size
    }

    /// Screen position of the centre of `coord`.
    #[must_use]
    pub fn cell_center(&self, coord: CellCoord) -> Vec2 {
        self.cell_origin(coord) + Vec2::splat(self.cell_size * 0.5)
    }
}
