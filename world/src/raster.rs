//! Terrain rasters consumed when generating the grid.

use conquest_core::PackedColor;
use thiserror::Error;

/// Land-raster alpha at or above which a cell is considered land.
pub const DEFAULT_LAND_ALPHA_THRESHOLD: u8 = 50;

/// Terrain class derived from the land raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerrainClass {
    /// Impassable water.
    Water,
    /// Claimable land.
    Land,
}

/// Classifies a cell from the alpha of its land-raster pixel.
#[must_use]
pub const fn classify(land_alpha: u8, threshold: u8) -> TerrainClass {
    if land_alpha < threshold {
        TerrainClass::Water
    } else {
        TerrainClass::Land
    }
}

/// Failures raised while turning rasters into a grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapGenerationError {
    /// A raster had a zero dimension.
    #[error("raster has no pixels ({width}x{height})")]
    EmptyRaster {
        /// Raster width.
        width: u32,
        /// Raster height.
        height: u32,
    },
    /// The pixel buffer does not match the declared dimensions.
    #[error("raster buffer holds {actual} bytes but {expected} were expected")]
    RasterLength {
        /// Bytes required by the dimensions.
        expected: usize,
        /// Bytes provided.
        actual: usize,
    },
    /// The ocean and land rasters disagree on their dimensions.
    #[error(
        "ocean raster is {}x{} but land raster is {}x{}",
        .ocean.0, .ocean.1, .land.0, .land.1
    )]
    DimensionMismatch {
        /// Ocean raster dimensions.
        ocean: (u32, u32),
        /// Land raster dimensions.
        land: (u32, u32),
    },
    /// The raster has more cells than a cell index can address.
    #[error("raster {width}x{height} exceeds the addressable cell count")]
    TooLarge {
        /// Raster width.
        width: u32,
        /// Raster height.
        height: u32,
    },
}

/// RGBA raster with row-major pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainRaster {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl TerrainRaster {
    /// Wraps an RGBA byte buffer.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, MapGenerationError> {
        let cells = cell_count(width, height)?;
        let expected = cells * 4;
        if rgba.len() != expected {
            return Err(MapGenerationError::RasterLength {
                expected,
                actual: rgba.len(),
            });
        }

        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Creates a raster where every pixel has the provided color.
    pub fn filled(width: u32, height: u32, color: PackedColor) -> Result<Self, MapGenerationError> {
        let cells = cell_count(width, height)?;
        let rgba = color.to_rgba().repeat(cells);
        Self::new(width, height, rgba)
    }

    /// Raster width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    /// Pixel at the provided row-major index.
    #[must_use]
    pub fn pixel(&self, index: usize) -> Option<PackedColor> {
        let start = index.checked_mul(4)?;
        let bytes = self.rgba.get(start..start + 4)?;
        Some(PackedColor::pack(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    /// Overwrites a single pixel. Returns `false` when the position is outside the raster.
    pub fn set_pixel(&mut self, column: u32, row: u32, color: PackedColor) -> bool {
        if column >= self.width || row >= self.height {
            return false;
        }

        let Some(index) = usize::try_from(row)
            .ok()
            .zip(usize::try_from(column).ok())
            .zip(usize::try_from(self.width).ok())
            .map(|((row, column), width)| (row * width + column) * 4)
        else {
            return false;
        };

        match self.rgba.get_mut(index..index + 4) {
            Some(slot) => {
                slot.copy_from_slice(&color.to_rgba());
                true
            }
            None => false,
        }
    }
}

pub(crate) fn cell_count(width: u32, height: u32) -> Result<usize, MapGenerationError> {
    if width == 0 || height == 0 {
        return Err(MapGenerationError::EmptyRaster { width, height });
    }

    let cells = width
        .checked_mul(height)
        .ok_or(MapGenerationError::TooLarge { width, height })?;
    usize::try_from(cells).map_err(|_| MapGenerationError::TooLarge { width, height })
}
