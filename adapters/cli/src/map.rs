//! Terrain sources: PNG rasters or a seeded procedural archipelago.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use conquest_core::PackedColor;
use conquest_world::TerrainRaster;
use image::{imageops::FilterType, RgbaImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const OCEAN: (u8, u8, u8) = (14, 165, 233);
const DEEP_OCEAN: (u8, u8, u8) = (3, 105, 161);

/// Decodes the two layers and resamples both to `width`, keeping the land
/// layer's aspect ratio.
pub(crate) fn load_rasters(
    ocean_path: &Path,
    land_path: &Path,
    width: u32,
) -> Result<(TerrainRaster, TerrainRaster)> {
    let land = decode(land_path)?;
    let ocean = decode(ocean_path)?;
    let height = scaled_height(land.width(), land.height(), width)?;

    let land = image::imageops::resize(&land, width, height, FilterType::Triangle);
    let ocean = image::imageops::resize(&ocean, width, height, FilterType::Triangle);
    tracing::info!(width, height, "resampled terrain rasters");

    Ok((raster_from_image(ocean)?, raster_from_image(land)?))
}

fn decode(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode terrain raster {}", path.display()))?;
    Ok(image.to_rgba8())
}

/// Height of a `source_width` × `source_height` image scaled to `width`.
pub(crate) fn scaled_height(source_width: u32, source_height: u32, width: u32) -> Result<u32> {
    ensure!(
        source_width > 0 && source_height > 0 && width > 0,
        "cannot resample an empty {source_width}x{source_height} raster to width {width}"
    );
    let height = (u64::from(source_height) * u64::from(width) + u64::from(source_width) / 2)
        / u64::from(source_width);
    u32::try_from(height.max(1)).context("resampled raster height overflows")
}

fn raster_from_image(image: RgbaImage) -> Result<TerrainRaster> {
    let (width, height) = image.dimensions();
    Ok(TerrainRaster::new(width, height, image.into_raw())?)
}

/// Generates a deterministic archipelago of `width` × `height` cells.
///
/// Islands are unions of discs scattered by a seeded ChaCha stream, so the
/// same seed always yields the same map.
pub(crate) fn procedural(width: u32, height: u32, seed: u64) -> Result<(TerrainRaster, TerrainRaster)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ocean = TerrainRaster::filled(width, height, PackedColor::opaque(OCEAN.0, OCEAN.1, OCEAN.2))?;
    let mut land = TerrainRaster::filled(width, height, PackedColor::TRANSPARENT)?;

    let span = width.min(height).max(1) as f32;
    let islands = 4 + (width / 160).min(12);
    let mut discs = Vec::new();
    for _ in 0..islands {
        let center_x = rng.gen_range(0.0..width as f32);
        let center_y = rng.gen_range(0.0..height as f32);
        let lobes = rng.gen_range(3..8);
        for _ in 0..lobes {
            let radius = rng.gen_range(span * 0.04..span * 0.14);
            let x = center_x + rng.gen_range(-radius..radius);
            let y = center_y + rng.gen_range(-radius..radius);
            discs.push((x, y, radius));
        }
    }

    for row in 0..height {
        for column in 0..width {
            let (x, y) = (column as f32 + 0.5, row as f32 + 0.5);
            let depth = discs
                .iter()
                .map(|&(cx, cy, radius)| 1.0 - ((x - cx).powi(2) + (y - cy).powi(2)).sqrt() / radius)
                .fold(f32::MIN, f32::max);

            if depth >= 0.0 {
                let shade = (depth.min(1.0) * 60.0) as u8;
                let grain = rng.gen_range(0..12_u8);
                let color = PackedColor::opaque(74 + grain, 160 - shade / 2, 70 + shade / 3);
                let _ = land.set_pixel(column, row, color);
            } else if depth <= -0.35 {
                let color = PackedColor::opaque(DEEP_OCEAN.0, DEEP_OCEAN.1, DEEP_OCEAN.2);
                let _ = ocean.set_pixel(column, row, color);
            }
        }
    }

    tracing::info!(width, height, seed, islands, "generated procedural map");
    Ok((ocean, land))
}
