//! TOML configuration for the command-line host.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use conquest_simulation::{SimulationConfig, DEFAULT_ATTACK_RATIO};
use conquest_world::DEFAULT_LAND_ALPHA_THRESHOLD;
use serde::Deserialize;

/// Width rasters are resampled to when loading a map from images.
pub(crate) const DEFAULT_MAP_WIDTH: u32 = 1920;

/// Root of the configuration file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    pub(crate) map: MapConfig,
    pub(crate) session: SessionConfig,
    pub(crate) simulation: SimulationConfig,
}

/// Where the terrain comes from.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct MapConfig {
    pub(crate) ocean: Option<PathBuf>,
    pub(crate) land: Option<PathBuf>,
    pub(crate) width: u32,
    pub(crate) land_alpha_threshold: u8,
    pub(crate) procedural_width: u32,
    pub(crate) procedural_height: u32,
    pub(crate) seed: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            ocean: None,
            land: None,
            width: DEFAULT_MAP_WIDTH,
            land_alpha_threshold: DEFAULT_LAND_ALPHA_THRESHOLD,
            procedural_width: 640,
            procedural_height: 360,
            seed: 7,
        }
    }
}

/// Local player and toy economy settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct SessionConfig {
    pub(crate) local_entity: u32,
    pub(crate) spawn: Option<u32>,
    pub(crate) attack_ratio: u8,
    pub(crate) starting_troops: u64,
    pub(crate) troop_income: u64,
    pub(crate) script: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_entity: 1,
            spawn: None,
            attack_ratio: DEFAULT_ATTACK_RATIO,
            starting_troops: 1_000,
            troop_income: 10,
            script: None,
        }
    }
}

impl CliConfig {
    /// Reads and parses a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }
}
