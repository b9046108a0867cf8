use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo::EARTH_RADIUS;

/// Path sampling and earth model used by the line-of-sight generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LosConfig {
    /// Interior points sampled between observer and target.
    pub samples: usize,
    /// Index of the first path point evaluated; earlier ones sit on top of the observer.
    pub first_sample: usize,
    /// DTED level passed to the elevation source.
    pub dted_level: u8,
    pub earth_radius_m: f64,
    /// Refraction k-factor; 1.0 is pure geometry.
    pub k_factor: f64,
}

impl Default for LosConfig {
    fn default() -> Self {
        Self {
            samples: 64,
            first_sample: 2,
            dted_level: 1,
            earth_radius_m: EARTH_RADIUS,
            k_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Directory holding `<e|w>DDD/<n|s>DD.dtN` frame files.
    pub dted_root: PathBuf,
    /// Frames kept in memory.
    pub cache_capacity: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            dted_root: PathBuf::from("dted"),
            cache_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Viewpoints farther than this from a cell are not tested against it.
    pub max_range_m: f64,
    /// Height above ground of the cell being tested.
    pub target_height_m: i32,
    /// Settings for the `LosGenerator` built for a scan. `scan` itself reads
    /// the generator's own config.
    pub los: LosConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_range_m: 50_000.0,
            target_height_m: 0,
            los: LosConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapcoreConfig {
    pub terrain: TerrainConfig,
    pub scan: ScanConfig,
}

pub fn load_config(path: impl AsRef<Path>) -> Result<MapcoreConfig> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = std::io::BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(config)
}
