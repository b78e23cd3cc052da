//! Generation run parameters and their validation.

use serde::{Deserialize, Serialize};

use crate::biome::{Biome, BiomeError};
use crate::coords;

/// Batch floor for the data-parallel stages. Single cells are too cheap to
/// schedule individually.
pub const GRANULARITY: usize = 32;

/// Input contract for one generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Grid radius; the map holds `size·(size+1)·3 + 1` cells.
    pub size: i32,
    /// Master seed; identical configs regenerate identical maps.
    pub seed: u64,
    /// 0 keeps height continuous; >0 quantizes it to that many levels.
    pub terraces: u32,
    /// Edge-erosion strength in `0..=size`; 0 keeps the full hexagon.
    pub dispersion: i32,
    pub biome: Biome,
}

impl MapConfig {
    pub fn new(size: i32, seed: u64, biome: Biome) -> Self {
        Self { size, seed, terraces: 0, dispersion: 0, biome }
    }

    /// Exact cell count for this radius.
    pub fn capacity(&self) -> usize {
        coords::capacity(self.size)
    }

    /// Fail fast on out-of-range parameters or a malformed biome asset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size < 1 {
            return Err(ConfigError::SizeTooSmall { size: self.size });
        }
        if self.dispersion < 0 || self.dispersion > self.size {
            return Err(ConfigError::DispersionOutOfRange {
                dispersion: self.dispersion,
                size: self.size,
            });
        }
        self.biome.validate()?;
        Ok(())
    }
}

/// Why a configuration was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    SizeTooSmall { size: i32 },
    DispersionOutOfRange { dispersion: i32, size: i32 },
    Biome(BiomeError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::SizeTooSmall { size } => {
                write!(f, "map size {} is below the minimum of 1", size)
            }
            ConfigError::DispersionOutOfRange { dispersion, size } => {
                write!(f, "dispersion {} outside 0..={}", dispersion, size)
            }
            ConfigError::Biome(e) => write!(f, "invalid biome: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<BiomeError> for ConfigError {
    fn from(e: BiomeError) -> Self {
        ConfigError::Biome(e)
    }
}
