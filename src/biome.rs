//! Biome asset model: noise layers, tile palette, diffusion table.
//!
//! A biome is authored by external tooling and handed to the pipeline as
//! plain data (serde round-trippable). The pipeline never mutates a biome;
//! it validates the asset once up front and then reads it from every worker.

use serde::{Deserialize, Serialize};

// ===== NOISE LAYERS =====

/// 3D noise primitive backing a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoisePrimitive {
    Perlin,
    Simplex,
}

/// Spectral shape of a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseShape {
    /// Plain fractal sum, remapped from [-1,1] to [0,1] per octave.
    Classic,
    /// Inverted-absolute-value ridges with octave weight chaining.
    Ridged,
}

/// Window applied to a layer's final value.
///
/// Values outside the window become 0 — they are not pulled to the boundary.
/// Intentional: layers use this to cut plateaus and bands out of the field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClampWindow {
    pub min: f32,
    pub max: f32,
}

/// One fractal noise layer of a biome.
///
/// Height and moisture each sum every active layer; `multiply` and `addition`
/// rescale the accumulated octaves before the clamp window is applied.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseLayer {
    pub primitive: NoisePrimitive,
    pub shape: NoiseShape,
    pub active: bool,
    /// Base amplitude of the first octave.
    pub amplitude: f32,
    /// Base frequency applied to the (q, r, salt) sample position.
    pub frequency: f32,
    pub octaves: u32,
    /// Per-octave frequency multiplier.
    pub lacunarity: f32,
    /// Per-octave amplitude falloff.
    pub persistence: f32,
    /// Ridged shape only: scales the previous octave's value into the next
    /// octave's weight (re-clamped to [0,1] each step).
    pub ridge_gain: f32,
    pub multiply: f32,
    pub addition: f32,
    pub clamp: Option<ClampWindow>,
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self {
            primitive: NoisePrimitive::Perlin,
            shape: NoiseShape::Classic,
            active: true,
            amplitude: 1.0,
            frequency: 0.05,
            octaves: 1,
            lacunarity: 2.0,
            persistence: 0.5,
            ridge_gain: 0.8,
            multiply: 1.0,
            addition: 0.0,
            clamp: None,
        }
    }
}

// ===== TILES =====

/// Terrain classification of a cell, resolved from the diffusion table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Index into the base atlas, -1 = none.
    pub base_sprite: i32,
    /// Index into the decoration atlas, -1 = none.
    pub deco_sprite: i32,
    /// Whether settlement growth may claim this tile.
    pub accepts_structures: bool,
    /// Growth cost scale, >= 1.
    pub propagation_cost: i32,
}

impl Tile {
    /// Sentinel for unassigned and claimed cells.
    pub const NULL: Tile = Tile {
        base_sprite: -1,
        deco_sprite: -1,
        accepts_structures: false,
        propagation_cost: 1,
    };

    pub fn is_null(&self) -> bool {
        self.base_sprite == -1 && self.deco_sprite == -1
    }
}

// ===== DIFFUSION TABLE =====

/// 2D classification lookup: (moisture bucket, height bucket) -> palette index.
///
/// Row-major with `width` columns; rows advance with the moisture bucket,
/// columns with the height bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffusionTable {
    width: usize,
    height: usize,
    entries: Vec<u8>,
}

impl DiffusionTable {
    pub fn new(width: usize, height: usize, entries: Vec<u8>) -> Result<Self, BiomeError> {
        if width == 0 || height == 0 || entries.len() != width * height {
            return Err(BiomeError::BadTableDimensions {
                width,
                height,
                entries: entries.len(),
            });
        }
        Ok(Self { width, height, entries })
    }

    /// Height-bucket axis length.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Moisture-bucket axis length.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Palette index for a bucket pair, `None` when a bucket is out of range.
    pub fn get(&self, height_bucket: usize, moisture_bucket: usize) -> Option<u8> {
        if height_bucket >= self.width || moisture_bucket >= self.height {
            return None;
        }
        Some(self.entries[moisture_bucket * self.width + height_bucket])
    }
}

// ===== BIOME =====

/// Everything the pipeline needs to classify terrain: layer stack, palette,
/// and the diffusion lookup between them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    pub layers: Vec<NoiseLayer>,
    pub palette: Vec<Tile>,
    pub diffusion: DiffusionTable,
}

impl Biome {
    /// Parse and validate an authored biome asset.
    pub fn from_json(json: &str) -> Result<Self, BiomeError> {
        let biome: Biome =
            serde_json::from_str(json).map_err(|err| BiomeError::BadAsset(err.to_string()))?;
        biome.validate()?;
        Ok(biome)
    }

    /// Structural validation of an authored asset. Run once before generation;
    /// the stages assume a validated biome afterwards.
    pub fn validate(&self) -> Result<(), BiomeError> {
        if self.palette.is_empty() {
            return Err(BiomeError::EmptyPalette);
        }
        if self.diffusion.width == 0
            || self.diffusion.height == 0
            || self.diffusion.entries.len() != self.diffusion.width * self.diffusion.height
        {
            return Err(BiomeError::BadTableDimensions {
                width: self.diffusion.width,
                height: self.diffusion.height,
                entries: self.diffusion.entries.len(),
            });
        }
        for (at, &entry) in self.diffusion.entries.iter().enumerate() {
            if entry as usize >= self.palette.len() {
                return Err(BiomeError::TileIndexOutOfRange {
                    entry,
                    at,
                    palette: self.palette.len(),
                });
            }
        }
        for (at, tile) in self.palette.iter().enumerate() {
            if tile.propagation_cost < 1 {
                return Err(BiomeError::BadPropagationCost {
                    tile: at,
                    cost: tile.propagation_cost,
                });
            }
        }
        Ok(())
    }

    /// Tile for a bucket pair, `None` when the lookup cannot resolve.
    pub fn tile_at(&self, height_bucket: usize, moisture_bucket: usize) -> Option<Tile> {
        let entry = self.diffusion.get(height_bucket, moisture_bucket)?;
        self.palette.get(entry as usize).copied()
    }
}

/// Why a biome asset was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum BiomeError {
    /// The asset text did not parse.
    BadAsset(String),
    /// The palette has no tiles.
    EmptyPalette,
    /// Diffusion dimensions are zero or do not match the entry count.
    BadTableDimensions { width: usize, height: usize, entries: usize },
    /// A diffusion entry points past the palette.
    TileIndexOutOfRange { entry: u8, at: usize, palette: usize },
    /// A palette tile has a propagation cost below 1.
    BadPropagationCost { tile: usize, cost: i32 },
}

impl std::fmt::Display for BiomeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BiomeError::BadAsset(detail) => write!(f, "unparseable biome asset: {}", detail),
            BiomeError::EmptyPalette => write!(f, "biome palette is empty"),
            BiomeError::BadTableDimensions { width, height, entries } => write!(
                f,
                "diffusion table is {}x{} but holds {} entries",
                width, height, entries
            ),
            BiomeError::TileIndexOutOfRange { entry, at, palette } => write!(
                f,
                "diffusion entry {} at offset {} exceeds palette of {} tiles",
                entry, at, palette
            ),
            BiomeError::BadPropagationCost { tile, cost } => write!(
                f,
                "palette tile {} has propagation cost {} (minimum 1)",
                tile, cost
            ),
        }
    }
}

impl std::error::Error for BiomeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard_biome() -> Biome {
        Biome {
            layers: vec![NoiseLayer::default()],
            palette: vec![
                Tile { base_sprite: 0, deco_sprite: -1, accepts_structures: true, propagation_cost: 1 },
                Tile { base_sprite: 1, deco_sprite: 4, accepts_structures: false, propagation_cost: 2 },
            ],
            diffusion: DiffusionTable::new(2, 2, vec![0, 1, 1, 0]).unwrap(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_asset() {
        assert!(checkerboard_biome().validate().is_ok());
    }

    #[test]
    fn test_table_dimension_mismatch_rejected() {
        assert!(matches!(
            DiffusionTable::new(3, 2, vec![0; 5]),
            Err(BiomeError::BadTableDimensions { width: 3, height: 2, entries: 5 })
        ));
        assert!(matches!(
            DiffusionTable::new(0, 4, vec![]),
            Err(BiomeError::BadTableDimensions { .. })
        ));
    }

    #[test]
    fn test_palette_index_out_of_range_rejected() {
        let mut biome = checkerboard_biome();
        biome.diffusion = DiffusionTable::new(2, 2, vec![0, 1, 2, 0]).unwrap();
        assert!(matches!(
            biome.validate(),
            Err(BiomeError::TileIndexOutOfRange { entry: 2, at: 2, palette: 2 })
        ));
    }

    #[test]
    fn test_propagation_cost_floor_enforced() {
        let mut biome = checkerboard_biome();
        biome.palette[1].propagation_cost = 0;
        assert!(matches!(
            biome.validate(),
            Err(BiomeError::BadPropagationCost { tile: 1, cost: 0 })
        ));
    }

    #[test]
    fn test_lookup_orientation() {
        let biome = checkerboard_biome();
        // Row-major on the moisture axis: entry order is (m0,h0) (m0,h1) (m1,h0) (m1,h1).
        assert_eq!(biome.tile_at(0, 0).unwrap().base_sprite, 0);
        assert_eq!(biome.tile_at(1, 0).unwrap().base_sprite, 1);
        assert_eq!(biome.tile_at(0, 1).unwrap().base_sprite, 1);
        assert_eq!(biome.tile_at(1, 1).unwrap().base_sprite, 0);
        assert_eq!(biome.tile_at(2, 0), None);
        assert_eq!(biome.tile_at(0, 2), None);
    }

    #[test]
    fn test_null_tile_sentinel() {
        assert!(Tile::NULL.is_null());
        assert!(!Tile::NULL.accepts_structures);
        assert!(Tile::NULL.propagation_cost >= 1);
    }

    #[test]
    fn test_serde_round_trip() {
        let biome = checkerboard_biome();
        let json = serde_json::to_string(&biome).unwrap();
        let parsed = Biome::from_json(&json).unwrap();
        assert_eq!(parsed, biome);
    }

    #[test]
    fn test_from_json_rejects_bad_assets() {
        assert!(matches!(Biome::from_json("not a biome"), Err(BiomeError::BadAsset(_))));

        let mut biome = checkerboard_biome();
        biome.palette.clear();
        biome.diffusion = DiffusionTable::new(1, 1, vec![0]).unwrap();
        let json = serde_json::to_string(&biome).unwrap();
        assert!(matches!(Biome::from_json(&json), Err(BiomeError::EmptyPalette)));
    }
}
