//! The full generation pipeline: one owned arena driven through the four
//! stages in dependency order.
//!
//! Each stage function returns only after all of its work has finished, so
//! calling them in sequence is the barrier between stages. The two sprite
//! layers have no mutual dependency and run as a joined pair. Overlapping
//! runs are unrepresentable: every entry point takes the map exclusively.

use std::time::{Duration, Instant};

use crate::arena::{MapArena, SettlementId, StageError, Visibility};
use crate::config::{ConfigError, MapConfig};
use crate::settlement::{self, PlacementFailure, PlacementParams, Settlement};
use crate::sprite::{self, SpriteLayer, SpriteRecord};
use crate::{reach, terrain};

/// Atlas resolutions for the two render layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerResolutions {
    pub base: u32,
    pub deco: u32,
}

impl Default for LayerResolutions {
    fn default() -> Self {
        Self { base: 1024, deco: 1024 }
    }
}

/// Wall-clock duration of each stage.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageTimings {
    pub generation: Duration,
    pub placement: Duration,
    pub reachability: Duration,
    pub synthesis: Duration,
}

/// What one pipeline run produced and how long each stage took.
#[derive(Clone, Debug, Default)]
pub struct GenerationReport {
    pub capacity: usize,
    pub initialized_cells: usize,
    pub reachable_cells: usize,
    pub settlements_placed: usize,
    pub placement_failures: Vec<(SettlementId, PlacementFailure)>,
    pub timings: StageTimings,
}

impl std::fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} cells ({} initialized, {} reachable), {} settlements ({} failed); \
             terrain {:?}, placement {:?}, reach {:?}, sprites {:?}",
            self.capacity,
            self.initialized_cells,
            self.reachable_cells,
            self.settlements_placed,
            self.placement_failures.len(),
            self.timings.generation,
            self.timings.placement,
            self.timings.reachability,
            self.timings.synthesis,
        )
    }
}

/// Errors from driving the pipeline.
#[derive(Debug)]
pub enum GenerateError {
    Config(ConfigError),
    Stage(StageError),
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::Config(err) => write!(f, "invalid config: {}", err),
            GenerateError::Stage(err) => write!(f, "pipeline stage failed: {}", err),
        }
    }
}

impl std::error::Error for GenerateError {}

impl From<ConfigError> for GenerateError {
    fn from(err: ConfigError) -> Self {
        GenerateError::Config(err)
    }
}

impl From<StageError> for GenerateError {
    fn from(err: StageError) -> Self {
        GenerateError::Stage(err)
    }
}

/// An owned, fully generated map: config, arena, settlements, and one render
/// buffer per layer.
pub struct HexMap {
    config: MapConfig,
    placement: PlacementParams,
    resolutions: LayerResolutions,
    arena: MapArena,
    settlements: Vec<Settlement>,
    base_records: Vec<SpriteRecord>,
    deco_records: Vec<SpriteRecord>,
    report: GenerationReport,
}

impl HexMap {
    /// Validate the config, allocate the arena, and run the full pipeline.
    pub fn generate(config: MapConfig) -> Result<Self, GenerateError> {
        Self::generate_with(config, PlacementParams::default(), LayerResolutions::default())
    }

    pub fn generate_with(
        config: MapConfig,
        placement: PlacementParams,
        resolutions: LayerResolutions,
    ) -> Result<Self, GenerateError> {
        config.validate()?;
        let arena = MapArena::new(config.size);
        let mut map = Self {
            config,
            placement,
            resolutions,
            arena,
            settlements: Vec::new(),
            base_records: Vec::new(),
            deco_records: Vec::new(),
            report: GenerationReport::default(),
        };
        map.run()?;
        Ok(map)
    }

    /// Rerun the pipeline under a new config.
    ///
    /// A size change reallocates the arena; any other change reuses every
    /// buffer in place. The previous run has necessarily finished, since an
    /// overlapping rerun cannot borrow the map.
    pub fn regenerate(&mut self, config: MapConfig) -> Result<(), GenerateError> {
        config.validate()?;
        if config.size != self.arena.size() {
            self.arena = MapArena::new(config.size);
        }
        self.config = config;
        self.run()
    }

    fn run(&mut self) -> Result<(), GenerateError> {
        let mut timings = StageTimings::default();

        let start = Instant::now();
        terrain::generate(&mut self.arena, &self.config)?;
        timings.generation = start.elapsed();

        let start = Instant::now();
        let placement = settlement::place(&mut self.arena, &self.config, &self.placement)?;
        timings.placement = start.elapsed();

        let start = Instant::now();
        let stats = reach::compute(&mut self.arena)?;
        timings.reachability = start.elapsed();

        self.arena.reset_visibility();

        let start = Instant::now();
        let (base, deco) = rayon::join(
            || {
                sprite::synthesize(
                    &self.arena,
                    SpriteLayer::Base,
                    self.resolutions.base,
                    &mut self.base_records,
                )
            },
            || {
                sprite::synthesize(
                    &self.arena,
                    SpriteLayer::Deco,
                    self.resolutions.deco,
                    &mut self.deco_records,
                )
            },
        );
        base?;
        deco?;
        timings.synthesis = start.elapsed();

        self.report = GenerationReport {
            capacity: self.arena.capacity(),
            initialized_cells: stats.initialized_cells,
            reachable_cells: stats.reachable_cells,
            settlements_placed: placement.settlements.len(),
            placement_failures: placement.failures,
            timings,
        };
        self.settlements = placement.settlements;
        Ok(())
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn arena(&self) -> &MapArena {
        &self.arena
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    /// Render records for one layer, index-aligned with the arena.
    pub fn records(&self, layer: SpriteLayer) -> &[SpriteRecord] {
        match layer {
            SpriteLayer::Base => &self.base_records,
            SpriteLayer::Deco => &self.deco_records,
        }
    }

    /// Fog-of-war flags for the renderer to maintain between runs.
    pub fn visibility_mut(&mut self) -> &mut [Visibility] {
        &mut self.arena.visibility
    }

    /// Report from the most recent run.
    pub fn report(&self) -> &GenerationReport {
        &self.report
    }
}
