//! Per-cell arrays for one map lifetime.
//!
//! All arrays are allocated once at `capacity` length and live until the map
//! is torn down; no cell is individually owned or freed. Each stage mutates
//! only the arrays it owns: generation writes `cells`, placement writes tiles
//! and `settlement_ids`, reachability writes `reach`, and `visibility` is
//! handed to the renderer after a reset. Progress marks record which stages
//! have committed, so running a stage before its prerequisite fails fast
//! instead of reading stale data.

use serde::{Deserialize, Serialize};

use crate::biome::Tile;
use crate::coords;

/// One generated hex cell.
///
/// Written exactly once by the generation stage; immutable afterwards except
/// for the tile, which settlement placement may replace with [`Tile::NULL`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub q: i32,
    pub r: i32,
    /// Height in `[0,1)`; 0 for uninitialized cells.
    pub height: f32,
    /// Moisture in `[0,1)`; 0 for uninitialized cells.
    pub moisture: f32,
    pub tile: Tile,
    /// False when the dispersion policy rejected the cell.
    pub initialized: bool,
}

impl Cell {
    /// Placeholder for slots the dispersion policy rejected (and for the
    /// arena before generation). Coordinates are still meaningful.
    pub fn empty(q: i32, r: i32) -> Self {
        Self { q, r, height: 0.0, moisture: 0.0, tile: Tile::NULL, initialized: false }
    }
}

/// Flood-fill marks for one cell, kept out of [`Cell`] for cache locality.
///
/// `reached` means the traversal has seen the cell (set on enqueue);
/// `reachable` means it is confirmed connected to the center (set on
/// dequeue).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReachInfo {
    pub reached: bool,
    pub reachable: bool,
}

/// Settlement tag for one cell (0 = unclaimed, 1+ = settlement id).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementId(pub u16);

impl SettlementId {
    pub const NONE: SettlementId = SettlementId(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// Fog-of-war flags, maintained by the renderer between runs.
///
/// The pipeline only allocates and resets these; it never computes them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    pub visible: bool,
    pub explored: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct StageProgress {
    generated: bool,
    settled: bool,
    reach_done: bool,
}

/// Capacity-length parallel arrays for one map, passed `&mut` to every stage.
pub struct MapArena {
    size: i32,
    pub cells: Vec<Cell>,
    pub reach: Vec<ReachInfo>,
    pub settlement_ids: Vec<SettlementId>,
    pub visibility: Vec<Visibility>,
    progress: StageProgress,
}

impl MapArena {
    /// Allocate every per-cell array for a hexagon of radius `size`.
    pub fn new(size: i32) -> Self {
        debug_assert!(size >= 1, "arena radius {} below minimum", size);
        let capacity = coords::capacity(size);
        Self {
            size,
            cells: vec![Cell::empty(0, 0); capacity],
            reach: vec![ReachInfo::default(); capacity],
            settlement_ids: vec![SettlementId::NONE; capacity],
            visibility: vec![Visibility::default(); capacity],
            progress: StageProgress::default(),
        }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Fail fast when a stage is handed a config for a different radius.
    pub fn ensure_size(&self, config_size: i32) -> Result<(), StageError> {
        if self.size != config_size {
            return Err(StageError::SizeMismatch { arena: self.size, config: config_size });
        }
        Ok(())
    }

    /// Invalidate every stage mark. The generation stage calls this before
    /// overwriting cells, so stale placement/reachability output from a
    /// previous run can no longer be read through the stage gates.
    pub fn begin_generation(&mut self) {
        self.progress = StageProgress::default();
    }

    pub fn mark_generated(&mut self) {
        self.progress.generated = true;
    }

    pub fn mark_settled(&mut self) {
        self.progress.settled = true;
    }

    pub fn mark_reachability(&mut self) {
        self.progress.reach_done = true;
    }

    pub fn require_generated(&self) -> Result<(), StageError> {
        if !self.progress.generated {
            return Err(StageError::MissingPrerequisite { requires: "generation" });
        }
        Ok(())
    }

    pub fn require_settled(&self) -> Result<(), StageError> {
        if !self.progress.settled {
            return Err(StageError::MissingPrerequisite { requires: "settlement placement" });
        }
        Ok(())
    }

    pub fn require_reachability(&self) -> Result<(), StageError> {
        if !self.progress.reach_done {
            return Err(StageError::MissingPrerequisite { requires: "reachability" });
        }
        Ok(())
    }

    /// Clear the renderer's fog-of-war flags for a fresh run.
    pub fn reset_visibility(&mut self) {
        for v in self.visibility.iter_mut() {
            *v = Visibility::default();
        }
    }
}

/// Why a pipeline stage refused to run or aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The arena was allocated for a different radius than the config.
    SizeMismatch { arena: i32, config: i32 },
    /// A stage ran before the stage it reads from had committed.
    MissingPrerequisite { requires: &'static str },
    /// A sampled value bucketed outside the diffusion table.
    BucketOutOfRange { index: usize, height_bucket: usize, moisture_bucket: usize },
    /// Settlement count divisor below 1.
    BadCountDivisor { divisor: i32 },
    /// Atlas resolution too small for the correction factor.
    BadResolution { resolution: u32 },
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageError::SizeMismatch { arena, config } => {
                write!(f, "arena allocated for radius {} but config wants {}", arena, config)
            }
            StageError::MissingPrerequisite { requires } => {
                write!(f, "stage requires {} to have completed first", requires)
            }
            StageError::BucketOutOfRange { index, height_bucket, moisture_bucket } => write!(
                f,
                "cell {} bucketed to ({}, {}) outside the diffusion table",
                index, height_bucket, moisture_bucket
            ),
            StageError::BadCountDivisor { divisor } => {
                write!(f, "settlement count divisor {} is below the minimum of 1", divisor)
            }
            StageError::BadResolution { resolution } => {
                write!(f, "atlas resolution {} is below the minimum of 2", resolution)
            }
        }
    }
}

impl std::error::Error for StageError {}
