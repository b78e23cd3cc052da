//! Render-record synthesis: the last pipeline stage.
//!
//! Projects every cell slot into a flat, GPU-uploadable record array, one
//! array per render layer. The pass is read-only over the arena, so the two
//! layers can run concurrently. Records line up with cell indices; the
//! renderer drops entries whose atlas index is -1 instead of the pipeline
//! compacting them.

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::arena::{Cell, MapArena, StageError};
use crate::config::GRANULARITY;

/// World-space height of one terrace step.
pub const TERRACE_HEIGHT: f32 = 5.0;

/// Vertical pitch between hex rows: three-quarter overlap at half height.
const ROW_PITCH: f32 = 0.5 * 0.75;

/// Baseline drop applied to every sprite.
const BASELINE: f32 = -1.5;

/// Which tile sprite field a synthesis pass projects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteLayer {
    Base,
    Deco,
}

/// One render-ready cell record: world position plus atlas index.
///
/// Index -1 means the cell is not drawn (uninitialized, unreachable, claimed,
/// or the tile has no sprite on this layer). The layout is handed to the
/// renderer as raw bytes, so it stays `#[repr(C)]` with no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SpriteRecord {
    pub x: f32,
    pub y: f32,
    pub index: i32,
}

/// Build one record per cell slot into `records`.
///
/// `records` is rebuilt in place and always comes out at arena capacity, so
/// a caller-held buffer is reused across runs of the same size. The position
/// correction factor is `(resolution - 1) / resolution` of this layer's
/// atlas resolution.
pub fn synthesize(
    arena: &MapArena,
    layer: SpriteLayer,
    resolution: u32,
    records: &mut Vec<SpriteRecord>,
) -> Result<(), StageError> {
    arena.require_generated()?;
    arena.require_reachability()?;
    if resolution < 2 {
        return Err(StageError::BadResolution { resolution });
    }

    let correction = (resolution as f32 - 1.0) / resolution as f32;

    arena
        .cells
        .par_iter()
        .zip(arena.reach.par_iter())
        .with_min_len(GRANULARITY)
        .map(|(cell, reach)| record(cell, reach.reachable, layer, correction))
        .collect_into_vec(records);

    Ok(())
}

fn record(cell: &Cell, reachable: bool, layer: SpriteLayer, correction: f32) -> SpriteRecord {
    // The x axis carries the correction factor twice; the atlas offsets were
    // tuned against this mapping, so it stays.
    let x = (cell.q as f32 + cell.r as f32 / 2.0) * correction * correction;
    let y = (cell.r as f32 * ROW_PITCH + cell.height * TERRACE_HEIGHT + BASELINE) * correction;
    let index = if reachable {
        match layer {
            SpriteLayer::Base => cell.tile.base_sprite,
            SpriteLayer::Deco => cell.tile.deco_sprite,
        }
    } else {
        -1
    };
    SpriteRecord { x, y, index }
}
