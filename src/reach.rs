//! Reachability: the third pipeline stage.
//!
//! One breadth-first traversal from the center cell over initialized cells.
//! Claimed cells are still initialized and therefore traversable; their null
//! tile only silences their sprites. Cells the dispersion policy rejected
//! are holes, so islands cut off by them stay unreachable and are later
//! skipped by sprite synthesis.

use std::collections::VecDeque;

use crate::arena::{MapArena, ReachInfo, StageError};
use crate::coords;

/// Totals from one reachability pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReachStats {
    pub initialized_cells: usize,
    pub reachable_cells: usize,
}

/// Mark the connected component of the center cell.
///
/// `reached` is set when a cell enters the frontier, `reachable` when it
/// leaves; after the pass both flag sets are equal. A map whose center was
/// rejected by dispersion has no reachable cells at all.
pub fn compute(arena: &mut MapArena) -> Result<ReachStats, StageError> {
    arena.require_generated()?;
    arena.require_settled()?;

    let mut stats = ReachStats::default();
    for (info, cell) in arena.reach.iter_mut().zip(&arena.cells) {
        *info = ReachInfo::default();
        if cell.initialized {
            stats.initialized_cells += 1;
        }
    }

    let size = arena.size();
    let start = coords::linear_index(0, 0, size);
    if arena.cells[start].initialized {
        let mut frontier = VecDeque::new();
        arena.reach[start].reached = true;
        frontier.push_back(start);

        while let Some(index) = frontier.pop_front() {
            arena.reach[index].reachable = true;
            stats.reachable_cells += 1;

            for direction in 0..coords::NEIGHBOR_DIRECTIONS.len() {
                let neighbor = match coords::neighbor_offset(index, direction, size) {
                    Some(neighbor) => neighbor,
                    None => continue,
                };
                if arena.reach[neighbor].reached || !arena.cells[neighbor].initialized {
                    continue;
                }
                arena.reach[neighbor].reached = true;
                frontier.push_back(neighbor);
            }
        }
    }

    arena.mark_reachability();
    Ok(stats)
}
