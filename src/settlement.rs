//! Settlement placement: the second pipeline stage.
//!
//! Runs single-threaded on purpose: each origin must be checked against the
//! origins placed before it, so placement order is part of the semantics.
//! All randomness comes from one ChaCha8 stream, which makes the whole stage
//! a deterministic function of the master seed.

use std::collections::{HashMap, VecDeque};
use std::ops::Range;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::arena::{Cell, MapArena, SettlementId, StageError};
use crate::biome::Tile;
use crate::config::MapConfig;
use crate::coords;
use crate::seeds::MapSeeds;

/// Placement tuning. Defaults match the shipped balance.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementParams {
    /// Settlement count is `size / count_divisor`.
    pub count_divisor: i32,
    /// Origins may lie at most this fraction of the radius from the center.
    pub max_center_fraction: f32,
    /// Band edges for origin eligibility: a height or moisture below the low
    /// edge or above the high edge counts as extreme.
    pub extreme_low: f32,
    pub extreme_high: f32,
    /// Minimum hex distance between two accepted origins.
    pub min_origin_separation: i32,
    /// Uniform index draws per origin search before giving up.
    pub origin_tries: u32,
    /// Starting growth budget, rolled once per attempt (upper bound exclusive).
    pub budget: Range<i32>,
    /// Base cost of crossing one edge, rolled per edge (upper bound exclusive).
    pub edge_cost: Range<i32>,
    /// Attempts claiming fewer cells than this are discarded and retried.
    pub min_claimed: usize,
    /// Growth attempts per settlement before reporting failure.
    pub growth_retries: u32,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            count_divisor: 64,
            max_center_fraction: 0.85,
            extreme_low: 0.25,
            extreme_high: 0.75,
            min_origin_separation: 80,
            origin_tries: 50_000,
            budget: 36..69,
            edge_cost: 4..19,
            min_claimed: 24,
            growth_retries: 32,
        }
    }
}

/// An accepted settlement. `origin` is a snapshot of the anchor cell taken
/// before the claim pass nulled its tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub origin: Cell,
    pub claimed_cells: usize,
}

/// Why one placement slot produced no settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementFailure {
    /// No cell satisfying the origin constraints within the try budget.
    OriginSearchExhausted { tries: u32 },
    /// Every growth attempt claimed fewer cells than the minimum.
    GrowthRetriesExhausted { retries: u32, best_claimed: usize },
}

impl std::fmt::Display for PlacementFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementFailure::OriginSearchExhausted { tries } => {
                write!(f, "no viable origin in {} draws", tries)
            }
            PlacementFailure::GrowthRetriesExhausted { retries, best_claimed } => {
                write!(f, "{} growth attempts topped out at {} cells", retries, best_claimed)
            }
        }
    }
}

/// Outcome of one placement run. A failed slot leaves a gap in the id
/// sequence; it is reported here instead of producing an empty settlement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementReport {
    pub settlements: Vec<Settlement>,
    pub failures: Vec<(SettlementId, PlacementFailure)>,
}

/// Place `size / count_divisor` settlements onto a generated arena.
///
/// Claimed cells keep their coordinates, samples, and initialized flag; only
/// the tile is replaced with [`Tile::NULL`] and the settlement id tagged, so
/// later stages still traverse them.
pub fn place(
    arena: &mut MapArena,
    config: &MapConfig,
    params: &PlacementParams,
) -> Result<PlacementReport, StageError> {
    arena.ensure_size(config.size)?;
    arena.require_generated()?;
    if params.count_divisor < 1 {
        return Err(StageError::BadCountDivisor { divisor: params.count_divisor });
    }

    for id in arena.settlement_ids.iter_mut() {
        *id = SettlementId::NONE;
    }

    let seeds = MapSeeds::from_master(config.seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.settlements);

    let count = (config.size / params.count_divisor) as usize;
    let mut report = PlacementReport::default();

    for slot in 0..count {
        let id = SettlementId(slot as u16 + 1);
        match place_one(&arena.cells, config.size, params, &report.settlements, &mut rng) {
            Ok((origin, claimed)) => {
                // Snapshot the anchor before the claim pass nulls it.
                let origin_cell = arena.cells[origin];
                for &index in claimed.keys() {
                    arena.cells[index].tile = Tile::NULL;
                    arena.settlement_ids[index] = id;
                }
                report.settlements.push(Settlement {
                    id,
                    origin: origin_cell,
                    claimed_cells: claimed.len(),
                });
            }
            Err(failure) => report.failures.push((id, failure)),
        }
    }

    arena.mark_settled();
    Ok(report)
}

fn place_one(
    cells: &[Cell],
    size: i32,
    params: &PlacementParams,
    placed: &[Settlement],
    rng: &mut ChaCha8Rng,
) -> Result<(usize, HashMap<usize, i32>), PlacementFailure> {
    let mut best_claimed = 0;
    for _ in 0..params.growth_retries {
        let origin = match search_origin(cells, size, params, placed, rng) {
            Some(index) => index,
            None => {
                return Err(PlacementFailure::OriginSearchExhausted { tries: params.origin_tries })
            }
        };
        let claimed = grow(cells, size, origin, params, rng);
        if claimed.len() >= params.min_claimed {
            return Ok((origin, claimed));
        }
        best_claimed = best_claimed.max(claimed.len());
    }
    Err(PlacementFailure::GrowthRetriesExhausted {
        retries: params.growth_retries,
        best_claimed,
    })
}

/// Rejection-sample an origin: near enough to the center, extreme on at
/// least one sample axis, and clear of every earlier origin.
fn search_origin(
    cells: &[Cell],
    size: i32,
    params: &PlacementParams,
    placed: &[Settlement],
    rng: &mut ChaCha8Rng,
) -> Option<usize> {
    let max_distance = size as f32 * params.max_center_fraction;
    for _ in 0..params.origin_tries {
        let index = rng.gen_range(0..cells.len());
        let cell = &cells[index];
        // Dispersion holes carry zeroed samples that would read as extreme.
        if !cell.initialized {
            continue;
        }
        if coords::distance_from_center(cell.q, cell.r) as f32 > max_distance {
            continue;
        }
        if !is_extreme(cell.height, params) && !is_extreme(cell.moisture, params) {
            continue;
        }
        let too_close = placed.iter().any(|s| {
            coords::distance(cell.q, cell.r, s.origin.q, s.origin.r)
                < params.min_origin_separation
        });
        if too_close {
            continue;
        }
        return Some(index);
    }
    None
}

fn is_extreme(value: f32, params: &PlacementParams) -> bool {
    value < params.extreme_low || value > params.extreme_high
}

/// Budgeted flood growth from an origin.
///
/// Each claimed cell stores the budget left when it joined. A neighbor joins
/// while its propagated budget stays positive: uphill neighbors retain more
/// of the parent's budget, and every edge pays a rolled cost scaled by the
/// tile's propagation cost. The frontier is FIFO, so growth rings outward.
fn grow(
    cells: &[Cell],
    size: i32,
    origin: usize,
    params: &PlacementParams,
    rng: &mut ChaCha8Rng,
) -> HashMap<usize, i32> {
    let mut claimed: HashMap<usize, i32> = HashMap::new();
    let mut frontier: VecDeque<usize> = VecDeque::new();

    claimed.insert(origin, rng.gen_range(params.budget.clone()));
    frontier.push_back(origin);

    while let Some(index) = frontier.pop_front() {
        let budget = claimed[&index];
        let height = cells[index].height;

        for direction in 0..coords::NEIGHBOR_DIRECTIONS.len() {
            let neighbor = match coords::neighbor_offset(index, direction, size) {
                Some(neighbor) => neighbor,
                None => continue,
            };
            if claimed.contains_key(&neighbor) {
                continue;
            }
            let cell = &cells[neighbor];
            if !cell.initialized || !cell.tile.accepts_structures {
                continue;
            }
            let rise = 1.0 + (cell.height - height);
            let cost = rng.gen_range(params.edge_cost.clone()) * cell.tile.propagation_cost;
            let passed = (rise * budget as f32 - cost as f32).round() as i32;
            if passed > 0 {
                claimed.insert(neighbor, passed);
                frontier.push_back(neighbor);
            }
        }
    }

    claimed
}
