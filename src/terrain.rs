//! Terrain generation: the first pipeline stage.
//!
//! Every cell is produced independently from its linear index, so the pass
//! runs data-parallel with no cross-cell reads. Per-cell randomness comes
//! from counter-seeded ChaCha8 streams instead of a shared generator, which
//! keeps the output bit-identical for a given seed regardless of thread
//! count or schedule.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::arena::{Cell, MapArena, StageError};
use crate::config::{MapConfig, GRANULARITY};
use crate::coords;
use crate::sampler::{NoiseSampler, UNIT_MAX};
use crate::seeds::MapSeeds;

/// Span of the per-run noise offset drawn from the salt stream.
const SALT_SPAN: f32 = (1 << 20) as f32;

/// Fill every cell slot of the arena from the config.
///
/// Clears the placement and reachability marks first; their output is stale
/// once cells change.
pub fn generate(arena: &mut MapArena, config: &MapConfig) -> Result<(), StageError> {
    arena.ensure_size(config.size)?;
    arena.begin_generation();

    let seeds = MapSeeds::from_master(config.seed);
    let sampler = NoiseSampler::new(&config.biome, seeds.terrain);
    let salt = draw_salt(seeds.salt);

    arena
        .cells
        .par_iter_mut()
        .enumerate()
        .with_min_len(GRANULARITY)
        .try_for_each(|(index, cell)| {
            *cell = generate_cell(index, config, &sampler, salt, seeds.dispersion)?;
            Ok(())
        })?;

    arena.mark_generated();
    Ok(())
}

/// Two constants picked once per run from the salt stream. They become the
/// z coordinate of the 3D noise position, height using the first and
/// moisture the second, so both channels read different slices of the same
/// primitives.
fn draw_salt(stream: u64) -> (f32, f32) {
    let mut rng = ChaCha8Rng::seed_from_u64(stream);
    (rng.gen_range(0.0..SALT_SPAN), rng.gen_range(0.0..SALT_SPAN))
}

fn generate_cell(
    index: usize,
    config: &MapConfig,
    sampler: &NoiseSampler,
    salt: (f32, f32),
    dispersion_stream: u64,
) -> Result<Cell, StageError> {
    let (q, r) = coords::coord_from_index(index, config.size);
    // Stored coordinates are the negation of the layout coordinates; the
    // render orientation was authored against this convention.
    let (q, r) = (-q, -r);
    let distance = coords::distance_from_center(q, r);

    // Edge dispersion: inside the solid core every cell survives; in the
    // outer band survival is a weighted roll whose odds fall with distance.
    let mut rng = ChaCha8Rng::seed_from_u64(dispersion_stream.wrapping_add(index as u64));
    let roll: f32 = rng.gen();
    let rate = if config.dispersion > 0 {
        (config.size - distance) as f32 / config.dispersion as f32
    } else {
        2.0
    };
    let survives = distance < config.size - config.dispersion || roll < rate;
    if !survives {
        return Ok(Cell::empty(q, r));
    }

    let (height, moisture) = sampler.sample(q, r, salt);

    // Classification buckets from the raw samples, before terracing.
    let table = &config.biome.diffusion;
    let height_bucket = (height * table.width() as f32).floor() as usize;
    let moisture_bucket = (moisture * table.height() as f32).floor() as usize;
    let tile = config
        .biome
        .tile_at(height_bucket, moisture_bucket)
        .ok_or(StageError::BucketOutOfRange { index, height_bucket, moisture_bucket })?;

    let height = if config.terraces > 0 {
        let steps = config.terraces as f32;
        ((height * steps).round() / steps).min(UNIT_MAX)
    } else {
        height
    };

    Ok(Cell { q, r, height, moisture, tile, initialized: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::{Biome, DiffusionTable, NoiseLayer, Tile};

    fn tile(sprite: i32) -> Tile {
        Tile { base_sprite: sprite, deco_sprite: -1, accepts_structures: true, propagation_cost: 1 }
    }

    fn noisy_biome() -> Biome {
        Biome {
            layers: vec![NoiseLayer::default()],
            palette: vec![tile(0)],
            diffusion: DiffusionTable::new(1, 1, vec![0]).unwrap(),
        }
    }

    /// Constant-value biome: amplitude 0 leaves only the addition term.
    fn flat_biome(level: f32, table_width: usize) -> Biome {
        let layer = NoiseLayer { amplitude: 0.0, addition: level, ..NoiseLayer::default() };
        Biome {
            layers: vec![layer],
            palette: (0..table_width as i32).map(tile).collect(),
            diffusion: DiffusionTable::new(table_width, 1, (0..table_width as u8).collect())
                .unwrap(),
        }
    }

    fn generated(config: &MapConfig) -> MapArena {
        let mut arena = MapArena::new(config.size);
        generate(&mut arena, config).unwrap();
        arena
    }

    #[test]
    fn test_zero_dispersion_fills_every_cell() {
        let config = MapConfig::new(5, 42, noisy_biome());
        let arena = generated(&config);
        assert_eq!(arena.cells.len(), 91);
        for cell in &arena.cells {
            assert!(cell.initialized);
            assert!(cell.height >= 0.0 && cell.height < 1.0);
            assert!(cell.moisture >= 0.0 && cell.moisture < 1.0);
            assert!(!cell.tile.is_null());
        }
    }

    #[test]
    fn test_deterministic_for_a_seed() {
        let config = MapConfig::new(6, 7, noisy_biome());
        let a = generated(&config);
        let b = generated(&config);
        assert_eq!(a.cells, b.cells);
    }

    #[test]
    fn test_seed_changes_output() {
        let a = generated(&MapConfig::new(6, 1, noisy_biome()));
        let b = generated(&MapConfig::new(6, 2, noisy_biome()));
        assert_ne!(a.cells, b.cells);
    }

    #[test]
    fn test_coordinates_are_negated_layout_coordinates() {
        let config = MapConfig::new(3, 9, noisy_biome());
        let arena = generated(&config);
        for (index, cell) in arena.cells.iter().enumerate() {
            let (q, r) = coords::coord_from_index(index, 3);
            assert_eq!((cell.q, cell.r), (-q, -r));
        }
        let center = coords::linear_index(0, 0, 3);
        assert_eq!((arena.cells[center].q, arena.cells[center].r), (0, 0));
    }

    #[test]
    fn test_dispersion_band_behavior() {
        let mut config = MapConfig::new(8, 11, noisy_biome());
        config.dispersion = 8;
        let arena = generated(&config);

        let center = coords::linear_index(0, 0, 8);
        assert!(arena.cells[center].initialized);
        for cell in &arena.cells {
            let distance = coords::distance_from_center(cell.q, cell.r);
            if distance == 8 {
                // Survival rate at the rim is zero.
                assert!(!cell.initialized);
            }
            if !cell.initialized {
                assert!(cell.tile.is_null());
                assert_eq!(cell.height, 0.0);
                assert_eq!(cell.moisture, 0.0);
            }
        }
        assert!(arena.cells.iter().any(|c| !c.initialized));
    }

    #[test]
    fn test_dispersion_keeps_solid_core() {
        let mut config = MapConfig::new(8, 13, noisy_biome());
        config.dispersion = 3;
        let arena = generated(&config);
        for cell in &arena.cells {
            if coords::distance_from_center(cell.q, cell.r) < 5 {
                assert!(cell.initialized);
            }
        }
    }

    #[test]
    fn test_terraces_quantize_stored_height() {
        let mut config = MapConfig::new(5, 21, noisy_biome());
        config.terraces = 4;
        let arena = generated(&config);
        for cell in &arena.cells {
            let scaled = cell.height * 4.0;
            assert!((scaled - scaled.round()).abs() < 1e-3, "height {} off the ladder", cell.height);
            assert!(cell.height < 1.0);
        }
    }

    #[test]
    fn test_classification_uses_raw_height() {
        // Raw 0.4 buckets to 1 of 4; the terraced stored height collapses to 0.
        let mut config = MapConfig::new(3, 5, flat_biome(0.4, 4));
        config.terraces = 1;
        let arena = generated(&config);
        for cell in &arena.cells {
            assert_eq!(cell.tile.base_sprite, 1);
            assert_eq!(cell.height, 0.0);
        }
    }

    #[test]
    fn test_size_mismatch_fails_fast() {
        let config = MapConfig::new(4, 1, noisy_biome());
        let mut arena = MapArena::new(3);
        assert!(matches!(
            generate(&mut arena, &config),
            Err(StageError::SizeMismatch { arena: 3, config: 4 })
        ));
    }

    #[test]
    fn test_generation_resets_downstream_marks() {
        let config = MapConfig::new(2, 1, noisy_biome());
        let mut arena = MapArena::new(2);
        arena.mark_settled();
        arena.mark_reachability();
        generate(&mut arena, &config).unwrap();
        assert!(arena.require_generated().is_ok());
        assert!(arena.require_settled().is_err());
        assert!(arena.require_reachability().is_err());
    }
}
