//! Layered fractal noise evaluation.
//!
//! A sampler is built once per generation run from the biome's layer stack
//! and shared read-only across all workers. Height and moisture come from the
//! same layers; they differ only in which salt component offsets the third
//! noise axis, so the two fields are decorrelated but share large structure.

use noise::{NoiseFn, Perlin, Simplex};

use crate::biome::{Biome, NoiseLayer, NoisePrimitive, NoiseShape};

/// Largest sample value. Keeping samples strictly below 1.0 guarantees
/// `floor(value * dim) < dim` when bucketing.
pub const UNIT_MAX: f32 = 1.0 - f32::EPSILON;

enum LayerSource {
    Perlin(Perlin),
    Simplex(Simplex),
}

impl LayerSource {
    fn get(&self, pos: [f64; 3]) -> f64 {
        match self {
            LayerSource::Perlin(n) => n.get(pos),
            LayerSource::Simplex(n) => n.get(pos),
        }
    }
}

/// Evaluates a biome's active layers at hex positions.
pub struct NoiseSampler {
    layers: Vec<(NoiseLayer, LayerSource)>,
}

impl NoiseSampler {
    /// Instance one noise primitive per active layer. Each layer's seed mixes
    /// the terrain stream with the layer's position in the biome list, so
    /// layers stay decorrelated and toggling one leaves the others unchanged.
    pub fn new(biome: &Biome, seed: u64) -> Self {
        let layers = biome
            .layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.active)
            .map(|(i, layer)| {
                let layer_seed = seed.wrapping_add(i as u64) as u32;
                let source = match layer.primitive {
                    NoisePrimitive::Perlin => LayerSource::Perlin(Perlin::new(layer_seed)),
                    NoisePrimitive::Simplex => LayerSource::Simplex(Simplex::new(layer_seed)),
                };
                (*layer, source)
            })
            .collect();
        Self { layers }
    }

    /// (height, moisture) at `(q, r)`, each in `[0,1)`.
    ///
    /// With no active layers both channels are 0.
    pub fn sample(&self, q: i32, r: i32, salt: (f32, f32)) -> (f32, f32) {
        let mut height = 0.0f32;
        let mut moisture = 0.0f32;
        for (layer, source) in &self.layers {
            height += compute_layer(layer, source, [q as f64, r as f64, salt.0 as f64]);
            moisture += compute_layer(layer, source, [q as f64, r as f64, salt.1 as f64]);
        }
        (height.clamp(0.0, UNIT_MAX), moisture.clamp(0.0, UNIT_MAX))
    }
}

/// One layer's contribution at a 3D sample position.
fn compute_layer(layer: &NoiseLayer, source: &LayerSource, pos: [f64; 3]) -> f32 {
    let mut frequency = layer.frequency as f64;
    let mut amplitude = layer.amplitude as f64;
    let mut raw = 0.0f64;

    match layer.shape {
        NoiseShape::Classic => {
            for _ in 0..layer.octaves {
                let n = source.get([pos[0] * frequency, pos[1] * frequency, pos[2] * frequency]);
                raw += (n + 1.0) * 0.5 * amplitude;
                frequency *= layer.lacunarity as f64;
                amplitude *= layer.persistence as f64;
            }
        }
        NoiseShape::Ridged => {
            let mut weight = 1.0f64;
            for _ in 0..layer.octaves {
                let n = source.get([pos[0] * frequency, pos[1] * frequency, pos[2] * frequency]);
                let mut v = 1.0 - n.abs();
                v *= v;
                v *= weight;
                weight = (v * layer.ridge_gain as f64).clamp(0.0, 1.0);
                raw += v * amplitude;
                frequency *= layer.lacunarity as f64;
                amplitude *= layer.persistence as f64;
            }
        }
    }

    let value = (raw * layer.multiply as f64 + layer.addition as f64) as f32;
    match layer.clamp {
        // Out-of-window values are zeroed, not clamped to the boundary.
        Some(window) if value < window.min || value > window.max => 0.0,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::{ClampWindow, DiffusionTable, Tile};

    fn biome_with_layers(layers: Vec<NoiseLayer>) -> Biome {
        Biome {
            layers,
            palette: vec![Tile { base_sprite: 0, deco_sprite: -1, accepts_structures: true, propagation_cost: 1 }],
            diffusion: DiffusionTable::new(1, 1, vec![0]).unwrap(),
        }
    }

    fn sample_grid(sampler: &NoiseSampler, salt: (f32, f32)) -> Vec<(f32, f32)> {
        let mut out = Vec::new();
        for r in -6..=6 {
            for q in -6..=6 {
                out.push(sampler.sample(q, r, salt));
            }
        }
        out
    }

    #[test]
    fn test_samples_stay_in_unit_range() {
        let layers = vec![
            NoiseLayer { octaves: 4, amplitude: 3.0, ..Default::default() },
            NoiseLayer {
                shape: NoiseShape::Ridged,
                primitive: NoisePrimitive::Simplex,
                octaves: 3,
                amplitude: 2.0,
                addition: -0.5,
                ..Default::default()
            },
        ];
        let sampler = NoiseSampler::new(&biome_with_layers(layers), 7);
        for (h, m) in sample_grid(&sampler, (12.5, 901.25)) {
            assert!((0.0..1.0).contains(&h), "height {} out of range", h);
            assert!((0.0..1.0).contains(&m), "moisture {} out of range", m);
        }
    }

    #[test]
    fn test_no_active_layers_fall_back_to_zero() {
        let mut layer = NoiseLayer::default();
        layer.active = false;
        let sampler = NoiseSampler::new(&biome_with_layers(vec![layer]), 3);
        assert_eq!(sampler.sample(4, -2, (8.0, 16.0)), (0.0, 0.0));

        let empty = NoiseSampler::new(&biome_with_layers(Vec::new()), 3);
        assert_eq!(empty.sample(0, 0, (0.0, 0.0)), (0.0, 0.0));
    }

    #[test]
    fn test_same_seed_reproduces_samples() {
        let biome = biome_with_layers(vec![NoiseLayer { octaves: 3, ..Default::default() }]);
        let a = NoiseSampler::new(&biome, 99);
        let b = NoiseSampler::new(&biome, 99);
        assert_eq!(sample_grid(&a, (5.0, 11.0)), sample_grid(&b, (5.0, 11.0)));
    }

    #[test]
    fn test_different_seed_shifts_field() {
        let biome = biome_with_layers(vec![NoiseLayer::default()]);
        let a = sample_grid(&NoiseSampler::new(&biome, 1), (5.0, 11.0));
        let b = sample_grid(&NoiseSampler::new(&biome, 2), (5.0, 11.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_salt_shifts_field() {
        let biome = biome_with_layers(vec![NoiseLayer::default()]);
        let sampler = NoiseSampler::new(&biome, 5);
        assert_ne!(sample_grid(&sampler, (0.0, 100.0)), sample_grid(&sampler, (5000.0, 9000.0)));
    }

    #[test]
    fn test_out_of_window_values_become_zero() {
        // addition pushes every value far above the window; the layer must
        // contribute exactly 0, not the window boundary.
        let layer = NoiseLayer {
            addition: 5.0,
            clamp: Some(ClampWindow { min: 0.2, max: 0.8 }),
            ..Default::default()
        };
        let sampler = NoiseSampler::new(&biome_with_layers(vec![layer]), 17);
        for (h, m) in sample_grid(&sampler, (3.0, 77.0)) {
            assert_eq!(h, 0.0);
            assert_eq!(m, 0.0);
        }
    }

    #[test]
    fn test_shapes_produce_distinct_fields() {
        let classic = biome_with_layers(vec![NoiseLayer { octaves: 3, ..Default::default() }]);
        let ridged = biome_with_layers(vec![NoiseLayer {
            shape: NoiseShape::Ridged,
            octaves: 3,
            ..Default::default()
        }]);
        let a = sample_grid(&NoiseSampler::new(&classic, 42), (9.0, 21.0));
        let b = sample_grid(&NoiseSampler::new(&ridged, 42), (9.0, 21.0));
        assert_ne!(a, b);
    }
}
