//! Volume synthesis: evaluate the noise field and rasterize it into Z-slices

use rayon::prelude::*;

use crate::perlin::perlin_fbm;
use crate::worley::worley_fbm;
use crate::{NoiseMode, NoiseSettings, SettingsError, Slice};

/// Salt mixed into the seed of the Worley channel so it never mirrors Perlin
const WORLEY_SEED_SALT: u32 = 0x5157_0E11;

/// A scalar field over normalized coordinates that tiles every 1.0 on each axis
pub trait DensityField: Sync {
    /// Density in [0, 1] at `pos`
    fn density(&self, pos: [f64; 3]) -> f32;
}

/// Depth of layer `layer` in normalized coordinates (texel centre).
///
/// The half-texel offset keeps samples off the periodic boundary.
#[inline]
pub fn layer_depth(layer: u32, resolution: u32) -> f64 {
    (f64::from(layer) + 0.5) / f64::from(resolution)
}

/// Rasterize a `resolution × resolution` cross-section of `field` at depth `z`.
pub fn rasterize_slice<F: DensityField + ?Sized>(field: &F, resolution: u32, z: f64) -> Slice {
    let mut slice = Slice::new(resolution, resolution);
    for y in 0..resolution {
        let v = layer_depth(y, resolution);
        for x in 0..resolution {
            let u = layer_depth(x, resolution);
            slice.set_density(x, y, field.density([u, v, z]));
        }
    }
    slice
}

/// Perlin/Worley cloud noise generator
#[derive(Debug, Clone)]
pub struct Synthesizer {
    perlin: NoiseSettings,
    worley: NoiseSettings,
    mode: NoiseMode,
    seed: u32,
}

impl Synthesizer {
    /// Create a generator after validating both channels' settings.
    pub fn new(
        perlin: NoiseSettings,
        worley: NoiseSettings,
        mode: NoiseMode,
    ) -> Result<Self, SettingsError> {
        perlin.validate()?;
        worley.validate()?;
        Ok(Self {
            perlin,
            worley,
            mode,
            seed: 0,
        })
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn mode(&self) -> NoiseMode {
        self.mode
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Remapped Perlin channel at `pos`
    pub fn perlin(&self, pos: [f64; 3]) -> f64 {
        perlin_fbm(&self.perlin, pos, self.seed)
    }

    /// Remapped Worley channel at `pos`
    pub fn worley(&self, pos: [f64; 3]) -> f64 {
        worley_fbm(&self.worley, pos, self.seed ^ WORLEY_SEED_SALT)
    }

    /// Render layer `layer` of a volume with side `resolution`.
    pub fn slice(&self, resolution: u32, layer: u32) -> Slice {
        rasterize_slice(self, resolution, layer_depth(layer, resolution))
    }

    /// Render a cross-section at an arbitrary normalized depth `z`.
    ///
    /// Depths outside [0, 1) wrap, since the field tiles.
    pub fn preview(&self, resolution: u32, z: f64) -> Slice {
        rasterize_slice(self, resolution, z)
    }

    /// Render all `resolution` layers, ordered by z.
    ///
    /// Layers are independent, so they are computed in parallel.
    pub fn synthesize(&self, resolution: u32) -> Vec<Slice> {
        tracing::debug!(
            resolution,
            mode = ?self.mode,
            seed = self.seed,
            "Synthesizing noise volume"
        );
        (0..resolution)
            .into_par_iter()
            .map(|layer| self.slice(resolution, layer))
            .collect()
    }
}

impl DensityField for Synthesizer {
    fn density(&self, pos: [f64; 3]) -> f32 {
        let value = match self.mode {
            NoiseMode::Mix => self.perlin(pos) * self.worley(pos),
            NoiseMode::PerlinOnly => self.perlin(pos),
            NoiseMode::WorleyOnly => self.worley(pos),
        };
        value as f32
    }
}

/// Synthesize a full volume as `resolution` slices of `resolution × resolution`.
pub fn synthesize(
    perlin: NoiseSettings,
    worley: NoiseSettings,
    resolution: u32,
    mode: NoiseMode,
) -> Result<Vec<Slice>, SettingsError> {
    Ok(Synthesizer::new(perlin, worley, mode)?.synthesize(resolution))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_and_variance(slices: &[Slice]) -> (f64, f64) {
        let values: Vec<f64> = slices
            .iter()
            .flat_map(|s| s.pixels.chunks_exact(4).map(|p| p[0] as f64 / 255.0))
            .collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        (mean, var)
    }

    #[test]
    fn test_synthesize_shape() {
        let slices = synthesize(
            NoiseSettings::default(),
            NoiseSettings::default(),
            8,
            NoiseMode::Mix,
        )
        .unwrap();
        assert_eq!(slices.len(), 8);
        for slice in &slices {
            assert!(slice.is_square_of(8));
            assert!(slice.pixels.chunks_exact(4).all(|p| p[3] == 255));
            assert!(slice.pixels.chunks_exact(4).all(|p| p[0] == p[1] && p[1] == p[2]));
        }
    }

    #[test]
    fn test_synthesize_rejects_invalid_settings() {
        let bad = NoiseSettings::new(0, 4, 1.0, 1.0);
        assert_eq!(
            synthesize(bad, NoiseSettings::default(), 4, NoiseMode::Mix).unwrap_err(),
            SettingsError::Octaves(0)
        );
    }

    #[test]
    fn test_synthesize_is_deterministic_and_ordered() {
        let synth =
            Synthesizer::new(NoiseSettings::default(), NoiseSettings::default(), NoiseMode::Mix)
                .unwrap()
                .with_seed(42);
        let a = synth.synthesize(6);
        let b = synth.synthesize(6);
        assert_eq!(a, b);
        for (layer, slice) in a.iter().enumerate() {
            assert_eq!(*slice, synth.slice(6, layer as u32));
        }
    }

    #[test]
    fn test_preview_matches_layer_depth() {
        let synth = Synthesizer::new(
            NoiseSettings::default(),
            NoiseSettings::default(),
            NoiseMode::PerlinOnly,
        )
        .unwrap();
        assert_eq!(synth.preview(8, layer_depth(3, 8)), synth.slice(8, 3));
        assert_eq!(synth.preview(8, layer_depth(3, 8) + 1.0), synth.slice(8, 3));
    }

    #[test]
    fn test_volume_tiles_across_edges() {
        let synth = Synthesizer::new(
            NoiseSettings::new(3, 2, 1.0, 1.0),
            NoiseSettings::new(2, 3, 1.0, 1.0),
            NoiseMode::Mix,
        )
        .unwrap();
        let pos = [0.125, 0.5, 0.875];
        let base = synth.density(pos);
        for axis in 0..3 {
            let mut shifted = pos;
            shifted[axis] += 1.0;
            assert!((synth.density(shifted) - base).abs() < 1e-5);
            shifted[axis] -= 2.0;
            assert!((synth.density(shifted) - base).abs() < 1e-5);
        }
    }

    #[test]
    fn test_perlin_only_ignores_worley_settings() {
        let perlin = NoiseSettings::new(3, 4, 1.2, 1.5);
        let a = synthesize(perlin, NoiseSettings::new(1, 2, 0.5, 1.0), 8, NoiseMode::PerlinOnly)
            .unwrap();
        let b = synthesize(perlin, NoiseSettings::new(8, 16, 2.0, 6.0), 8, NoiseMode::PerlinOnly)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_worley_only_ignores_perlin_settings() {
        let worley = NoiseSettings::new(2, 3, 1.0, 2.0);
        let a = synthesize(NoiseSettings::new(1, 1, 0.1, 0.5), worley, 8, NoiseMode::WorleyOnly)
            .unwrap();
        let b = synthesize(NoiseSettings::new(7, 9, 1.9, 7.0), worley, 8, NoiseMode::WorleyOnly)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mix_is_product_of_channels() {
        let synth =
            Synthesizer::new(NoiseSettings::default(), NoiseSettings::default(), NoiseMode::Mix)
                .unwrap();
        let pos = [0.3, 0.6, 0.9];
        let expected = (synth.perlin(pos) * synth.worley(pos)) as f32;
        assert_eq!(synth.density(pos), expected);
    }

    #[test]
    fn test_brightness_never_lowers_mean() {
        let worley = NoiseSettings::default();
        let mut previous = -1.0;
        for brightness in [0.25, 0.5, 1.0, 1.5, 2.0] {
            let perlin = NoiseSettings::new(4, 4, brightness, 1.0);
            let slices = synthesize(perlin, worley, 8, NoiseMode::Mix).unwrap();
            let (mean, _) = mean_and_variance(&slices);
            assert!(mean >= previous, "mean dropped at brightness {brightness}");
            previous = mean;
        }
    }

    #[test]
    fn test_contrast_raises_variance() {
        let worley = NoiseSettings::default();
        let mut previous = -1.0;
        for contrast in [0.5, 1.0, 2.0, 4.0] {
            let perlin = NoiseSettings::new(4, 4, 1.0, contrast);
            let slices = synthesize(perlin, worley, 8, NoiseMode::PerlinOnly).unwrap();
            let (_, variance) = mean_and_variance(&slices);
            assert!(variance > previous, "variance did not grow at contrast {contrast}");
            previous = variance;
        }
    }

    #[test]
    fn test_worley_brightness_never_lowers_mean() {
        let perlin = NoiseSettings::default();
        let mut previous = -1.0;
        for brightness in [0.25, 0.5, 1.0, 1.5, 2.0] {
            let worley = NoiseSettings::new(3, 4, brightness, 1.0);
            let slices = synthesize(perlin, worley, 8, NoiseMode::WorleyOnly).unwrap();
            let (mean, _) = mean_and_variance(&slices);
            assert!(mean >= previous, "mean dropped at brightness {brightness}");
            previous = mean;
        }
    }

    #[test]
    fn test_worley_contrast_raises_variance() {
        let perlin = NoiseSettings::default();
        let mut previous = -1.0;
        for contrast in [0.5, 1.0, 2.0, 4.0, 8.0] {
            let worley = NoiseSettings::new(3, 4, 1.0, contrast);
            let slices = synthesize(perlin, worley, 8, NoiseMode::WorleyOnly).unwrap();
            let (_, variance) = mean_and_variance(&slices);
            assert!(variance > previous, "variance did not grow at contrast {contrast}");
            previous = variance;
        }
    }

    #[test]
    fn test_layer_depth_is_texel_centre() {
        assert_eq!(layer_depth(0, 4), 0.125);
        assert_eq!(layer_depth(3, 4), 0.875);
        assert_eq!(layer_depth(0, 1), 0.5);
    }
}
