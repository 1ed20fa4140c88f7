//! Noise channel parameters and the shared brightness/contrast remap

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Parameters for one noise channel (Perlin-like or Worley-like)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Number of fractal layers, each doubling frequency and halving amplitude
    pub octaves: u32,
    /// Base tile frequency (lattice cells per tile on each axis)
    pub periods: u32,
    /// Multiplicative gain applied after contrast
    pub brightness: f32,
    /// Gain-curve exponent around 0.5 (1.0 = unchanged, 0.0 = flat grey)
    pub contrast: f32,
}

impl NoiseSettings {
    pub const OCTAVES: RangeInclusive<u32> = 1..=8;
    pub const PERIODS: RangeInclusive<u32> = 1..=16;
    pub const BRIGHTNESS: RangeInclusive<f32> = 0.0..=2.0;
    pub const CONTRAST: RangeInclusive<f32> = 0.0..=8.0;

    pub fn new(octaves: u32, periods: u32, brightness: f32, contrast: f32) -> Self {
        Self {
            octaves,
            periods,
            brightness,
            contrast,
        }
    }

    /// Check every field against its allowed range.
    ///
    /// NaN fails the range checks, so non-finite values are rejected too.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !Self::OCTAVES.contains(&self.octaves) {
            return Err(SettingsError::Octaves(self.octaves));
        }
        if !Self::PERIODS.contains(&self.periods) {
            return Err(SettingsError::Periods(self.periods));
        }
        if !Self::BRIGHTNESS.contains(&self.brightness) {
            return Err(SettingsError::Brightness(self.brightness));
        }
        if !Self::CONTRAST.contains(&self.contrast) {
            return Err(SettingsError::Contrast(self.contrast));
        }
        Ok(())
    }

    /// Apply contrast (gain curve) then brightness to a raw channel value in [0, 1].
    ///
    /// The same formula is used for both channels. Output is clamped to [0, 1].
    pub fn remap(&self, value: f64) -> f64 {
        let v = gain(value.clamp(0.0, 1.0), self.contrast as f64);
        (v * self.brightness as f64).clamp(0.0, 1.0)
    }
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            octaves: 4,
            periods: 4,
            brightness: 1.0,
            contrast: 1.0,
        }
    }
}

/// Which channel(s) contribute to the final density
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseMode {
    /// Product of the remapped Perlin and Worley channels
    #[default]
    Mix,
    PerlinOnly,
    WorleyOnly,
}

impl NoiseMode {
    pub fn uses_perlin(self) -> bool {
        matches!(self, NoiseMode::Mix | NoiseMode::PerlinOnly)
    }

    pub fn uses_worley(self) -> bool {
        matches!(self, NoiseMode::Mix | NoiseMode::WorleyOnly)
    }
}

/// A noise parameter outside its allowed range
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("octaves must be in 1..=8, got {0}")]
    Octaves(u32),
    #[error("periods must be in 1..=16, got {0}")]
    Periods(u32),
    #[error("brightness must be in 0.0..=2.0, got {0}")]
    Brightness(f32),
    #[error("contrast must be in 0.0..=8.0, got {0}")]
    Contrast(f32),
}

/// Symmetric gain curve: pushes values away from 0.5 for k > 1, toward it for k < 1.
#[inline]
fn gain(x: f64, k: f64) -> f64 {
    if x < 0.5 {
        0.5 * (2.0 * x).powf(k)
    } else {
        1.0 - 0.5 * (2.0 * (1.0 - x)).powf(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(NoiseSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let base = NoiseSettings::default();
        assert_eq!(
            NoiseSettings { octaves: 0, ..base }.validate(),
            Err(SettingsError::Octaves(0))
        );
        assert_eq!(
            NoiseSettings { periods: 17, ..base }.validate(),
            Err(SettingsError::Periods(17))
        );
        assert!(NoiseSettings { brightness: 2.5, ..base }.validate().is_err());
        assert!(NoiseSettings { contrast: -0.1, ..base }.validate().is_err());
        assert!(NoiseSettings { contrast: f32::NAN, ..base }.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(NoiseSettings::new(1, 1, 0.0, 0.0).validate().is_ok());
        assert!(NoiseSettings::new(8, 16, 2.0, 8.0).validate().is_ok());
    }

    #[test]
    fn test_remap_identity() {
        let settings = NoiseSettings::default();
        for v in [0.0, 0.1, 0.25, 0.5, 0.8, 1.0] {
            assert!((settings.remap(v) - v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_remap_zero_contrast_is_flat() {
        let settings = NoiseSettings::new(1, 1, 1.0, 0.0);
        for v in [0.0, 0.3, 0.7, 1.0] {
            assert_eq!(settings.remap(v), 0.5);
        }
    }

    #[test]
    fn test_remap_contrast_moves_away_from_middle() {
        let soft = NoiseSettings::new(1, 1, 1.0, 1.0);
        let hard = NoiseSettings::new(1, 1, 1.0, 3.0);
        for v in [0.1, 0.3, 0.7, 0.9] {
            assert!((hard.remap(v) - 0.5).abs() > (soft.remap(v) - 0.5).abs());
        }
    }

    #[test]
    fn test_remap_brightness_scales_and_clamps() {
        let bright = NoiseSettings::new(1, 1, 2.0, 1.0);
        assert!((bright.remap(0.25) - 0.5).abs() < 1e-12);
        assert_eq!(bright.remap(0.75), 1.0);
        let dark = NoiseSettings::new(1, 1, 0.0, 1.0);
        assert_eq!(dark.remap(0.75), 0.0);
    }

    #[test]
    fn test_noise_mode_channels() {
        assert!(NoiseMode::Mix.uses_perlin() && NoiseMode::Mix.uses_worley());
        assert!(NoiseMode::PerlinOnly.uses_perlin() && !NoiseMode::PerlinOnly.uses_worley());
        assert!(!NoiseMode::WorleyOnly.uses_perlin() && NoiseMode::WorleyOnly.uses_worley());
    }
}
