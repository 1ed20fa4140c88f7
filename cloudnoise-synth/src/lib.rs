//! Tileable cloud noise volume synthesis
//!
//! Generates a cubic 3D density field by layering fractal Perlin (gradient) noise
//! and fractal Worley (cellular) noise, and rasterizes it into an ordered sequence
//! of RGBA8 Z-slices. Every channel wraps on its lattice period, so the volume
//! repeats seamlessly on all three axes.
//!
//! This crate does no I/O; persisting slices is the job of `cloudnoise-cache`.
//!
//! # Example
//! ```
//! use cloudnoise_synth::{synthesize, NoiseMode, NoiseSettings};
//!
//! let perlin = NoiseSettings::new(4, 4, 1.0, 1.0);
//! let worley = NoiseSettings::new(3, 4, 1.0, 1.5);
//! let slices = synthesize(perlin, worley, 16, NoiseMode::Mix)?;
//!
//! assert_eq!(slices.len(), 16);
//! assert_eq!((slices[0].width, slices[0].height), (16, 16));
//! # Ok::<(), cloudnoise_synth::SettingsError>(())
//! ```
//!
//! # Sample format
//!
//! Each sample is a density in [0, 1], quantized to 8 bits and written to the
//! R, G and B channels of the slice. Alpha is always 255. Values are linear.

mod lattice;
mod perlin;
mod settings;
mod slice;
mod synth;
mod worley;

pub use perlin::{gradient_noise, perlin_fbm};
pub use settings::{NoiseMode, NoiseSettings, SettingsError};
pub use slice::{quantize, Slice};
pub use synth::{layer_depth, rasterize_slice, synthesize, DensityField, Synthesizer};
pub use worley::{cellular_noise, worley_fbm};
