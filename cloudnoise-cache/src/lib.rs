//! Cloud noise volume cache
//!
//! Persists noise volumes as ordered sequences of lossless RGBA8 PNG slices and
//! reloads them into a single cubic [`Volume`]. [`VolumeCache::get_or_generate`]
//! decides between loading an existing entry and synthesizing a new one:
//!
//! ```text
//! TryLoad ─ hit ───────────────────────────────► Loaded
//!    │
//!   miss ─ abort policy / read-only ───────────► Miss
//!    │
//! Generate → Store → TryLoad ─ hit ────────────► Generated
//!                       └──── miss ────────────► Err(Readback)
//! ```
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use cloudnoise_cache::{LoadPolicy, Lookup, MemorySliceStore, VolumeCache, VolumeRequest};
//!
//! let cache = VolumeCache::new(Arc::new(MemorySliceStore::new()), true);
//! let request = VolumeRequest::new("clouds", 8);
//!
//! let first = cache.get_or_generate(&request, LoadPolicy::LoadAvailableElseGenerate)?;
//! assert!(matches!(first, Lookup::Generated(_)));
//!
//! let second = cache.get_or_generate(&request, LoadPolicy::LoadAvailableElseGenerate)?;
//! assert!(matches!(second, Lookup::Loaded(_)));
//! assert_eq!(first.volume(), second.volume());
//! # Ok::<(), cloudnoise_cache::CacheError>(())
//! ```

mod cache;
mod codec;
mod config;
mod error;
mod name;
mod store;
mod volume;

/// Largest supported volume side. Slice files use a 4-digit index.
pub const MAX_RESOLUTION: u32 = 1024;

pub use cache::{LoadPolicy, Lookup, Miss, VolumeCache, VolumeRequest};
pub use codec::{decode_slice, encode_slice};
pub use config::{load_manifest, parse_manifest, CacheSection, NoiseManifest};
pub use error::{CacheError, DecodeError, StoreError};
pub use name::{EntryName, MAX_NAME_LEN};
pub use store::{parse_slice_file_name, slice_file_name, FsSliceStore, MemorySliceStore, SliceStore};
pub use volume::Volume;

// Re-export the synthesizer types that appear in this crate's API
pub use cloudnoise_synth::{NoiseMode, NoiseSettings, Slice, Synthesizer};
